pub mod config;
pub mod domain;
pub mod errors;
pub mod export;
pub mod extraction;
pub mod flows;
pub mod scoring;
pub mod validation;

pub use domain::conversation::{
    ConversationId, ConversationMessage, ConversationState, MessageRole,
};
pub use domain::lead::{BudgetValue, ExtractedFields, LeadField, LeadProfile, PropertyType};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use extraction::{extract_fields, extract_location, extract_property_type, ExtractionOptions};
pub use flows::{ConversationStateMachine, MessageOutcome, Stage, StageTransition};
pub use scoring::{score, HIGH_QUALITY_THRESHOLD};
pub use validation::{
    validate_budget, validate_email, validate_name, validate_phone_number, RejectionReason,
    ValidationOutcome,
};
