//! Agent Runtime - lead qualification and reply orchestration
//!
//! This crate turns an inbound chat message into an updated lead and an outbound reply:
//! - Qualifies the message against the stored conversation (`qualifier`)
//! - Builds the model prompt from what is already known about the lead (`prompt`)
//! - Calls a pluggable chat model (`llm`)
//! - Cleans the generated reply for a plain-text channel (`guardrails`)
//! - Writes hand-over summaries of a conversation for human agents (`summary`)
//!
//! # Architecture
//!
//! Each message follows the same loop:
//! 1. **Qualification** (`qualifier`) - extract, merge, score and advance the stage
//! 2. **History** - record the inbound turn and load the recent window
//! 3. **Generation** (`llm`) - ask the model for the next reply
//! 4. **Guardrails** (`guardrails`) - strip markup or fall back to a safe message
//!
//! # Safety Principle
//!
//! The model only writes the wording of replies. Field values, scores and stages are
//! decided deterministically by `leadline-core` before the model is ever called.

pub mod guardrails;
pub mod llm;
pub mod prompt;
pub mod qualifier;
pub mod runtime;
pub mod summary;

pub use guardrails::{GuardrailDecision, GuardrailPolicy, FALLBACK_MESSAGE};
pub use llm::{
    ChatMessage, ChatRequest, ChatRole, LlmClient, LlmResponseGenerator, ResponseGenerator,
    SamplingParams,
};
pub use qualifier::{InboundOutcome, LeadQualifier};
pub use runtime::{AgentReply, AgentRuntime, ConversationSnapshot};
pub use summary::{ConversationSummarizer, SUMMARY_HISTORY_LIMIT};
