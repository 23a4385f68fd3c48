use thiserror::Error;

use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("conversation id must not be empty")]
    MissingConversationId,
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
}

impl ApplicationError {
    /// Collaborator failures the caller may answer with a fallback instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Integration(_))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::NotFound { .. } => "The requested conversation was not found.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }

    pub fn not_found(message: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self::NotFound { message: message.into(), correlation_id: correlation_id.into() }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::MissingConversationId) => Self::BadRequest {
                message: "conversation id is required".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Domain(DomainError::FlowTransition(_)) => Self::BadRequest {
                message: "domain validation failed".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::conversation::ConversationId;
    use crate::errors::{ApplicationError, DomainError, InterfaceError};
    use crate::flows::FlowTransitionError;

    #[test]
    fn missing_conversation_id_maps_to_bad_request() {
        let interface =
            ApplicationError::from(DomainError::MissingConversationId).into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn flow_error_converts_through_domain_error() {
        let error = ApplicationError::from(DomainError::from(
            FlowTransitionError::AlreadyCompleted { id: ConversationId("c-9".to_owned()) },
        ));

        assert!(!error.is_recoverable());
        assert!(matches!(error.into_interface("req-2"), InterfaceError::BadRequest { .. }));
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let error = ApplicationError::Persistence("database lock timeout".to_owned());
        assert!(error.is_recoverable());

        let interface = error.into_interface("req-3");
        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "req-3");
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn every_application_error_has_an_interface_mapping() {
        let cases = [
            (ApplicationError::from(DomainError::MissingConversationId), "bad request"),
            (ApplicationError::Persistence("disk full".to_owned()), "service unavailable"),
            (ApplicationError::Integration("model timeout".to_owned()), "service unavailable"),
        ];

        for (error, prefix) in cases {
            let interface = error.into_interface("req-4");
            assert!(interface.to_string().starts_with(prefix), "{interface}");
            assert_eq!(interface.correlation_id(), "req-4");
        }
    }
}
