use std::str::FromStr;

use email_address::EmailAddress;

use super::{RejectionReason, ValidationOutcome};

/// Checks address grammar only; no DNS or mailbox lookups are made.
pub fn validate_email(text: &str) -> ValidationOutcome<String> {
    let trimmed = text.trim();
    if !trimmed.contains('@') {
        return ValidationOutcome::Invalid(RejectionReason::MalformedEmail);
    }

    let Ok(address) = EmailAddress::from_str(trimmed) else {
        return ValidationOutcome::Invalid(RejectionReason::MalformedEmail);
    };

    let domain = address.domain().to_ascii_lowercase();
    if !is_routable_domain(&domain) {
        return ValidationOutcome::Invalid(RejectionReason::MalformedEmail);
    }

    ValidationOutcome::Valid(format!("{}@{domain}", address.local_part()))
}

// Rejects bare hosts and address literals, which are legal grammar but never real leads.
fn is_routable_domain(domain: &str) -> bool {
    !domain.starts_with('[')
        && domain.split('.').count() > 1
        && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::validate_email;
    use crate::validation::{RejectionReason, ValidationOutcome};

    #[test]
    fn missing_at_sign_is_rejected_immediately() {
        assert_eq!(
            validate_email("john.example.com"),
            ValidationOutcome::Invalid(RejectionReason::MalformedEmail)
        );
    }

    #[test]
    fn valid_address_is_trimmed_and_domain_lowercased() {
        assert_eq!(
            validate_email("  John.Smith@Example.COM "),
            ValidationOutcome::Valid("John.Smith@example.com".to_owned())
        );
    }

    #[test]
    fn grammar_violations_are_rejected() {
        for input in ["@example.com", "john@", "john@@example.com", "john doe@example.com"] {
            assert_eq!(
                validate_email(input),
                ValidationOutcome::Invalid(RejectionReason::MalformedEmail),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn single_label_domains_are_rejected() {
        assert_eq!(
            validate_email("john@localhost"),
            ValidationOutcome::Invalid(RejectionReason::MalformedEmail)
        );
    }
}
