use super::{RejectionReason, ValidationOutcome};

const MIN_NAME_LEN: usize = 2;
const MAX_NAME_LEN: usize = 100;
const MAX_NAME_DIGITS: usize = 2;

/// Accepts person names made of ASCII letters, spaces, hyphens, apostrophes and periods.
///
/// More than two digits is reported as `too_many_digits`; any remaining digit fails the
/// character check. The accepted name is title-cased per token, so `john o'brien` becomes
/// `John O'Brien`.
pub fn validate_name(text: &str) -> ValidationOutcome<String> {
    if text.is_empty() {
        return ValidationOutcome::Invalid(RejectionReason::Empty);
    }

    let trimmed = text.trim();
    let length = trimmed.chars().count();
    if length < MIN_NAME_LEN {
        return ValidationOutcome::Invalid(RejectionReason::TooShort);
    }
    if length > MAX_NAME_LEN {
        return ValidationOutcome::Invalid(RejectionReason::TooLong);
    }

    if trimmed.chars().filter(char::is_ascii_digit).count() > MAX_NAME_DIGITS {
        return ValidationOutcome::Invalid(RejectionReason::TooManyDigits);
    }
    if !trimmed.chars().all(is_name_char) || !trimmed.chars().any(|c| c.is_ascii_alphabetic()) {
        return ValidationOutcome::Invalid(RejectionReason::InvalidCharacters);
    }

    let tokens: Vec<String> = trimmed.split_whitespace().map(title_case).collect();
    ValidationOutcome::Valid(tokens.join(" "))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c.is_whitespace() || matches!(c, '-' | '\'' | '.')
}

fn title_case(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut previous: Option<char> = None;
    for c in token.chars() {
        if previous.is_some_and(char::is_alphanumeric) {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        previous = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::validate_name;
    use crate::validation::{RejectionReason, ValidationOutcome};

    #[test]
    fn names_are_title_cased_per_token() {
        assert_eq!(validate_name("john o'brien"), ValidationOutcome::Valid("John O'Brien".to_owned()));
        assert_eq!(
            validate_name("  MARY-JANE   watson "),
            ValidationOutcome::Valid("Mary-Jane Watson".to_owned())
        );
        assert_eq!(validate_name("dr. ahmed"), ValidationOutcome::Valid("Dr. Ahmed".to_owned()));
    }

    #[test]
    fn digits_below_the_limit_still_fail_the_character_check() {
        assert_eq!(
            validate_name("mohammed 2"),
            ValidationOutcome::Invalid(RejectionReason::InvalidCharacters)
        );
        assert_eq!(
            validate_name("3 bedrooms"),
            ValidationOutcome::Invalid(RejectionReason::InvalidCharacters)
        );
    }

    #[test]
    fn non_ascii_letters_are_rejected() {
        assert_eq!(
            validate_name("José"),
            ValidationOutcome::Invalid(RejectionReason::InvalidCharacters)
        );
    }

    #[test]
    fn length_limits_are_enforced() {
        assert_eq!(validate_name(""), ValidationOutcome::Invalid(RejectionReason::Empty));
        assert_eq!(validate_name("x"), ValidationOutcome::Invalid(RejectionReason::TooShort));
        assert_eq!(validate_name("  a  "), ValidationOutcome::Invalid(RejectionReason::TooShort));
        assert_eq!(
            validate_name(&"a".repeat(101)),
            ValidationOutcome::Invalid(RejectionReason::TooLong)
        );
    }

    #[test]
    fn digits_and_symbols_are_rejected() {
        assert_eq!(
            validate_name("John123456"),
            ValidationOutcome::Invalid(RejectionReason::TooManyDigits)
        );
        assert_eq!(
            validate_name("john@example.com"),
            ValidationOutcome::Invalid(RejectionReason::InvalidCharacters)
        );
        assert_eq!(
            validate_name("hi, there!"),
            ValidationOutcome::Invalid(RejectionReason::InvalidCharacters)
        );
        assert_eq!(validate_name("12"), ValidationOutcome::Invalid(RejectionReason::InvalidCharacters));
    }
}
