use phonenumber::{country, Mode};

use super::{RejectionReason, ValidationOutcome};

const MIN_PHONE_LEN: usize = 5;

/// Normalizes a phone number to E.164, assuming a UAE number when no `+` prefix is given.
pub fn validate_phone_number(text: &str) -> ValidationOutcome<String> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_PHONE_LEN {
        return ValidationOutcome::Invalid(RejectionReason::TooShort);
    }

    let international = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if is_repeated_digit(&digits) {
        return ValidationOutcome::Invalid(RejectionReason::RepeatedDigitPattern);
    }

    let (region, candidate) = if international {
        (None, format!("+{digits}"))
    } else {
        (Some(country::Id::AE), digits)
    };

    let number = match phonenumber::parse(region, &candidate) {
        Ok(number) => number,
        Err(_) => return ValidationOutcome::Invalid(RejectionReason::Unparseable),
    };
    if !phonenumber::is_valid(&number) {
        return ValidationOutcome::Invalid(RejectionReason::NotAValidNumber);
    }

    ValidationOutcome::Valid(number.format().mode(Mode::E164).to_string())
}

fn is_repeated_digit(digits: &str) -> bool {
    let mut chars = digits.chars();
    match chars.next() {
        Some(first) => digits.len() > 1 && chars.all(|c| c == first),
        None => false,
    }
}
