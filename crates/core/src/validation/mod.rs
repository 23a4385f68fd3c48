//! Field validators for raw chat text.
//!
//! Each validator classifies one raw input and either normalizes it into a typed value or
//! names the reason it was rejected. Rejection is an ordinary outcome, never an error.

pub mod budget;
pub mod email;
pub mod name;
pub mod phone;

use serde::{Deserialize, Serialize};

pub use budget::validate_budget;
pub use email::validate_email;
pub use name::validate_name;
pub use phone::validate_phone_number;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum ValidationOutcome<T> {
    Valid(T),
    Invalid(RejectionReason),
}

impl<T> ValidationOutcome<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn valid(self) -> Option<T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Invalid(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            Self::Valid(_) => None,
            Self::Invalid(reason) => Some(*reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ValidationOutcome<U> {
        match self {
            Self::Valid(value) => ValidationOutcome::Valid(f(value)),
            Self::Invalid(reason) => ValidationOutcome::Invalid(reason),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    TooShort,
    TooLong,
    RepeatedDigitPattern,
    Unparseable,
    NotAValidNumber,
    MalformedEmail,
    EmptyInput,
    UnparseableAmount,
    AmountTooLow,
    AmountTooHigh,
    Empty,
    TooManyDigits,
    InvalidCharacters,
}

impl RejectionReason {
    pub fn code(self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::RepeatedDigitPattern => "repeated_digit_pattern",
            Self::Unparseable => "unparseable",
            Self::NotAValidNumber => "not_a_valid_number",
            Self::MalformedEmail => "malformed_email",
            Self::EmptyInput => "empty_input",
            Self::UnparseableAmount => "unparseable_amount",
            Self::AmountTooLow => "amount_too_low",
            Self::AmountTooHigh => "amount_too_high",
            Self::Empty => "empty",
            Self::TooManyDigits => "too_many_digits",
            Self::InvalidCharacters => "invalid_characters",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
