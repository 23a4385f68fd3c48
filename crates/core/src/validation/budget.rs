use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::{RejectionReason, ValidationOutcome};
use crate::domain::lead::BudgetValue;

pub const MIN_BUDGET_AED: i64 = 10_000;
pub const MAX_BUDGET_AED: i64 = 1_000_000_000;

const CURRENCY_TOKENS: [&str; 3] = ["DIRHAMS", "AED", "DHS"];
const RANGE_WORD: &str = "TO";

// "500KTO1M" and "500K TO1M": a TO written against an amount on both sides.
static GLUED_RANGE_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d|K|M|MN|MILLIONS?|LAKHS?)\s*TO\s*(\d)").expect("range word pattern")
});

/// Parses a budget such as `500k`, `AED 1.5M`, `2 million` or `500k-1M` into whole AED.
///
/// A range is accepted only when both sides parse on their own; reversed bounds are kept as
/// given.
pub fn validate_budget(text: &str) -> ValidationOutcome<BudgetValue> {
    let cleaned = strip_currency(&text.to_uppercase());
    if cleaned.is_empty() {
        return ValidationOutcome::Invalid(RejectionReason::EmptyInput);
    }

    if let Some((low, high)) = split_range(&cleaned) {
        return match (parse_amount(&low), parse_amount(&high)) {
            (Ok(min), Ok(max)) => ValidationOutcome::Valid(BudgetValue::Range { min, max }),
            (Err(reason), _) | (_, Err(reason)) => ValidationOutcome::Invalid(reason),
        };
    }

    match parse_amount(&cleaned) {
        Ok(amount) => ValidationOutcome::Valid(BudgetValue::Fixed { amount }),
        Err(reason) => ValidationOutcome::Invalid(reason),
    }
}

fn strip_currency(upper: &str) -> String {
    let mut cleaned = upper.replace(',', "");
    for token in CURRENCY_TOKENS {
        cleaned = cleaned.replace(token, "");
    }
    cleaned.trim().to_owned()
}

fn split_range(cleaned: &str) -> Option<(String, String)> {
    let spaced = cleaned.replace('-', " TO ");
    let spaced = GLUED_RANGE_WORD.replace_all(&spaced, "${1} TO ${2}");
    let tokens: Vec<&str> = spaced.split_whitespace().collect();

    let mut separators = tokens.iter().enumerate().filter(|(_, token)| **token == RANGE_WORD);
    let (position, _) = separators.next()?;
    if separators.next().is_some() {
        return None;
    }

    let (low, high) = (&tokens[..position], &tokens[position + 1..]);
    if low.is_empty() || high.is_empty() {
        return None;
    }
    Some((low.join(" "), high.join(" ")))
}

fn parse_amount(part: &str) -> Result<i64, RejectionReason> {
    let part = part.trim();
    if part.is_empty() {
        return Err(RejectionReason::EmptyInput);
    }

    let numeric: String = part.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    if !numeric.chars().any(|c| c.is_ascii_digit()) {
        return Err(RejectionReason::UnparseableAmount);
    }
    let value = Decimal::from_str(&numeric).map_err(|_| RejectionReason::UnparseableAmount)?;

    let amount = value
        .checked_mul(multiplier(part))
        .and_then(|scaled| scaled.trunc().to_i64())
        .ok_or(RejectionReason::AmountTooHigh)?;

    if amount < MIN_BUDGET_AED {
        return Err(RejectionReason::AmountTooLow);
    }
    if amount > MAX_BUDGET_AED {
        return Err(RejectionReason::AmountTooHigh);
    }
    Ok(amount)
}

// Words are checked before single letters: LAKH contains a K and MILLION an M.
fn multiplier(part: &str) -> Decimal {
    if part.contains("LAKH") {
        Decimal::from(100_000)
    } else if part.contains("MILLION") {
        Decimal::from(1_000_000)
    } else if part.contains('K') {
        Decimal::from(1_000)
    } else if part.contains('M') {
        Decimal::from(1_000_000)
    } else {
        Decimal::ONE
    }
}
