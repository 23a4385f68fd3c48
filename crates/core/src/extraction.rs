//! Finds lead fields inside one free-form chat message.
//!
//! Location and property type are vocabulary matches over the whole message. Phone, email
//! and budget are located as candidate spans first and then handed to their validators, so a
//! phone number is never also read as a budget.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::lead::{BudgetValue, ExtractedFields, PropertyType};
use crate::validation::{validate_budget, validate_email, validate_name, validate_phone_number};

/// Known Dubai areas. Matching is first-in-list, so longer or more specific names come first.
pub const DUBAI_AREAS: [&str; 40] = [
    "Downtown Dubai",
    "Dubai Marina",
    "Palm Jumeirah",
    "JBR",
    "Jumeirah Beach Residence",
    "Business Bay",
    "Dubai Hills",
    "Arabian Ranches",
    "Jumeirah Village Circle",
    "JVC",
    "Dubai Sports City",
    "Motor City",
    "Studio City",
    "Discovery Gardens",
    "JLT",
    "Jumeirah Lakes Towers",
    "DIFC",
    "Dubai International Financial Centre",
    "Mirdif",
    "Deira",
    "Bur Dubai",
    "Karama",
    "Satwa",
    "Al Barsha",
    "Jumeirah",
    "Umm Suqeim",
    "Al Quoz",
    "Dubai Silicon Oasis",
    "DSO",
    "International City",
    "Dubai Creek Harbour",
    "City Walk",
    "Al Furjan",
    "Damac Hills",
    "Dubai South",
    "Town Square",
    "Reem",
    "Mira",
    "Tilal Al Ghaf",
    "Dubai Land",
];

/// Property categories with their synonyms, in matching order.
pub const PROPERTY_KEYWORDS: [(PropertyType, &[&str]); 7] = [
    (PropertyType::Apartment, &["apartment", "flat", "unit"]),
    (PropertyType::Villa, &["villa", "townhouse", "townhome"]),
    (PropertyType::Penthouse, &["penthouse", "pent house"]),
    (PropertyType::Studio, &["studio"]),
    (PropertyType::Duplex, &["duplex"]),
    (PropertyType::Land, &["land", "plot"]),
    (PropertyType::Commercial, &["commercial", "office", "shop", "retail"]),
];

pub const NAME_GATE_MAX_TOKENS: usize = 4;
pub const NAME_GATE_MAX_CHARS: usize = 50;

const MIN_PHONE_DIGITS: usize = 7;

// Amount pieces shared by the budget patterns.
const AMOUNT: &str = r"[0-9][0-9,]*(?:\.[0-9]+)?";
const MULTIPLIER: &str = r"(?:millions?|mn|lakhs?|k|m)";
const CURRENCY: &str = r"(?:aed|dhs|dirhams)";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)+").expect("email pattern")
});

// An optional country prefix, then digits with the separators people type between groups.
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\(?[0-9][0-9\s().\-]*[0-9]").expect("phone pattern"));

// Ranges ("800k to 1.2m", "500k-1M") are preferred over a single amount at the same position.
// The multiplier on the lower bound may touch the range word ("500kto1m").
static BUDGET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let lower = format!(r"{AMOUNT}(?:\s*{MULTIPLIER})?");
    let upper = format!(r"(?:{CURRENCY}\s*)?{AMOUNT}(?:\s*{MULTIPLIER}\b)?");
    let range = format!(r"{lower}\s*(?:-|to)\s*{upper}");
    let single = format!(r"{AMOUNT}(?:\s*{MULTIPLIER}\b)?");
    Regex::new(&format!(r"(?i){range}|{single}")).expect("budget pattern")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractionOptions {
    /// Whether a short message may be read as the lead's name.
    pub attempt_name: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self { attempt_name: true }
    }
}

pub fn extract_location(text: &str) -> Option<&'static str> {
    let haystack = text.to_lowercase();
    DUBAI_AREAS.into_iter().find(|area| haystack.contains(&area.to_lowercase()))
}

pub fn extract_property_type(text: &str) -> Option<PropertyType> {
    let haystack = text.to_lowercase();
    PROPERTY_KEYWORDS
        .into_iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| haystack.contains(keyword)))
        .map(|(property_type, _)| property_type)
}

/// Short replies such as "Sara Khan" are name candidates; sentences are not.
pub fn passes_name_gate(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.split_whitespace().count() <= NAME_GATE_MAX_TOKENS
        && trimmed.chars().count() < NAME_GATE_MAX_CHARS
}

/// Runs every validator and extractor over `text`. Rejected candidates are dropped silently.
///
/// Every field is looked for independently. The whole message is tried as a name when it
/// passes the short-reply gate, so "Sara villa" yields both a name and a property type.
pub fn extract_fields(text: &str, options: ExtractionOptions) -> ExtractedFields {
    let mut residual = text.to_owned();

    let email = find_email(text).map(|(span, email)| {
        blank(&mut residual, span);
        email
    });
    let phone = find_phone(&residual).map(|(span, phone)| {
        blank(&mut residual, span);
        phone
    });

    let name = if options.attempt_name && passes_name_gate(text) {
        validate_name(text).valid()
    } else {
        None
    };

    ExtractedFields {
        name,
        phone,
        email,
        budget: find_budget(&residual),
        location_preference: extract_location(text).map(str::to_owned),
        property_type: extract_property_type(text),
    }
}

fn find_email(text: &str) -> Option<(Range<usize>, String)> {
    EMAIL_PATTERN.find_iter(text).find_map(|found| {
        validate_email(found.as_str()).valid().map(|email| (found.range(), email))
    })
}

fn find_phone(text: &str) -> Option<(Range<usize>, String)> {
    PHONE_PATTERN.find_iter(text).find_map(|found| {
        let candidate = found.as_str();
        let digits: String = candidate.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < MIN_PHONE_DIGITS || !looks_dialable(candidate, &digits) {
            return None;
        }
        validate_phone_number(candidate).valid().map(|phone| (found.range(), phone))
    })
}

// A local number is written with a trunk prefix, a country code, or as a bare mobile number.
// Anything else is more likely an amount.
fn looks_dialable(candidate: &str, digits: &str) -> bool {
    candidate.starts_with('+')
        || digits.starts_with('0')
        || digits.starts_with("971")
        || (digits.len() == 9 && digits.starts_with('5'))
}

fn find_budget(text: &str) -> Option<BudgetValue> {
    BUDGET_PATTERN.find_iter(text).find_map(|found| validate_budget(found.as_str()).valid())
}

fn blank(text: &mut String, span: Range<usize>) {
    let filler = " ".repeat(span.len());
    text.replace_range(span, &filler);
}
