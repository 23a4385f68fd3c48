use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    Name,
    Phone,
    Email,
    Budget,
    LocationPreference,
    PropertyType,
}

impl LeadField {
    pub const ALL: [LeadField; 6] = [
        LeadField::Name,
        LeadField::Phone,
        LeadField::Email,
        LeadField::Budget,
        LeadField::LocationPreference,
        LeadField::PropertyType,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Budget => "budget",
            Self::LocationPreference => "location_preference",
            Self::PropertyType => "property_type",
        }
    }

    /// Human wording used when asking the lead for the field.
    pub fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone number",
            Self::Email => "email address",
            Self::Budget => "budget",
            Self::LocationPreference => "location preference",
            Self::PropertyType => "property type",
        }
    }

    /// Fields whose values come from a format validator rather than a vocabulary match.
    pub fn is_validated(self) -> bool {
        matches!(self, Self::Name | Self::Phone | Self::Email | Self::Budget)
    }
}

/// Whole-dirham budget, a single figure or a ballpark range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetValue {
    Fixed { amount: i64 },
    Range { min: i64, max: i64 },
}

impl fmt::Display for BudgetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed { amount } => write!(f, "AED {}", group_thousands(*amount)),
            Self::Range { min, max } => {
                write!(f, "AED {} - {}", group_thousands(*min), group_thousands(*max))
            }
        }
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    Villa,
    Penthouse,
    Studio,
    Duplex,
    Land,
    Commercial,
}

impl PropertyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::Villa => "villa",
            Self::Penthouse => "penthouse",
            Self::Studio => "studio",
            Self::Duplex => "duplex",
            Self::Land => "land",
            Self::Commercial => "commercial",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Apartment => "Apartment",
            Self::Villa => "Villa",
            Self::Penthouse => "Penthouse",
            Self::Studio => "Studio",
            Self::Duplex => "Duplex",
            Self::Land => "Land",
            Self::Commercial => "Commercial",
        }
    }
}

/// Candidate values found in a single inbound message. Absent means "not found or rejected".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub budget: Option<BudgetValue>,
    pub location_preference: Option<String>,
    pub property_type: Option<PropertyType>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }

    pub fn present_fields(&self) -> Vec<LeadField> {
        LeadField::ALL
            .into_iter()
            .filter(|field| match field {
                LeadField::Name => self.name.is_some(),
                LeadField::Phone => self.phone.is_some(),
                LeadField::Email => self.email.is_some(),
                LeadField::Budget => self.budget.is_some(),
                LeadField::LocationPreference => self.location_preference.is_some(),
                LeadField::PropertyType => self.property_type.is_some(),
            })
            .collect()
    }
}

/// Everything collected about one lead so far.
///
/// A field only ever moves from absent to present or from one accepted value to another;
/// rejected candidates never reach the profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadProfile {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub budget: Option<BudgetValue>,
    pub location_preference: Option<String>,
    pub property_type: Option<PropertyType>,
    #[serde(default)]
    pub validated_fields: BTreeSet<LeadField>,
}

impl LeadProfile {
    pub fn has(&self, field: LeadField) -> bool {
        match field {
            LeadField::Name => self.name.is_some(),
            LeadField::Phone => self.phone.is_some(),
            LeadField::Email => self.email.is_some(),
            LeadField::Budget => self.budget.is_some(),
            LeadField::LocationPreference => self.location_preference.is_some(),
            LeadField::PropertyType => self.property_type.is_some(),
        }
    }

    pub fn present_fields(&self) -> Vec<LeadField> {
        LeadField::ALL.into_iter().filter(|field| self.has(*field)).collect()
    }

    pub fn missing_fields(&self) -> Vec<LeadField> {
        LeadField::ALL.into_iter().filter(|field| !self.has(*field)).collect()
    }

    /// Overwrites each field for which `candidates` holds a non-empty value and returns the
    /// fields whose stored value actually changed.
    pub fn merge(&mut self, candidates: ExtractedFields) -> Vec<LeadField> {
        let mut changed = Vec::new();

        merge_text(&mut self.name, candidates.name, LeadField::Name, &mut changed);
        merge_text(&mut self.phone, candidates.phone, LeadField::Phone, &mut changed);
        merge_text(&mut self.email, candidates.email, LeadField::Email, &mut changed);
        merge_value(&mut self.budget, candidates.budget, LeadField::Budget, &mut changed);
        merge_text(
            &mut self.location_preference,
            candidates.location_preference,
            LeadField::LocationPreference,
            &mut changed,
        );
        merge_value(
            &mut self.property_type,
            candidates.property_type,
            LeadField::PropertyType,
            &mut changed,
        );

        for field in LeadField::ALL {
            if field.is_validated() && self.has(field) && changed.contains(&field) {
                self.validated_fields.insert(field);
            }
        }

        changed
    }
}

fn merge_text(
    slot: &mut Option<String>,
    candidate: Option<String>,
    field: LeadField,
    changed: &mut Vec<LeadField>,
) {
    let candidate = candidate.filter(|value| !value.trim().is_empty());
    merge_value(slot, candidate, field, changed);
}

fn merge_value<T: PartialEq>(
    slot: &mut Option<T>,
    candidate: Option<T>,
    field: LeadField,
    changed: &mut Vec<LeadField>,
) {
    let Some(candidate) = candidate else {
        return;
    };
    if slot.as_ref() != Some(&candidate) {
        *slot = Some(candidate);
        changed.push(field);
    }
}
