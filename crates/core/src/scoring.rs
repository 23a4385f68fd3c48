use crate::domain::lead::{LeadField, LeadProfile};

pub const MAX_SCORE: u8 = 100;
pub const HIGH_QUALITY_THRESHOLD: u8 = 70;

pub const NAME_WEIGHT: u32 = 10;
pub const PHONE_WEIGHT: u32 = 25;
pub const EMAIL_WEIGHT: u32 = 15;
pub const BUDGET_WEIGHT: u32 = 20;
pub const LOCATION_WEIGHT: u32 = 15;
pub const PROPERTY_TYPE_WEIGHT: u32 = 15;

pub fn weight(field: LeadField) -> u32 {
    match field {
        LeadField::Name => NAME_WEIGHT,
        LeadField::Phone => PHONE_WEIGHT,
        LeadField::Email => EMAIL_WEIGHT,
        LeadField::Budget => BUDGET_WEIGHT,
        LeadField::LocationPreference => LOCATION_WEIGHT,
        LeadField::PropertyType => PROPERTY_TYPE_WEIGHT,
    }
}

/// Sum of the weights of every present field, clamped to [`MAX_SCORE`].
pub fn score(profile: &LeadProfile) -> u8 {
    let total: u32 = profile.present_fields().into_iter().map(weight).sum();
    clamp(total)
}

pub fn is_high_quality(score: u8) -> bool {
    score >= HIGH_QUALITY_THRESHOLD
}

fn clamp(total: u32) -> u8 {
    u8::try_from(total.min(u32::from(MAX_SCORE))).unwrap_or(MAX_SCORE)
}
