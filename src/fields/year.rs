//! Model year extraction.

use std::ops::RangeInclusive;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::ExtractedField;

/// Any 4-digit token in this range is considered a year at all.
pub const BROAD_YEAR_RANGE: RangeInclusive<u32> = 1900..=2099;
/// Bound for the keyword-free fallback.
pub const VEHICLE_YEAR_RANGE: RangeInclusive<u32> = 1990..=2030;

pub const CONTEXT_CONFIDENCE: f64 = 0.9;
pub const FALLBACK_CONFIDENCE: f64 = 0.6;

static YEAR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})\b").expect("valid year regex"));

static YEAR_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:MODEL YEAR|YEAR|YR|MODEL) (\d{4})\b").expect("valid year context regex")
});

/// Extract the model year from corrected text.
///
/// A year following a year/model label wins; otherwise the newest plausible
/// vehicle year in the text.
pub fn extract_year(text: &str) -> ExtractedField {
    let in_broad_range = |y: &u32| BROAD_YEAR_RANGE.contains(y);

    let contextual = YEAR_CONTEXT
        .captures_iter(text)
        .filter_map(|cap| cap.get(1)?.as_str().parse::<u32>().ok())
        .find(in_broad_range);
    if let Some(year) = contextual {
        return ExtractedField::found(year.to_string(), CONTEXT_CONFIDENCE);
    }

    let newest = YEAR_TOKEN
        .captures_iter(text)
        .filter_map(|cap| cap.get(1)?.as_str().parse::<u32>().ok())
        .filter(in_broad_range)
        .filter(|y| VEHICLE_YEAR_RANGE.contains(y))
        .max();

    match newest {
        Some(year) => ExtractedField::found(year.to_string(), FALLBACK_CONFIDENCE),
        None => ExtractedField::absent(),
    }
}
