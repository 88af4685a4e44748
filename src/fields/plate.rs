//! License plate extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::has_letter_and_digit;
use crate::schema::ExtractedField;

pub const CONTEXT_CONFIDENCE: f64 = 0.9;
pub const REGIONAL_CONFIDENCE: f64 = 0.8;
pub const GENERIC_CONFIDENCE: f64 = 0.5;

/// Words that show up in plate-shaped positions but are never plates.
const DENYLIST: &[&str] = &[
    "TITLE", "CERTIFICATE", "REGISTRATION", "VEHICLE", "LICENSE", "PLATE", "NUMBER", "OWNER",
    "ADDRESS", "MODEL", "ODOMETER", "LIENHOLDER", "DEPARTMENT", "MOTOR", "VEHICLES", "STATE",
    "CALIFORNIA", "TEXAS", "FLORIDA", "GEORGIA", "ARIZONA", "NEVADA", "OREGON", "VIRGINIA",
    "REG343", "REG227", "VTR130", "FORM130U",
];

/// Regional plate shapes, most specific first.
static REGIONAL_SHAPES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // 1ABC234
        r"\b[0-9][A-Z]{3}[0-9]{3}\b",
        // 1AB0234: the shape above once a misread O has been corrected to 0
        r"\b[0-9][A-Z]{2}0[0-9]{3}\b",
        // ABC1234
        r"\b[A-Z]{3}[0-9]{4}\b",
        // AB12345
        r"\b[A-Z]{2}[0-9]{5}\b",
        // ABC123
        r"\b[A-Z]{3}[0-9]{3}\b",
        // 123ABC
        r"\b[0-9]{3}[A-Z]{3}\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid plate regex"))
    .collect()
});

static PLATE_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:LICENSE PLATE|PLATE NO|PLATE NUMBER|PLATE|LICENSE NO|LICENSE|LIC NO|TAG)(?: NO| NUMBER)? ([A-Z0-9]{6,8})\b",
    )
    .expect("valid plate context regex")
});

static GENERIC_PLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z0-9]{6,8}\b").expect("valid generic plate regex"));

/// Whether a candidate may be reported as a plate at all.
pub fn is_acceptable_plate(candidate: &str) -> bool {
    (6..=8).contains(&candidate.len())
        && !DENYLIST.contains(&candidate)
        && has_letter_and_digit(candidate)
}

/// Extract a license plate from corrected text.
pub fn extract_plate(text: &str) -> ExtractedField {
    extract_plate_excluding(text, &[])
}

/// Extract a license plate, also rejecting any candidate in `excluded`
/// (configured jurisdiction words, already normalized).
pub fn extract_plate_excluding(text: &str, excluded: &[String]) -> ExtractedField {
    let accept = |candidate: &str| {
        is_acceptable_plate(candidate) && !excluded.iter().any(|word| word == candidate)
    };

    let contextual = PLATE_CONTEXT
        .captures_iter(text)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .find(|c| accept(c));

    let regional = REGIONAL_SHAPES.iter().find_map(|shape| {
        shape
            .find_iter(text)
            .map(|m| m.as_str())
            .find(|c| accept(c))
    });

    let (plate, tier) = if let Some(plate) = regional {
        (plate, REGIONAL_CONFIDENCE)
    } else if let Some(plate) = contextual {
        (plate, CONTEXT_CONFIDENCE)
    } else if let Some(plate) = GENERIC_PLATE
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|c| accept(c))
    {
        (plate, GENERIC_CONFIDENCE)
    } else {
        return ExtractedField::absent();
    };

    // A plate that also sits behind a plate label gets the label's tier.
    let confidence = if contextual == Some(plate) {
        CONTEXT_CONFIDENCE
    } else {
        tier
    };
    debug!("Plate '{}' accepted at confidence {}", plate, confidence);
    ExtractedField::found(plate, confidence)
}
