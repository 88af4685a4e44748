//! VIN extraction.
//!
//! Only the last five characters of a VIN are ever returned.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{tokens, FIELD_LABELS};
use crate::schema::ExtractedField;

pub const VIN_LEN: usize = 17;
pub const VIN_CONFIDENCE: f64 = 0.95;
const VEHICLE_ID_LEN: usize = 5;
const MAX_CHAR_REPEATS: usize = 4;
/// Trailing digits required of a VIN assembled from pieces.
const SERIAL_TAIL_LEN: usize = 4;
const MIN_PARTS_WITH_DIGITS: usize = 2;
const MIN_LETTER_FRAGMENT_LEN: usize = 3;

static STRICT_VIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-HJ-NPR-Z0-9]{17}\b").expect("valid VIN regex"));

static VIN_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:VEHICLE IDENTIFICATION NUMBER|IDENTIFICATION NUMBER|VIN)(?: (?:NO|NUMBER))? ?([A-Z0-9 ]{17,})",
    )
    .expect("valid VIN context regex")
});

static VIN_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-HJ-NPR-Z0-9]{17,}").expect("valid VIN run regex"));

/// Whether `candidate` is an acceptable VIN.
///
/// Exactly 17 uppercase letters or digits, none of `I`, `O`, `Q`, no character
/// more than 4 times, and at least one letter and one digit.
pub fn is_valid_vin(candidate: &str) -> bool {
    if candidate.chars().count() != VIN_LEN {
        return false;
    }
    if !candidate
        .chars()
        .all(|c| (c.is_ascii_uppercase() && !matches!(c, 'I' | 'O' | 'Q')) || c.is_ascii_digit())
    {
        return false;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in candidate.chars() {
        *counts.entry(c).or_default() += 1;
    }
    if counts.values().any(|&n| n > MAX_CHAR_REPEATS) {
        return false;
    }

    candidate.chars().any(|c| c.is_ascii_uppercase())
        && candidate.chars().any(|c| c.is_ascii_digit())
}

/// Extract the vehicle identifier (VIN suffix) from corrected text.
pub fn extract_vin(text: &str) -> ExtractedField {
    let strategies: [(&str, fn(&str) -> Option<String>); 4] = [
        ("strict", strict_scan),
        ("loose", loose_scan),
        ("context", context_scan),
        ("line_rescan", line_rescan),
    ];

    for (name, strategy) in strategies {
        if let Some(vin) = strategy(text) {
            debug!("VIN found via {} scan", name);
            return ExtractedField::found(vehicle_id(&vin), VIN_CONFIDENCE);
        }
    }
    ExtractedField::absent()
}

fn vehicle_id(vin: &str) -> String {
    vin.chars().skip(VIN_LEN - VEHICLE_ID_LEN).collect()
}

fn strict_scan(text: &str) -> Option<String> {
    STRICT_VIN
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|c| is_valid_vin(c))
        .map(str::to_string)
}

/// Join runs of consecutive tokens whose concatenation is exactly 17 characters.
///
/// Field labels and tokens that cannot be a VIN fragment break a run, so
/// `NUMBER` is never glued onto a VIN chunk and ordinary words never add up
/// to one. At least two of the joined parts must carry digits.
fn loose_scan(text: &str) -> Option<String> {
    for line in text.lines() {
        let mut segments: Vec<Vec<String>> = vec![Vec::new()];
        for token in tokens(line) {
            let part = token.replace('-', "");
            if FIELD_LABELS.contains(&token) || !is_fragment(&part) {
                segments.push(Vec::new());
            } else if let Some(segment) = segments.last_mut() {
                segment.push(part);
            }
        }

        for parts in &segments {
            for start in 0..parts.len() {
                let mut joined = String::new();
                let mut with_digits = 0;
                for (used, part) in parts[start..].iter().enumerate() {
                    joined.push_str(part);
                    if part.chars().any(|c| c.is_ascii_digit()) {
                        with_digits += 1;
                    }
                    if joined.len() > VIN_LEN {
                        break;
                    }
                    if joined.len() == VIN_LEN
                        && used > 0
                        && with_digits >= MIN_PARTS_WITH_DIGITS
                        && is_plausible_vin(&joined)
                    {
                        return Some(joined);
                    }
                }
            }
        }
    }
    None
}

/// A token that could be a chunk of a split VIN.
fn is_fragment(part: &str) -> bool {
    let in_alphabet = part
        .chars()
        .all(|c| c.is_ascii_digit() || (c.is_ascii_uppercase() && !matches!(c, 'I' | 'O' | 'Q')));
    in_alphabet
        && (part.chars().any(|c| c.is_ascii_digit()) || part.len() >= MIN_LETTER_FRAGMENT_LEN)
}

/// A valid VIN that also ends in a numeric serial.
///
/// Used by the scans that assemble a VIN out of pieces; a real serial tail
/// is what separates a split VIN from words that happen to add up to 17.
fn is_plausible_vin(candidate: &str) -> bool {
    is_valid_vin(candidate)
        && candidate
            .chars()
            .rev()
            .take(SERIAL_TAIL_LEN)
            .all(|c| c.is_ascii_digit())
}

/// The first 17 alphanumerics after a VIN label.
fn context_scan(text: &str) -> Option<String> {
    context_scan_aligned(text, text)
}

/// Find VIN labels in `labels`, read the candidate from the same byte range of
/// `values`. Both texts must be char-for-char aligned ASCII.
fn context_scan_aligned(labels: &str, values: &str) -> Option<String> {
    VIN_CONTEXT.captures_iter(labels).find_map(|cap| {
        let range = cap.get(1)?.range();
        let candidate: String = values
            .get(range)?
            .chars()
            .filter(|c| *c != ' ')
            .take(VIN_LEN)
            .collect();
        is_valid_vin(&candidate).then_some(candidate)
    })
}

/// Last resort: every 17-window of every VIN-alphabet run on each compacted line.
fn line_rescan(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let compact: String = line.chars().filter(|c| *c != ' ').collect();
        VIN_RUN.find_iter(&compact).find_map(|run| {
            let run = run.as_str();
            (0..=run.len() - VIN_LEN)
                .map(|start| &run[start..start + VIN_LEN])
                .find(|window| is_plausible_vin(window))
                .map(str::to_string)
        })
    })
}

/// Retry the VIN against a letters-as-digits rewrite of `corrected`.
///
/// Only the strict scan and the label-anchored scan run here. Labels are
/// located in `corrected` (the rewrite turns `VIN` into `V1N`) and the
/// candidate is read from the same range of `variant`.
pub fn extract_vin_from_variant(corrected: &str, variant: &str) -> ExtractedField {
    let found = strict_scan(variant).or_else(|| {
        (corrected.len() == variant.len())
            .then(|| context_scan_aligned(corrected, variant))
            .flatten()
    });
    match found {
        Some(vin) => {
            debug!("VIN found in letters-as-digits variant");
            ExtractedField::found(vehicle_id(&vin), VIN_CONFIDENCE)
        }
        None => ExtractedField::absent(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_vin() {
        assert!(is_valid_vin("1HGCM82633A004352"));
        assert!(is_valid_vin("JH4KA7561PC008269"));
    }

    #[test]
    fn test_banned_letters_only_fail() {
        assert!(!is_valid_vin("IIIIOOOOQQQQIIOOQ"));
        assert!(!is_valid_vin("OQIOQIOQIOQIOQIOQ"));
    }

    #[test]
    fn test_wrong_length_fails() {
        assert!(!is_valid_vin(""));
        assert!(!is_valid_vin("1HGCM82633A00435"));
        assert!(!is_valid_vin("1HGCM82633A0043521"));
    }

    #[test]
    fn test_banned_letter_fails() {
        assert!(!is_valid_vin("1HGCM82633AO04352"));
        assert!(!is_valid_vin("1HGCM82633AI04352"));
    }

    #[test]
    fn test_repeated_character_fails() {
        assert!(!is_valid_vin("1HG33333CM8204352"));
        assert!(!is_valid_vin("AAAAA123456789BCD"));
        assert!(is_valid_vin("AAAA1234567890BCD"));
    }

    #[test]
    fn test_needs_letter_and_digit() {
        assert!(!is_valid_vin("12345678901234567"));
        assert!(!is_valid_vin("ABCDEFGHJKLMNPRST"));
    }

    #[test]
    fn test_lowercase_fails() {
        assert!(!is_valid_vin("1hgcm82633a004352"));
    }

    #[test]
    fn test_strict_scan_returns_suffix() {
        let field = extract_vin("TITLE\nVIN 1HGCM82633A004352 YEAR 2003");
        assert_eq!(field.value(), Some("04352"));
        assert_eq!(field.confidence, VIN_CONFIDENCE);
    }

    #[test]
    fn test_loose_scan_joins_tokens() {
        let field = extract_vin("NUMBER 1HGCM 82633A 004352 HONDA");
        assert_eq!(field.value(), Some("04352"));
    }

    #[test]
    fn test_context_scan_glued_label() {
        // Trailing label glued onto the VIN defeats the token scans.
        let field = extract_vin("VIN NO 1HGCM82633A004352YR");
        assert_eq!(field.value(), Some("04352"));
    }

    #[test]
    fn test_loose_scan_ignores_labels() {
        assert_eq!(loose_scan("NUMBER 1HGCM 82633A 004352"), Some("1HGCM82633A004352".to_string()));
        assert_eq!(loose_scan("YEAR 2019 MAKE TOYOTA"), None);
    }

    #[test]
    fn test_line_rescan_window() {
        assert_eq!(
            line_rescan("1HGCM82633A004352 XYZ"),
            Some("1HGCM82633A004352".to_string())
        );
        // Banned letters split the run, leaving the VIN as its own window.
        let field = extract_vin("VINNO1HGCM82633A004352");
        assert_eq!(field.value(), Some("04352"));
        assert_eq!(field.confidence, VIN_CONFIDENCE);
    }

    #[test]
    fn test_loose_scan_needs_vin_fragments() {
        // Plain words and short tokens never add up to a VIN.
        assert_eq!(loose_scan("2017 JEEP WRANGLER X"), None);
        assert_eq!(loose_scan("2019 T0Y0TA CAMRY 5E"), None);
        // One numeric part is not enough.
        assert_eq!(loose_scan("HGCMBAHGCMBA 12345"), None);
    }

    #[test]
    fn test_rescan_needs_serial_tail() {
        assert_eq!(line_rescan("2017 JEEP WRANGLER X"), None);
        assert_eq!(extract_vin("2017 JEEP WRANGLER X"), ExtractedField::absent());
    }

    #[test]
    fn test_variant_retry_reads_labelled_value() {
        let corrected = "VIN 1HGCM 82633A 0O4352";
        assert_eq!(extract_vin(corrected), ExtractedField::absent());

        let variant = "V1N 1HGCM 82633A 004352";
        let field = extract_vin_from_variant(corrected, variant);
        assert_eq!(field.value(), Some("04352"));
        assert_eq!(field.confidence, VIN_CONFIDENCE);
    }

    #[test]
    fn test_variant_retry_skips_loose_scans() {
        let corrected = "2019 TOYOTA CAMRY SE";
        let variant = "2019 T0Y0TA CAMRY 5E";
        assert_eq!(extract_vin_from_variant(corrected, variant), ExtractedField::absent());
    }

    #[test]
    fn test_no_vin() {
        let field = extract_vin("YEAR 2019 MAKE TOYOTA MODEL CAMRY");
        assert_eq!(field, ExtractedField::absent());
        assert_eq!(extract_vin(""), ExtractedField::absent());
    }
}
