//! Field extractors.
//!
//! Each extractor is a pure function of corrected text that walks an ordered
//! chain of strategies; the first strategy that yields a valid value wins and
//! reports that strategy's fixed confidence tier.

pub mod make;
pub mod model;
pub mod plate;
pub mod vin;
pub mod year;

pub use make::extract_make;
pub use model::{extract_model, extract_model_anchored};
pub use plate::{extract_plate, extract_plate_excluding};
pub use vin::{extract_vin, extract_vin_from_variant, is_valid_vin};
pub use year::extract_year;

/// Words that label fields on title and registration forms.
pub(crate) const FIELD_LABELS: &[&str] = &[
    "VIN", "VEHICLE", "IDENTIFICATION", "NUMBER", "NO", "YEAR", "YR", "MAKE", "MODEL", "BODY",
    "TYPE", "STYLE", "COLOR", "PLATE", "LICENSE", "TAG", "TITLE", "OWNER", "ADDRESS", "ODOMETER",
    "WEIGHT", "FUEL", "CYL", "DATE", "ISSUED", "EXPIRES",
];

/// Space-separated tokens of one line.
pub(crate) fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(' ').filter(|t| !t.is_empty())
}

pub(crate) fn has_letter_and_digit(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_alphabetic()) && token.chars().any(|c| c.is_ascii_digit())
}

/// `CAMRY` → `Camry`, `F150` → `F150`.
pub(crate) fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("CAMRY"), "Camry");
        assert_eq!(title_case("F150"), "F150");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_has_letter_and_digit() {
        assert!(has_letter_and_digit("7ABC123"));
        assert!(!has_letter_and_digit("1234567"));
        assert!(!has_letter_and_digit("TOYOTA"));
    }
}
