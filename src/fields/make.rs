//! Manufacturer extraction through the alias table.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::aliases::MakeAliasTable;
use crate::schema::ExtractedField;

pub const CONTEXT_CONFIDENCE: f64 = 0.85;
pub const SUBSTRING_CONFIDENCE: f64 = 0.7;
pub const WORD_CONFIDENCE: f64 = 0.6;

static MAKE_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:MANUFACTURER|MAKE|MFR) ([A-Z]+)(?: ([A-Z]+))?")
        .expect("valid make context regex")
});

/// Extract the canonical manufacturer name from corrected text.
pub fn extract_make(text: &str, aliases: &MakeAliasTable) -> ExtractedField {
    if let Some(canonical) = context_match(text, aliases) {
        debug!("Make '{}' found via label", canonical);
        return ExtractedField::found(canonical, CONTEXT_CONFIDENCE);
    }
    if let Some(found) = aliases.find_substring(text) {
        debug!("Make '{}' found via substring '{}'", found.canonical, found.key);
        return ExtractedField::found(found.canonical, SUBSTRING_CONFIDENCE);
    }
    if let Some(found) = aliases.find_word(text) {
        debug!("Make '{}' found via word '{}'", found.canonical, found.key);
        return ExtractedField::found(found.canonical, WORD_CONFIDENCE);
    }
    ExtractedField::absent()
}

/// The word (or two words) after a make label, resolved through the alias table.
fn context_match(text: &str, aliases: &MakeAliasTable) -> Option<String> {
    MAKE_CONTEXT.captures_iter(text).find_map(|cap| {
        let first = cap.get(1)?.as_str();
        let two_words = cap
            .get(2)
            .and_then(|second| aliases.resolve(&format!("{} {}", first, second.as_str())));
        two_words
            .or_else(|| aliases.resolve(first))
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MakeAliasTable {
        MakeAliasTable::builtin()
    }

    #[test]
    fn test_context_make() {
        let field = extract_make("YEAR 2019 MAKE TOYOTA MODEL CAMRY", &table());
        assert_eq!(field.value(), Some("TOYOTA"));
        assert_eq!(field.confidence, CONTEXT_CONFIDENCE);
    }

    #[test]
    fn test_context_alias_is_canonicalized() {
        let field = extract_make("MAKE CHEVY MODEL MALIBU", &table());
        assert_eq!(field.value(), Some("CHEVROLET"));
        assert_eq!(field.confidence, CONTEXT_CONFIDENCE);
    }

    #[test]
    fn test_context_two_word_make() {
        let field = extract_make("MAKE LAND ROVER MODEL DEFENDER", &table());
        assert_eq!(field.value(), Some("LAND ROVER"));
    }

    #[test]
    fn test_unknown_context_falls_through() {
        // MAKE label points at an unknown word; the substring scan still finds HONDA.
        let field = extract_make("MAKE UNKNOWN 2004 HONDACIVIC", &table());
        assert_eq!(field.value(), Some("HONDA"));
        assert_eq!(field.confidence, SUBSTRING_CONFIDENCE);
    }

    #[test]
    fn test_word_scan_for_short_keys() {
        let field = extract_make("2012 VW JETTA", &table());
        assert_eq!(field.value(), Some("VOLKSWAGEN"));
        assert_eq!(field.confidence, WORD_CONFIDENCE);
    }

    #[test]
    fn test_no_make() {
        assert_eq!(extract_make("1HGCM82633A004352", &table()), ExtractedField::absent());
        assert_eq!(extract_make("", &table()), ExtractedField::absent());
    }

    #[test]
    fn test_alternate_table() {
        let custom =
            MakeAliasTable::from_entries([("SKODA".to_string(), vec!["SKOD".to_string()])]);
        assert_eq!(extract_make("MAKE SKOD", &custom).value(), Some("SKODA"));
        assert_eq!(extract_make("MAKE TOYOTA", &custom), ExtractedField::absent());
    }
}
