//! Model extraction, anchored on an already resolved make.

use once_cell::sync::Lazy;
use regex::Regex;

use super::year::BROAD_YEAR_RANGE;
use super::{title_case, FIELD_LABELS};
use crate::aliases::MakeAliasTable;
use crate::schema::ExtractedField;

pub const CONTEXT_CONFIDENCE: f64 = 0.75;
pub const ADJACENT_CONFIDENCE: f64 = 0.6;

/// Corporate and generic vehicle words that never name a model.
const GENERIC_WORDS: &[&str] = &[
    "MOTOR", "MOTORS", "COMPANY", "CO", "CORP", "CORPORATION", "INC", "LLC", "LTD", "GROUP",
    "DIVISION", "USA", "AMERICA", "NORTH", "INTERNATIONAL", "TRUCK", "TRUCKS", "CAR", "CARS",
    "AUTO", "AUTOMOBILE", "PASSENGER", "MFG", "MANUFACTURING",
];

static MODEL_CONTEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bMODEL ([A-Z0-9]+)").expect("valid model context regex"));

/// Extract the model for `make` (a canonical name) from corrected text.
///
/// Without a resolved make there is no anchor and the field stays absent.
pub fn extract_model(text: &str, make: Option<&str>, aliases: &MakeAliasTable) -> ExtractedField {
    extract_model_anchored(text, text, make, aliases)
}

/// Like [`extract_model`], but the make is located in `anchor_text` while the
/// model is read from `text`.
///
/// Used when the make was only found in a rewritten copy of the text. The two
/// must be char-for-char aligned ASCII so match offsets carry over.
pub fn extract_model_anchored(
    text: &str,
    anchor_text: &str,
    make: Option<&str>,
    aliases: &MakeAliasTable,
) -> ExtractedField {
    let Some(make) = make else {
        return ExtractedField::absent();
    };

    let contextual = MODEL_CONTEXT
        .captures_iter(text)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .find(|word| is_model_word(word, aliases));
    if let Some(word) = contextual {
        return ExtractedField::found(title_case(word), CONTEXT_CONFIDENCE);
    }

    let adjacent = aliases
        .occurrences_of(make, anchor_text)
        .into_iter()
        .filter_map(|hit| text.get(hit.end..).and_then(next_word))
        .find(|word| is_model_word(word, aliases) && !GENERIC_WORDS.contains(word));
    match adjacent {
        Some(word) => ExtractedField::found(title_case(word), ADJACENT_CONFIDENCE),
        None => ExtractedField::absent(),
    }
}

/// The word right after a match, on the same line.
fn next_word(rest: &str) -> Option<&str> {
    let rest = rest.strip_prefix(' ')?;
    rest.split(|c: char| c == ' ' || c == '\n')
        .next()
        .filter(|w| !w.is_empty())
}

fn is_model_word(word: &str, aliases: &MakeAliasTable) -> bool {
    if FIELD_LABELS.contains(&word) || aliases.is_make_word(word) {
        return false;
    }
    let is_year = word.len() == 4
        && word
            .parse::<u32>()
            .map(|y| BROAD_YEAR_RANGE.contains(&y))
            .unwrap_or(false);
    !is_year
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MakeAliasTable {
        MakeAliasTable::builtin()
    }

    #[test]
    fn test_requires_make() {
        let field = extract_model("MODEL CAMRY", None, &table());
        assert_eq!(field, ExtractedField::absent());
    }

    #[test]
    fn test_context_model_title_cased() {
        let field = extract_model("YEAR 2019 MAKE TOYOTA MODEL CAMRY", Some("TOYOTA"), &table());
        assert_eq!(field.value(), Some("Camry"));
        assert_eq!(field.confidence, CONTEXT_CONFIDENCE);
    }

    #[test]
    fn test_context_skips_labels_and_years() {
        let text = "MODEL YEAR 2015 MODEL 2015 MODEL TOYOTA MODEL RAV4";
        let field = extract_model(text, Some("TOYOTA"), &table());
        assert_eq!(field.value(), Some("Rav4"));
    }

    #[test]
    fn test_adjacent_to_make_alias() {
        let field = extract_model("TITLE 2011 CHEVY SILVERADO 1500", Some("CHEVROLET"), &table());
        assert_eq!(field.value(), Some("Silverado"));
        assert_eq!(field.confidence, ADJACENT_CONFIDENCE);
    }

    #[test]
    fn test_adjacent_skips_corporate_words() {
        let text = "FORD MOTOR COMPANY\nFORD F150";
        let field = extract_model(text, Some("FORD"), &table());
        assert_eq!(field.value(), Some("F150"));
    }

    #[test]
    fn test_anchored_reads_model_from_original_text() {
        // FORD only appears in the rewritten anchor; F150 is read unmangled.
        let field = extract_model_anchored(
            "2015 F0RD F150",
            "ZOIS FORD FISO",
            Some("FORD"),
            &table(),
        );
        assert_eq!(field.value(), Some("F150"));
        assert_eq!(field.confidence, ADJACENT_CONFIDENCE);
    }

    #[test]
    fn test_make_at_end_of_line() {
        let field = extract_model("MAKE HONDA\nOWNER JANE", Some("HONDA"), &table());
        assert_eq!(field, ExtractedField::absent());
    }
}
