//! Character-confusion correction for normalized recognition text.
//!
//! Context rules run once each, in a fixed order, and never loop to a fixed
//! point. The general ambiguous-pair table is never applied in place; it only
//! produces candidate variants that extractors can be retried against.

use tracing::debug;

/// Letters OCR commonly reads in place of a digit, with the digit they stand for.
const CONFUSABLE_LETTERS: &[(char, char)] = &[
    ('O', '0'),
    ('Q', '0'),
    ('I', '1'),
    ('L', '1'),
    ('S', '5'),
    ('B', '8'),
    ('Z', '2'),
    ('G', '6'),
];

/// General digit/look-alike-letter pairs.
pub const AMBIGUOUS_PAIRS: &[(char, char)] = &[
    ('0', 'O'),
    ('1', 'I'),
    ('5', 'S'),
    ('8', 'B'),
    ('2', 'Z'),
];

/// Minimum digit run on each side of a confusable letter.
const MIN_FLANKING_DIGITS: usize = 3;

/// A context rule: name plus a pure rewrite.
struct ContextRule {
    name: &'static str,
    apply: fn(&str) -> String,
}

/// Context rules in priority order.
const CONTEXT_RULES: &[ContextRule] = &[
    ContextRule {
        name: "digit_run_letter",
        apply: fix_letters_in_digit_runs,
    },
    ContextRule {
        name: "year_token",
        apply: fix_year_tokens,
    },
    ContextRule {
        name: "vin_token",
        apply: fix_vin_tokens,
    },
];

/// Which global substitution produced a candidate variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    /// Look-alike letters rewritten to digits (`O` → `0`).
    LettersAsDigits,
    /// Digits rewritten to look-alike letters (`0` → `O`).
    DigitsAsLetters,
}

/// One mutually exclusive rewrite of the corrected text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateVariant {
    pub kind: VariantKind,
    pub text: String,
}

/// Apply every context rule once, in order. Unmatched text passes through.
pub fn correct(normalized: &str) -> String {
    let mut text = normalized.to_string();
    for rule in CONTEXT_RULES {
        let next = (rule.apply)(&text);
        if next != text {
            debug!("Correction rule '{}' rewrote text", rule.name);
        }
        text = next;
    }
    text
}

/// Build the ambiguous-pair variants of a corrected text.
///
/// Each variant applies the pair table in one direction only, so the two
/// substitutions can never cancel each other out.
pub fn variants(corrected: &str) -> Vec<CandidateVariant> {
    vec![
        CandidateVariant {
            kind: VariantKind::LettersAsDigits,
            text: substitute(corrected, |c| {
                AMBIGUOUS_PAIRS
                    .iter()
                    .find(|(_, letter)| *letter == c)
                    .map(|(digit, _)| *digit)
            }),
        },
        CandidateVariant {
            kind: VariantKind::DigitsAsLetters,
            text: substitute(corrected, |c| {
                AMBIGUOUS_PAIRS
                    .iter()
                    .find(|(digit, _)| *digit == c)
                    .map(|(_, letter)| *letter)
            }),
        },
    ]
}

/// Return the variant of the given kind.
pub fn variant(corrected: &str, kind: VariantKind) -> String {
    variants(corrected)
        .into_iter()
        .find(|v| v.kind == kind)
        .map(|v| v.text)
        .unwrap_or_else(|| corrected.to_string())
}

fn substitute(text: &str, map: impl Fn(char) -> Option<char>) -> String {
    text.chars().map(|c| map(c).unwrap_or(c)).collect()
}

fn confusable_digit(c: char) -> Option<char> {
    CONFUSABLE_LETTERS
        .iter()
        .find(|(letter, _)| *letter == c)
        .map(|(_, digit)| *digit)
}

/// Rewrite a confusable letter sitting between two runs of 3+ digits.
///
/// Digit runs are measured on the input, so a second letter in the same
/// numeric stretch is judged on the original characters.
fn fix_letters_in_digit_runs(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = chars.clone();

    for (i, &c) in chars.iter().enumerate() {
        let Some(digit) = confusable_digit(c) else {
            continue;
        };
        let before = chars[..i]
            .iter()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .count();
        let after = chars[i + 1..]
            .iter()
            .take_while(|c| c.is_ascii_digit())
            .count();
        if before >= MIN_FLANKING_DIGITS && after >= MIN_FLANKING_DIGITS {
            out[i] = digit;
        }
    }

    out.into_iter().collect()
}

/// Rewrite 4-character tokens such as `2O19` or `I998` into years.
fn fix_year_tokens(text: &str) -> String {
    map_tokens(text, |token| {
        if token.len() != 4 {
            return None;
        }
        let digits = token.chars().filter(|c| c.is_ascii_digit()).count();
        if digits < 2 || digits == 4 {
            return None;
        }
        let mapped: String = token
            .chars()
            .map(|c| match c {
                'O' => Some('0'),
                'I' | 'L' => Some('1'),
                d if d.is_ascii_digit() => Some(d),
                _ => None,
            })
            .collect::<Option<String>>()?;
        let year: u32 = mapped.parse().ok()?;
        (1900..=2099).contains(&year).then_some(mapped)
    })
}

/// Rewrite I/O/Q inside 17-character VIN-shaped tokens.
fn fix_vin_tokens(text: &str) -> String {
    map_tokens(text, |token| {
        if token.chars().count() != 17 {
            return None;
        }
        let vin_shaped = token
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        let has_banned = token.chars().any(|c| matches!(c, 'I' | 'O' | 'Q'));
        let has_digit = token.chars().any(|c| c.is_ascii_digit());
        if !(vin_shaped && has_banned && has_digit) {
            return None;
        }
        Some(
            token
                .chars()
                .map(|c| match c {
                    'I' => '1',
                    'O' | 'Q' => '0',
                    other => other,
                })
                .collect(),
        )
    })
}

/// Apply `rewrite` to every space-separated token, keeping line structure.
fn map_tokens(text: &str, rewrite: impl Fn(&str) -> Option<String>) -> String {
    text.split('\n')
        .map(|line| {
            line.split(' ')
                .map(|token| rewrite(token).unwrap_or_else(|| token.to_string()))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
