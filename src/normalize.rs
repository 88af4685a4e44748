//! Text normalization for raw recognition output.
//!
//! Uppercases, drops everything outside `[A-Z0-9 ]` and collapses whitespace.
//! Line breaks survive so the per-line VIN rescan still has lines to work with.

/// Normalize one raw recognition string.
///
/// Each line is normalized on its own; blank lines are dropped and the
/// remaining lines are joined with `\n`. Idempotent.
pub fn normalize(raw: &str) -> String {
    raw.split('\n')
        .map(normalize_line)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_line(line: &str) -> String {
    let cleaned: String = line
        .chars()
        .flat_map(char::to_uppercase)
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_ascii_uppercase() || c.is_ascii_digit() {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}
