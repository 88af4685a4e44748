//! Manufacturer alias table.
//!
//! Maps abbreviations and common misreads of manufacturer names onto one
//! canonical name. Built once, never mutated, shared behind an `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::normalize::normalize;

/// Alias keys shorter than this only match on word boundaries.
pub const MIN_SUBSTRING_KEY_LEN: usize = 5;

/// Built-in canonical names and their aliases.
const BUILTIN_ALIASES: &[(&str, &[&str])] = &[
    ("ACURA", &["ACUR"]),
    ("AUDI", &[]),
    ("BMW", &[]),
    ("BUICK", &["BUIC"]),
    ("CADILLAC", &["CADI", "CADILAC"]),
    ("CHEVROLET", &["CHEVY", "CHEV", "CHEVR", "CHEVORLET"]),
    ("CHRYSLER", &["CHRY", "CHRYS"]),
    ("DODGE", &["DODG"]),
    ("FIAT", &[]),
    ("FORD", &[]),
    ("GMC", &[]),
    ("HONDA", &["HOND"]),
    ("HYUNDAI", &["HYUN", "HYUNDIA"]),
    ("INFINITI", &["INFI", "INFINITY"]),
    ("JAGUAR", &["JAGU"]),
    ("JEEP", &[]),
    ("KIA", &[]),
    ("LAND ROVER", &["LANDROVER", "LNDR"]),
    ("LEXUS", &["LEXS"]),
    ("LINCOLN", &["LINC"]),
    ("MAZDA", &["MAZD"]),
    ("MERCEDES-BENZ", &["MERCEDES", "MERCEDES BENZ", "MERCEDESBENZ", "MERZ", "BENZ"]),
    ("MERCURY", &["MERC"]),
    ("MINI", &[]),
    ("MITSUBISHI", &["MITS", "MITSU"]),
    ("NISSAN", &["NISS", "NISN"]),
    ("PONTIAC", &["PONT"]),
    ("PORSCHE", &["PORS"]),
    ("RAM", &[]),
    ("SATURN", &["SATU"]),
    ("SUBARU", &["SUBA"]),
    ("TESLA", &["TESL"]),
    ("TOYOTA", &["TOYT", "TOYOT"]),
    ("VOLKSWAGEN", &["VOLK", "VW", "VOLKS"]),
    ("VOLVO", &["VOLV"]),
];

/// A located alias occurrence in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMatch {
    pub canonical: String,
    pub key: String,
    pub start: usize,
    pub end: usize,
}

/// Read-only alias table with its scan patterns compiled up front.
#[derive(Debug)]
pub struct MakeAliasTable {
    /// normalized alias key → canonical name
    keys: HashMap<String, String>,
    substring_scan: Option<Regex>,
    word_scan: Option<Regex>,
}

impl MakeAliasTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Self {
        let entries = BUILTIN_ALIASES.iter().map(|(canonical, aliases)| {
            (
                canonical.to_string(),
                aliases.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
            )
        });
        Self::from_entries(entries)
    }

    /// Build a table from `canonical → aliases` entries.
    ///
    /// Every canonical name is also a key for itself. Keys are normalized the
    /// same way recognition text is, so `MERCEDES-BENZ` matches `MERCEDESBENZ`.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Vec<String>)>) -> Self {
        let mut keys = HashMap::new();
        for (canonical, aliases) in entries {
            let canonical = canonical.trim().to_uppercase();
            for alias in std::iter::once(canonical.clone()).chain(aliases) {
                let key = normalize(&alias);
                if !key.is_empty() && !key.contains('\n') {
                    keys.insert(key, canonical.clone());
                }
            }
        }

        // Longest first so the alternation prefers `CHEVROLET` over `CHEV`.
        let mut sorted: Vec<&String> = keys.keys().collect();
        sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let substring_keys: Vec<String> = sorted
            .iter()
            .filter(|k| k.len() >= MIN_SUBSTRING_KEY_LEN)
            .map(|k| regex::escape(k))
            .collect();
        let word_keys: Vec<String> = sorted.iter().map(|k| regex::escape(k)).collect();

        let substring_scan = build_alternation(&substring_keys, false);
        let word_scan = build_alternation(&word_keys, true);

        debug!("Alias table built with {} keys", keys.len());

        Self {
            keys,
            substring_scan,
            word_scan,
        }
    }

    /// Load a table from a JSON file shaped `{ "CANONICAL": ["ALIAS", ...] }`.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read make aliases: {:?}", path))?;
        let entries: BTreeMap<String, Vec<String>> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse make aliases: {:?}", path))?;
        if entries.is_empty() {
            anyhow::bail!("No make aliases found in {:?}", path);
        }
        info!("Loaded {} canonical makes from {:?}", entries.len(), path);
        Ok(Self::from_entries(entries))
    }

    /// Resolve a single name (alias, misspelling or canonical) to its canonical form.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.keys.get(&normalize(name)).map(String::as_str)
    }

    /// Leftmost occurrence of a long alias key anywhere in the text, word boundaries ignored.
    pub fn find_substring(&self, text: &str) -> Option<AliasMatch> {
        self.find_with(self.substring_scan.as_ref()?, text)
    }

    /// Leftmost whole-word occurrence of any alias key.
    pub fn find_word(&self, text: &str) -> Option<AliasMatch> {
        self.find_with(self.word_scan.as_ref()?, text)
    }

    /// All whole-word occurrences of keys that resolve to `canonical`, in text order.
    pub fn occurrences_of(&self, canonical: &str, text: &str) -> Vec<AliasMatch> {
        let Some(scan) = self.word_scan.as_ref() else {
            return Vec::new();
        };
        scan.find_iter(text)
            .filter_map(|m| self.to_match(m))
            .filter(|m| m.canonical == canonical)
            .collect()
    }

    /// Whether `word` is any alias key or canonical name.
    pub fn is_make_word(&self, word: &str) -> bool {
        self.keys.contains_key(word)
    }

    /// Sorted, de-duplicated canonical names.
    pub fn canonical_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.keys.values().cloned().collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn find_with(&self, scan: &Regex, text: &str) -> Option<AliasMatch> {
        scan.find(text).and_then(|m| self.to_match(m))
    }

    fn to_match(&self, m: regex::Match<'_>) -> Option<AliasMatch> {
        let canonical = self.keys.get(m.as_str())?;
        Some(AliasMatch {
            canonical: canonical.clone(),
            key: m.as_str().to_string(),
            start: m.start(),
            end: m.end(),
        })
    }
}

impl Default for MakeAliasTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn build_alternation(keys: &[String], word_bounded: bool) -> Option<Regex> {
    if keys.is_empty() {
        return None;
    }
    let body = keys.join("|");
    let pattern = if word_bounded {
        format!(r"\b(?:{})\b", body)
    } else {
        format!("(?:{})", body)
    };
    Regex::new(&pattern).ok()
}
