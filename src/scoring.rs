//! Scoring of raw recognition candidates.
//!
//! Every pass produces a raw string; the one that looks most like a vehicle
//! title wins and is the only text handed to extraction.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

pub const KEYWORD_POINTS: u32 = 50;
pub const VIN_POINTS: u32 = 100;
pub const YEAR_POINTS: u32 = 30;
pub const PLATE_POINTS: u32 = 40;

/// Keywords counted when no configuration overrides them.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "VIN",
    "VEHICLE IDENTIFICATION",
    "IDENTIFICATION NUMBER",
    "YEAR",
    "MAKE",
    "MODEL",
    "PLATE",
    "LICENSE",
    "TITLE",
    "REGISTRATION",
    "CERTIFICATE",
    "OWNER",
];

// Pattern bonuses are anchored at the start of a token only, so text
// appended to a candidate can never take a bonus away.

static VIN_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b[A-HJ-NPR-Z0-9]{17}").expect("valid VIN token regex"));

static YEAR_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}").expect("valid year token regex"));

static ALNUM_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9]{6,8}").expect("valid plate token regex"));

/// A raw candidate with its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
    pub text: String,
    pub score: u32,
}

/// Keyword and pattern heuristics over raw recognition text.
#[derive(Debug, Clone)]
pub struct ResultScorer {
    keywords: Vec<Regex>,
}

impl ResultScorer {
    /// Build a scorer for the given keywords. Every case-insensitive occurrence
    /// counts, including one glued onto a neighbouring word.
    /// Keywords that do not compile are skipped with a warning.
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let mut compiled = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim();
            if keyword.is_empty() {
                continue;
            }
            let pattern = format!(r"(?i){}", regex::escape(keyword).replace(' ', r"\s+"));
            match Regex::new(&pattern) {
                Ok(regex) => compiled.push(regex),
                Err(e) => warn!("Skipping scoring keyword '{}': {}", keyword, e),
            }
        }
        debug!("Compiled {} scoring keywords", compiled.len());
        Self { keywords: compiled }
    }

    /// Additive score of one raw string.
    pub fn score(&self, text: &str) -> u32 {
        let length = text.chars().count() as u32;

        let keyword_hits: usize = self
            .keywords
            .iter()
            .map(|k| k.find_iter(text).count())
            .sum();

        let mut score = length + KEYWORD_POINTS * keyword_hits as u32;
        if VIN_TOKEN.is_match(text) {
            score += VIN_POINTS;
        }
        if YEAR_TOKEN.is_match(text) {
            score += YEAR_POINTS;
        }
        if ALNUM_TOKEN.find_iter(text).any(|m| is_mixed(m.as_str())) {
            score += PLATE_POINTS;
        }
        score
    }

    /// Highest-scoring candidate; ties go to the first one seen.
    /// `None` when there is nothing to choose from.
    pub fn select<S: AsRef<str>>(&self, candidates: &[S]) -> Option<ScoredCandidate> {
        let mut best: Option<ScoredCandidate> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            let text = candidate.as_ref();
            let score = self.score(text);
            debug!("Candidate {} scored {} ({} chars)", i, score, text.len());
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(ScoredCandidate {
                    text: text.to_string(),
                    score,
                });
            }
        }
        best
    }
}

fn is_mixed(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_alphabetic()) && token.chars().any(|c| c.is_ascii_digit())
}

impl Default for ResultScorer {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}
