//! Pipeline configuration.
//!
//! Loaded from a JSON file (`PIPELINE_CONFIG`, default `configs/pipeline.json`).
//! Every field has a default, so a missing file or a partial one is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aliases::MakeAliasTable;
use crate::normalize::normalize;
use crate::ocr::{default_passes, PassConfig};
use crate::scoring::DEFAULT_KEYWORDS;

pub const DEFAULT_CONFIG_PATH: &str = "configs/pipeline.json";

/// Configuration for the recognition and scoring stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ordered recognition passes.
    #[serde(default = "default_passes")]
    pub passes: Vec<PassConfig>,
    /// Pass used once when every configured pass failed.
    #[serde(default)]
    pub fallback_pass: PassConfig,
    #[serde(default = "default_pass_timeout_secs")]
    pub pass_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_passes")]
    pub max_concurrent_passes: usize,
    /// Keywords worth points when scoring raw candidates.
    #[serde(default = "default_scoring_keywords")]
    pub scoring_keywords: Vec<String>,
    /// Jurisdiction names, scored like keywords (e.g. "STATE OF NEVADA").
    #[serde(default)]
    pub jurisdictions: Vec<String>,
    /// Optional alias table replacing the built-in one.
    #[serde(default)]
    pub make_aliases_path: Option<PathBuf>,
}

fn default_pass_timeout_secs() -> u64 {
    30
}

fn default_max_concurrent_passes() -> usize {
    3
}

fn default_scoring_keywords() -> Vec<String> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            passes: default_passes(),
            fallback_pass: PassConfig::fallback(),
            pass_timeout_secs: default_pass_timeout_secs(),
            max_concurrent_passes: default_max_concurrent_passes(),
            scoring_keywords: default_scoring_keywords(),
            jurisdictions: Vec::new(),
            make_aliases_path: None,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        config.validate()?;
        info!(
            "Loaded pipeline config from {:?}: {} passes",
            path,
            config.passes.len()
        );
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            info!("No pipeline config at {:?}; using defaults", path);
            Ok(Self::default())
        }
    }

    /// Resolve the config path from `PIPELINE_CONFIG` and load it.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("PIPELINE_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_or_default(Path::new(&path))
    }

    fn validate(&self) -> Result<()> {
        if self.passes.is_empty() {
            anyhow::bail!("Pipeline config must define at least one pass");
        }
        let mut ids: Vec<&str> = self.passes.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        if let Some(dup) = ids.windows(2).find(|w| w[0] == w[1]) {
            anyhow::bail!("Duplicate pass id: {}", dup[0]);
        }
        if self.pass_timeout_secs == 0 {
            anyhow::bail!("pass_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout_secs)
    }

    /// Scoring keywords plus jurisdiction names.
    pub fn all_keywords(&self) -> Vec<String> {
        self.scoring_keywords
            .iter()
            .chain(self.jurisdictions.iter())
            .cloned()
            .collect()
    }

    /// Jurisdiction words a plate candidate must never be: every normalized
    /// word of each jurisdiction name plus the name with spaces removed.
    pub fn plate_denylist(&self) -> Vec<String> {
        let mut words: Vec<String> = Vec::new();
        for name in &self.jurisdictions {
            let normalized = normalize(name);
            words.extend(normalized.split_whitespace().map(str::to_string));
            words.push(normalized.split_whitespace().collect());
        }
        words.retain(|w| !w.is_empty());
        words.sort();
        words.dedup();
        words
    }

    /// The configured alias table, or the built-in one.
    pub fn make_aliases(&self) -> Result<MakeAliasTable> {
        match &self.make_aliases_path {
            Some(path) => MakeAliasTable::load_from_file(path),
            None => Ok(MakeAliasTable::builtin()),
        }
    }
}
