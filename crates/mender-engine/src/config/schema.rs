use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenderConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub healing: HealingConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Visibility wait per candidate.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_max_candidates_per_strategy")]
    pub max_candidates_per_strategy: usize,
    /// Learned patterns fetched per resolution.
    #[serde(default = "default_learned_limit")]
    pub learned_limit: usize,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    /// Write a pattern for every successful plain resolution. Off by
    /// default: a recorded pattern can change which strategy wins next time.
    #[serde(default)]
    pub record_resolutions: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            max_candidates_per_strategy: default_max_candidates_per_strategy(),
            learned_limit: default_learned_limit(),
            min_similarity: default_min_similarity(),
            record_resolutions: false,
        }
    }
}

impl ResolverConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

fn default_probe_timeout_ms() -> u64 {
    500
}

fn default_max_candidates_per_strategy() -> usize {
    24
}

fn default_learned_limit() -> usize {
    5
}

fn default_min_similarity() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealingConfig {
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives: usize,
    /// Visibility wait before acting on a located element.
    #[serde(default = "default_probe_timeout_ms")]
    pub visibility_timeout_ms: u64,
    #[serde(default = "default_learned_limit")]
    pub learned_limit: usize,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    #[serde(default)]
    pub record_original_success: bool,
}

impl Default for HealingConfig {
    fn default() -> Self {
        Self {
            action_timeout_ms: default_action_timeout_ms(),
            max_alternatives: default_max_alternatives(),
            visibility_timeout_ms: default_probe_timeout_ms(),
            learned_limit: default_learned_limit(),
            min_similarity: default_min_similarity(),
            record_original_success: false,
        }
    }
}

impl HealingConfig {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_millis(self.visibility_timeout_ms)
    }
}

fn default_action_timeout_ms() -> u64 {
    5000
}

fn default_max_alternatives() -> usize {
    24
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON-lines pattern file. In-memory store when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}
