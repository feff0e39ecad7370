//! Engine configuration

use serde::{Deserialize, Serialize};

/// Tuning for the matching strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Minimum shared-trigram ratio kept by `Trigram2` (0.0-1.0)
    pub min_overlap: f64,
    /// Maximum Levenshtein distance accepted by `WordLen`
    pub max_edit_distance: usize,
    /// Extra word-length buckets probed on each side of the query word length
    pub bucket_spread: u32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_overlap: 0.5,
            max_edit_distance: 2,
            bucket_spread: 0,
        }
    }
}

/// Configuration for the `FuzzyCursor` façade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorConfig {
    /// Source values per population batch
    pub batch_size: usize,
    /// Row cap for the short-term verbatim fallback
    pub verbatim_limit: usize,
    /// Maximum suggestions returned per query (unbounded when `None`)
    pub max_results: Option<usize>,
    pub strategy: StrategyConfig,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            verbatim_limit: 100,
            max_results: None,
            strategy: StrategyConfig::default(),
        }
    }
}

impl CursorConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Batch size clamped to at least one value
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}
