//! Optional sentiment enrichment.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ensure};

const fn default_batch_size() -> usize {
    50
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentimentConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Texts scored per prompt.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            batch_size: default_batch_size(),
        }
    }
}

impl SentimentConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        ensure(self.batch_size >= 1, "sentiment.batch_size", "must be at least 1")
    }
}
