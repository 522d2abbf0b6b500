//! General run-wide settings.

use serde::{Deserialize, Serialize};

const fn default_seed() -> u64 {
    42
}

fn default_language() -> String {
    "Japanese".into()
}

const fn default_summary_chars() -> usize {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Seed for every stochastic step (forests, k-means, layout, jitter).
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Output language requested from the language model.
    #[serde(default = "default_language")]
    pub language: String,

    /// Characters kept in each record summary before `...` is appended.
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            language: default_language(),
            summary_chars: default_summary_chars(),
        }
    }
}
