//! Issue agenda settings.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ensure};

const fn default_majority_items() -> usize {
    4
}

const fn default_small_voice_items() -> usize {
    1
}

const fn default_sample_fraction() -> f64 {
    0.3
}

const fn default_min_samples() -> usize {
    10
}

const fn default_max_samples() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IssuesConfig {
    /// Agenda items drawn from majority topics.
    #[serde(default = "default_majority_items")]
    pub majority_items: usize,

    /// Agenda items drawn from the small-voice group.
    #[serde(default = "default_small_voice_items")]
    pub small_voice_items: usize,

    /// Share of each topic's texts quoted in the prompt.
    #[serde(default = "default_sample_fraction")]
    pub sample_fraction: f64,

    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Also caps the small-voice texts quoted.
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

impl Default for IssuesConfig {
    fn default() -> Self {
        Self {
            majority_items: default_majority_items(),
            small_voice_items: default_small_voice_items(),
            sample_fraction: default_sample_fraction(),
            min_samples: default_min_samples(),
            max_samples: default_max_samples(),
        }
    }
}

impl IssuesConfig {
    pub const fn total_items(&self) -> usize {
        self.majority_items + self.small_voice_items
    }

    /// Texts quoted for a topic with `count` members.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn samples_for(&self, count: usize) -> usize {
        let scaled = (count as f64 * self.sample_fraction) as usize;
        scaled.max(self.min_samples).min(self.max_samples).min(count)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            (3..=8).contains(&self.total_items()),
            "issues.majority_items",
            "majority_items + small_voice_items must be within 3..=8",
        )?;
        ensure(
            self.small_voice_items >= 1,
            "issues.small_voice_items",
            "must be at least 1",
        )?;
        ensure(
            self.sample_fraction > 0.0 && self.sample_fraction <= 1.0,
            "issues.sample_fraction",
            "must be within (0.0, 1.0]",
        )?;
        ensure(
            self.min_samples >= 1 && self.min_samples <= self.max_samples,
            "issues.min_samples",
            "must be within 1..=max_samples",
        )
    }
}
