//! 2D projection settings.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ensure};

const fn default_n_neighbors() -> usize {
    15
}

const fn default_epochs() -> usize {
    200
}

const fn default_negative_samples() -> usize {
    5
}

const fn default_jitter() -> f32 {
    0.01
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectionConfig {
    /// Neighborhood size of the layout graph, capped at `n - 1`.
    #[serde(default = "default_n_neighbors")]
    pub n_neighbors: usize,

    /// Layout optimization epochs.
    #[serde(default = "default_epochs")]
    pub epochs: usize,

    #[serde(default = "default_negative_samples")]
    pub negative_samples: usize,

    /// Uniform jitter half-width added to every coordinate.
    #[serde(default = "default_jitter")]
    pub jitter: f32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            n_neighbors: default_n_neighbors(),
            epochs: default_epochs(),
            negative_samples: default_negative_samples(),
            jitter: default_jitter(),
        }
    }
}

impl ProjectionConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.n_neighbors >= 2,
            "projection.n_neighbors",
            "must be at least 2",
        )?;
        ensure(self.epochs >= 1, "projection.epochs", "must be at least 1")?;
        ensure(
            (0.0..=0.05).contains(&self.jitter),
            "projection.jitter",
            "must be within 0.0..=0.05",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_large_jitter() {
        let config = ProjectionConfig {
            jitter: 0.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ProjectionConfig::default().validate().is_ok());
    }
}
