//! Outlier detection and small-voice split settings.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ensure};

const fn default_contamination() -> f64 {
    0.1
}

const fn default_n_trees() -> usize {
    100
}

const fn default_max_samples() -> usize {
    256
}

const fn default_lof_neighbors() -> usize {
    20
}

const fn default_threshold() -> f64 {
    0.65
}

const fn default_strict_threshold() -> f64 {
    0.9
}

const fn default_max_outlier_fraction() -> f64 {
    0.3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutlierConfig {
    /// Expected share of anomalies each detector flags.
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// Isolation forest size.
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,

    /// Isolation forest subsample cap.
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    /// Local outlier factor neighborhood size cap.
    #[serde(default = "default_lof_neighbors")]
    pub lof_neighbors: usize,

    /// Score above which a point is a small voice.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    /// Threshold used when `threshold` flags too many points.
    #[serde(default = "default_strict_threshold")]
    pub strict_threshold: f64,

    /// Largest flagged share tolerated before switching to `strict_threshold`.
    #[serde(default = "default_max_outlier_fraction")]
    pub max_outlier_fraction: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            contamination: default_contamination(),
            n_trees: default_n_trees(),
            max_samples: default_max_samples(),
            lof_neighbors: default_lof_neighbors(),
            threshold: default_threshold(),
            strict_threshold: default_strict_threshold(),
            max_outlier_fraction: default_max_outlier_fraction(),
        }
    }
}

impl OutlierConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.contamination > 0.0 && self.contamination <= 0.5,
            "outlier.contamination",
            "must be within (0.0, 0.5]",
        )?;
        ensure(self.n_trees >= 1, "outlier.n_trees", "must be at least 1")?;
        ensure(self.max_samples >= 2, "outlier.max_samples", "must be at least 2")?;
        ensure(self.lof_neighbors >= 1, "outlier.lof_neighbors", "must be at least 1")?;
        ensure(
            (0.0..=1.0).contains(&self.threshold),
            "outlier.threshold",
            "must be within 0.0..=1.0",
        )?;
        ensure(
            (self.threshold..=1.0).contains(&self.strict_threshold),
            "outlier.strict_threshold",
            "must be within threshold..=1.0",
        )?;
        ensure(
            self.max_outlier_fraction > 0.0 && self.max_outlier_fraction <= 1.0,
            "outlier.max_outlier_fraction",
            "must be within (0.0, 1.0]",
        )
    }
}
