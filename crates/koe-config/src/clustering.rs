//! Cluster engine settings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfigError, ensure};

/// First method the cluster engine tries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStrategy {
    /// HDBSCAN, falling back to k-means on a degenerate result.
    #[default]
    Density,
    /// k-means only.
    Partition,
}

impl ClusterStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Density => "density",
            Self::Partition => "partition",
        }
    }
}

impl fmt::Display for ClusterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn default_min_cluster_fraction() -> f64 {
    0.03
}

const fn default_min_cluster_floor() -> usize {
    3
}

const fn default_k_search() -> bool {
    true
}

const fn default_k_min() -> usize {
    3
}

const fn default_k_max() -> usize {
    20
}

const fn default_max_workers() -> usize {
    8
}

const fn default_low_silhouette() -> f64 {
    0.1
}

const fn default_n_init() -> usize {
    10
}

const fn default_max_iter() -> usize {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusteringConfig {
    #[serde(default)]
    pub strategy: ClusterStrategy,

    /// Density clustering minimum cluster size as a share of n.
    #[serde(default = "default_min_cluster_fraction")]
    pub min_cluster_fraction: f64,

    /// Lower bound of the density clustering minimum cluster size.
    #[serde(default = "default_min_cluster_floor")]
    pub min_cluster_floor: usize,

    /// Pick k by silhouette search instead of `clamp(n / 5, k_min, k_max)`.
    #[serde(default = "default_k_search")]
    pub k_search: bool,

    #[serde(default = "default_k_min")]
    pub k_min: usize,

    #[serde(default = "default_k_max")]
    pub k_max: usize,

    /// Worker threads for the silhouette search.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Best silhouette below this on a large sample triggers the conservative k.
    #[serde(default = "default_low_silhouette")]
    pub low_silhouette: f64,

    /// k-means restarts.
    #[serde(default = "default_n_init")]
    pub n_init: usize,

    /// Lloyd iterations per restart.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            strategy: ClusterStrategy::default(),
            min_cluster_fraction: default_min_cluster_fraction(),
            min_cluster_floor: default_min_cluster_floor(),
            k_search: default_k_search(),
            k_min: default_k_min(),
            k_max: default_k_max(),
            max_workers: default_max_workers(),
            low_silhouette: default_low_silhouette(),
            n_init: default_n_init(),
            max_iter: default_max_iter(),
        }
    }
}

impl ClusteringConfig {
    /// Density clustering minimum cluster size for `n` points.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn min_cluster_size(&self, n: usize) -> usize {
        let scaled = (n as f64 * self.min_cluster_fraction).round() as usize;
        scaled.max(self.min_cluster_floor)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            (0.0..=1.0).contains(&self.min_cluster_fraction),
            "clustering.min_cluster_fraction",
            "must be within 0.0..=1.0",
        )?;
        ensure(
            self.min_cluster_floor >= 2,
            "clustering.min_cluster_floor",
            "must be at least 2",
        )?;
        ensure(self.k_min >= 2, "clustering.k_min", "must be at least 2")?;
        ensure(
            self.k_min <= self.k_max,
            "clustering.k_max",
            "must not be smaller than k_min",
        )?;
        ensure(
            (1..=8).contains(&self.max_workers),
            "clustering.max_workers",
            "must be within 1..=8",
        )?;
        ensure(self.n_init >= 1, "clustering.n_init", "must be at least 1")?;
        ensure(self.max_iter >= 1, "clustering.max_iter", "must be at least 1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(10, 3)]
    #[case(100, 3)]
    #[case(200, 6)]
    #[case(1000, 30)]
    fn min_cluster_size_scales_with_floor(#[case] n: usize, #[case] expected: usize) {
        assert_eq!(ClusteringConfig::default().min_cluster_size(n), expected);
    }

    #[test]
    fn rejects_inverted_k_bounds() {
        let config = ClusteringConfig {
            k_min: 10,
            k_max: 4,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_too_many_workers() {
        let config = ClusteringConfig {
            max_workers: 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
