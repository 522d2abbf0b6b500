//! Topic clustering of inlier vectors.
//!
//! [`ClusterEngine::cluster`] tries density clustering first and falls back
//! to a k-means partition when density clustering errors or collapses to at
//! most one topic. The partition branch either searches k by silhouette on a
//! bounded rayon pool or derives k from `n`.

pub mod hdbscan;
pub mod kmeans;
pub mod silhouette;

use std::collections::BTreeMap;

use koe_config::{ClusterStrategy, ClusteringConfig};
use koe_core::enums::ClusterMethod;
use rayon::prelude::*;

use crate::linalg::DistanceMatrix;
pub use hdbscan::Hdbscan;
pub use kmeans::{KMeans, KMeansFit};
pub use silhouette::silhouette_score;

/// Below this many points everything is cluster 0.
pub const MIN_POINTS: usize = 3;

/// Labels for one clustering pass plus the branch that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOutcome {
    /// `0..m` topic ids, `-1` for density noise. Index-aligned with input.
    pub labels: Vec<i32>,
    pub method: ClusterMethod,
}

impl ClusterOutcome {
    /// Number of distinct non-noise ids.
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        count_clusters(&self.labels)
    }
}

#[derive(Debug, Clone)]
pub struct ClusterEngine {
    config: ClusteringConfig,
    seed: u64,
}

impl ClusterEngine {
    #[must_use]
    pub const fn new(config: ClusteringConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    /// Cluster `vectors`. Never fails: every failure path ends in a
    /// partition or the trivial all-zero assignment.
    #[must_use]
    pub fn cluster(&self, vectors: &[Vec<f32>]) -> ClusterOutcome {
        if vectors.len() < MIN_POINTS {
            return Self::trivial(vectors.len());
        }
        self.cluster_with(vectors, &DistanceMatrix::euclidean(vectors))
    }

    /// [`Self::cluster`] over a precomputed distance matrix of `vectors`.
    #[must_use]
    pub fn cluster_with(&self, vectors: &[Vec<f32>], dist: &DistanceMatrix) -> ClusterOutcome {
        let n = vectors.len();
        if n < MIN_POINTS {
            return Self::trivial(n);
        }

        if self.config.strategy == ClusterStrategy::Density {
            let min_cluster_size = self.config.min_cluster_size(n);
            match Hdbscan::new(min_cluster_size).fit(dist) {
                Ok(labels) if count_clusters(&labels) >= 2 => {
                    tracing::debug!(
                        n,
                        min_cluster_size,
                        clusters = count_clusters(&labels),
                        noise = labels.iter().filter(|&&l| l < 0).count(),
                        "density clustering accepted"
                    );
                    return ClusterOutcome {
                        labels: compact_labels(&labels),
                        method: ClusterMethod::Density,
                    };
                }
                Ok(labels) => {
                    tracing::debug!(
                        n,
                        min_cluster_size,
                        clusters = count_clusters(&labels),
                        "density clustering collapsed, using partition"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, "density clustering failed, using partition");
                }
            }
        }

        self.partition(vectors, dist)
    }

    fn trivial(n: usize) -> ClusterOutcome {
        ClusterOutcome {
            labels: vec![0; n],
            method: ClusterMethod::Trivial,
        }
    }

    fn partition(&self, vectors: &[Vec<f32>], dist: &DistanceMatrix) -> ClusterOutcome {
        let n = vectors.len();
        let k = if self.config.k_search {
            self.search_k(vectors, dist)
        } else {
            self.default_k(n)
        };
        let fit = self.kmeans(k).fit(vectors);
        let labels = compact_labels(&fit.labels);
        // Empty k-means clusters vanish in compaction.
        let found = count_clusters(&labels);
        if found < k {
            tracing::debug!(requested = k, found, "partition left empty clusters");
        }
        ClusterOutcome {
            labels,
            method: ClusterMethod::Partition { k: found },
        }
    }

    /// `n / 5` bounded by `[k_min, k_max]` and by `n - 1`, so at least two
    /// points share a topic.
    #[must_use]
    pub fn default_k(&self, n: usize) -> usize {
        (n / 5)
            .max(self.config.k_min)
            .min(self.config.k_max)
            .min(n.saturating_sub(1))
            .max(1)
    }

    /// Pick k in `2..=min(n - 1, k_max)` by silhouette, scoring candidates in
    /// parallel on a pool of at most `max_workers` threads. Ties prefer the
    /// smaller k. When the best score is below `low_silhouette` and `n > 10`,
    /// returns `max(2, n / 10)` instead.
    #[must_use]
    pub fn search_k(&self, vectors: &[Vec<f32>], dist: &DistanceMatrix) -> usize {
        let n = vectors.len();
        let upper = n.saturating_sub(1).min(self.config.k_max);
        if upper < 2 {
            return self.default_k(n);
        }
        let candidates: Vec<usize> = (2..=upper).collect();
        let score = |&k: &usize| (k, silhouette_score(dist, &self.kmeans(k).fit(vectors).labels));

        let scored: Vec<(usize, f64)> = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_workers.max(1))
            .build()
        {
            Ok(pool) => pool.install(|| candidates.par_iter().map(score).collect()),
            Err(e) => {
                tracing::warn!(error = %e, "k search pool unavailable, scoring sequentially");
                candidates.iter().map(score).collect()
            }
        };

        let (best_k, best_score) = scored
            .into_iter()
            .fold((2, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
        tracing::debug!(n, best_k, best_score, "k search finished");

        if best_score < self.config.low_silhouette && n > 10 {
            return (n / 10).max(2);
        }
        best_k
    }

    fn kmeans(&self, k: usize) -> KMeans {
        KMeans::new(k, self.seed)
            .with_n_init(self.config.n_init)
            .with_max_iter(self.config.max_iter)
    }
}

fn count_clusters(labels: &[i32]) -> usize {
    let mut ids: Vec<i32> = labels.iter().copied().filter(|&l| l >= 0).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}

/// Renumber non-negative labels to `0..m` in ascending order of the original
/// id, keeping `-1`.
#[must_use]
pub fn compact_labels(labels: &[i32]) -> Vec<i32> {
    let mut mapping: BTreeMap<i32, i32> = BTreeMap::new();
    for &l in labels.iter().filter(|&&l| l >= 0) {
        mapping.insert(l, 0);
    }
    for (next, value) in (0_i32..).zip(mapping.values_mut()) {
        *value = next;
    }
    labels
        .iter()
        .map(|l| mapping.get(l).copied().unwrap_or(-1))
        .collect()
}
