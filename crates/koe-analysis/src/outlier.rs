//! Outlier ("small voice") detection.
//!
//! Two detectors vote on every point: an isolation forest over random
//! axis-aligned splits and the local outlier factor over the k nearest
//! neighbors. Each detector flags the points strictly above its own
//! `1 - contamination` percentile. The combined score is the fraction of
//! detectors that flagged the point, so it is one of `0.0`, `0.5`, `1.0`.
//!
//! [`split_outliers`] then turns scores into the final outlier mask, with a
//! stricter threshold when too many points qualify and a forced floor of
//! inliers so clustering always has something to work on.

use koe_config::OutlierConfig;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::linalg::{DistanceMatrix, percentile};

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Below this many points every score is zero.
pub const MIN_POINTS: usize = 3;

/// Random feature draws before scanning for a splittable one.
const FEATURE_TRIES: usize = 16;

const LRD_EPSILON: f64 = 1e-10;

// ---------------------------------------------------------------------------
// Combined score
// ---------------------------------------------------------------------------

/// Score every vector in `[0, 1]`, higher meaning more anomalous.
///
/// Deterministic for a given `seed`.
#[must_use]
pub fn score_outliers(vectors: &[Vec<f32>], config: &OutlierConfig, seed: u64) -> Vec<f32> {
    if vectors.len() < MIN_POINTS {
        return vec![0.0; vectors.len()];
    }
    score_outliers_with(vectors, &DistanceMatrix::euclidean(vectors), config, seed)
}

/// [`score_outliers`] over a precomputed distance matrix of `vectors`.
#[must_use]
pub fn score_outliers_with(
    vectors: &[Vec<f32>],
    dist: &DistanceMatrix,
    config: &OutlierConfig,
    seed: u64,
) -> Vec<f32> {
    let n = vectors.len();
    if n < MIN_POINTS {
        return vec![0.0; n];
    }

    let forest = IsolationForest::fit(vectors, config.n_trees, config.max_samples, seed);
    let iso: Vec<f64> = vectors.par_iter().map(|v| forest.score(v)).collect();

    let lof = local_outlier_factors(dist, config.lof_neighbors);

    let iso_flags = flag_above_percentile(&iso, config.contamination);
    let lof_flags = flag_above_percentile(&lof, config.contamination);

    tracing::debug!(
        n,
        isolation = iso_flags.iter().filter(|&&f| f).count(),
        lof = lof_flags.iter().filter(|&&f| f).count(),
        "outlier detectors voted"
    );

    iso_flags
        .iter()
        .zip(&lof_flags)
        .map(|(&a, &b)| (f32::from(u8::from(a)) + f32::from(u8::from(b))) / 2.0)
        .collect()
}

fn flag_above_percentile(scores: &[f64], contamination: f64) -> Vec<bool> {
    let cutoff = percentile(scores, 1.0 - contamination);
    scores.iter().map(|&s| s > cutoff).collect()
}

// ---------------------------------------------------------------------------
// Split policy
// ---------------------------------------------------------------------------

/// Final outlier mask for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierSplit {
    /// `true` for small-voice points, index-aligned with the input.
    pub flagged: Vec<bool>,
    /// Score a point had to exceed to be flagged.
    pub threshold: f64,
    /// Whether the inlier floor overrode the thresholds.
    pub forced: bool,
}

impl OutlierSplit {
    #[must_use]
    pub fn outlier_count(&self) -> usize {
        self.flagged.iter().filter(|&&f| f).count()
    }

    #[must_use]
    pub fn inlier_indices(&self) -> Vec<usize> {
        self.flagged
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| (!f).then_some(i))
            .collect()
    }
}

/// Decide which scored points are outliers.
///
/// 1. Flag scores strictly above `threshold`.
/// 2. If more than `max_outlier_fraction` of points are flagged, retry with
///    `strict_threshold`.
/// 3. If that still flags everything or leaves fewer than two inliers, the
///    lowest-scoring half (at least two points) is kept as inliers and only
///    points scoring strictly above the highest kept score stay flagged.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn split_outliers(scores: &[f32], config: &OutlierConfig) -> OutlierSplit {
    let n = scores.len();
    let over = |t: f64| -> Vec<bool> { scores.iter().map(|&s| f64::from(s) > t).collect() };
    let count = |flags: &[bool]| flags.iter().filter(|&&f| f).count();

    let mut threshold = config.threshold;
    let mut flagged = over(threshold);

    if count(&flagged) as f64 > config.max_outlier_fraction * n as f64 {
        threshold = config.strict_threshold;
        flagged = over(threshold);
    }

    let outliers = count(&flagged);
    if outliers == 0 || n - outliers >= 2 {
        return OutlierSplit {
            flagged,
            threshold,
            forced: false,
        };
    }

    let keep = (n / 2).max(2).min(n);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    let cutoff = f64::from(scores[order[keep - 1]]);

    let mut flagged = vec![false; n];
    for &i in &order[keep..] {
        flagged[i] = f64::from(scores[i]) > cutoff;
    }
    tracing::debug!(n, keep, cutoff, "outlier split forced an inlier floor");

    OutlierSplit {
        flagged,
        threshold: cutoff,
        forced: true,
    }
}

// ---------------------------------------------------------------------------
// Isolation forest
// ---------------------------------------------------------------------------

/// Expected path length of an unsuccessful search in a binary tree of `n`
/// points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            #[allow(clippy::cast_precision_loss)]
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn build(vectors: &[Vec<f32>], sample: Vec<usize>, depth_limit: usize, rng: &mut ChaCha8Rng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(vectors, sample, 0, depth_limit, rng);
        tree
    }

    fn grow(
        &mut self,
        vectors: &[Vec<f32>],
        members: Vec<usize>,
        depth: usize,
        depth_limit: usize,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            size: members.len(),
        });
        if depth >= depth_limit || members.len() <= 1 {
            return id;
        }
        let Some((feature, lo, hi)) = pick_feature(vectors, &members, rng) else {
            return id;
        };

        // lo < hi, so both sides are non-empty.
        let threshold = rng.gen_range(lo..hi);
        let (left_members, right_members): (Vec<usize>, Vec<usize>) = members
            .into_iter()
            .partition(|&i| vectors[i][feature] <= threshold);

        let left = self.grow(vectors, left_members, depth + 1, depth_limit, rng);
        let right = self.grow(vectors, right_members, depth + 1, depth_limit, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    #[allow(clippy::cast_precision_loss)]
    fn path_length(&self, x: &[f32]) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[node] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
                Node::Leaf { size } => return depth + average_path_length(*size),
            }
        }
    }
}

fn feature_range(vectors: &[Vec<f32>], members: &[usize], feature: usize) -> (f32, f32) {
    members.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &i| {
        let v = vectors[i][feature];
        (lo.min(v), hi.max(v))
    })
}

/// A feature with spread among `members`, plus its range. Tries random
/// features first, then scans from a random offset.
fn pick_feature(
    vectors: &[Vec<f32>],
    members: &[usize],
    rng: &mut ChaCha8Rng,
) -> Option<(usize, f32, f32)> {
    let dim = vectors[members[0]].len();
    if dim == 0 {
        return None;
    }
    for _ in 0..FEATURE_TRIES {
        let feature = rng.gen_range(0..dim);
        let (lo, hi) = feature_range(vectors, members, feature);
        if hi > lo {
            return Some((feature, lo, hi));
        }
    }
    let start = rng.gen_range(0..dim);
    (0..dim).map(|o| (start + o) % dim).find_map(|feature| {
        let (lo, hi) = feature_range(vectors, members, feature);
        (hi > lo).then_some((feature, lo, hi))
    })
}

#[derive(Debug, Clone)]
struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    fn fit(vectors: &[Vec<f32>], n_trees: usize, max_samples: usize, seed: u64) -> Self {
        let n = vectors.len();
        let sample_size = max_samples.max(2).min(n);
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let depth_limit = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..n_trees.max(1))
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(t as u64));
                let sample = index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::build(vectors, sample, depth_limit, &mut rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    /// Anomaly score in `(0, 1]`; values near 1 are easy to isolate.
    #[allow(clippy::cast_precision_loss)]
    fn score(&self, x: &[f32]) -> f64 {
        let mean_path =
            self.trees.iter().map(|t| t.path_length(x)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            return 0.5;
        }
        2.0_f64.powf(-mean_path / norm)
    }
}

// ---------------------------------------------------------------------------
// Local outlier factor
// ---------------------------------------------------------------------------

/// LOF of every point over `k` neighbors (clamped to `n - 1`). Values well
/// above 1 mark points in sparser regions than their neighbors.
#[allow(clippy::cast_precision_loss)]
fn local_outlier_factors(dist: &DistanceMatrix, k: usize) -> Vec<f64> {
    let n = dist.len();
    let k = k.min(n.saturating_sub(1)).max(1);

    let neighbors: Vec<Vec<(usize, f32)>> =
        (0..n).into_par_iter().map(|i| dist.nearest(i, k)).collect();
    let k_distance: Vec<f64> = neighbors
        .iter()
        .map(|nb| nb.last().map_or(0.0, |&(_, d)| f64::from(d)))
        .collect();

    let lrd: Vec<f64> = neighbors
        .iter()
        .map(|nb| {
            let reach = nb
                .iter()
                .map(|&(j, d)| k_distance[j].max(f64::from(d)))
                .sum::<f64>()
                / nb.len() as f64;
            1.0 / (reach + LRD_EPSILON)
        })
        .collect();

    neighbors
        .iter()
        .enumerate()
        .map(|(i, nb)| {
            let mean = nb.iter().map(|&(j, _)| lrd[j]).sum::<f64>() / nb.len() as f64;
            mean / lrd[i]
        })
        .collect()
}
