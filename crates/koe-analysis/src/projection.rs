//! 2D layout of embedding vectors for visualization.
//!
//! The primary path is a compact UMAP-style layout: fuzzy k-nearest-neighbor
//! graph, PCA initialization, and stochastic gradient descent with negative
//! sampling. It needs at least four points and must produce finite
//! coordinates. Otherwise the projector uses plain PCA. A small seeded jitter
//! is added last so duplicate texts do not overlap exactly.

use std::collections::BTreeMap;

use koe_config::ProjectionConfig;
use koe_core::entities::ProjectedPoint;
use koe_core::quality::Graded;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::ProjectionError;
use crate::linalg::DistanceMatrix;

/// Smallest input the neighbor-graph layout accepts.
pub const MIN_LAYOUT_POINTS: usize = 4;

/// Curve parameters for `min_dist = 0.1`, `spread = 1.0`.
const CURVE_A: f64 = 1.577;
const CURVE_B: f64 = 0.895;

const GRADIENT_CLIP: f64 = 4.0;
const INIT_SCALE: f64 = 10.0;
const SIGMA_STEPS: usize = 64;
const POWER_STEPS: usize = 200;

#[derive(Debug, Clone)]
pub struct Projector {
    config: ProjectionConfig,
    seed: u64,
}

impl Projector {
    #[must_use]
    pub const fn new(config: ProjectionConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    /// One point per vector, in input order.
    ///
    /// Degraded only when the layout ran and failed; inputs too small for the
    /// layout go straight to PCA.
    #[must_use]
    pub fn project(&self, vectors: &[Vec<f32>]) -> Graded<Vec<ProjectedPoint>> {
        if vectors.len() < MIN_LAYOUT_POINTS {
            return self.project_with(vectors, &DistanceMatrix::euclidean(&[]));
        }
        self.project_with(vectors, &DistanceMatrix::euclidean(vectors))
    }

    /// [`Self::project`] over a precomputed distance matrix of `vectors`.
    #[must_use]
    pub fn project_with(
        &self,
        vectors: &[Vec<f32>],
        dist: &DistanceMatrix,
    ) -> Graded<Vec<ProjectedPoint>> {
        let n = vectors.len();
        if n == 0 {
            return Graded::healthy(Vec::new());
        }
        if n < 2 {
            return Graded::healthy(self.jitter(vec![[0.0, 0.0]; n]));
        }

        match self.layout_with(vectors, dist) {
            Ok(coords) => Graded::healthy(self.jitter(coords)),
            Err(e @ ProjectionError::TooFewPoints { .. }) => {
                tracing::debug!(n, reason = %e, "using PCA projection");
                Graded::healthy(self.jitter(self.pca(vectors)))
            }
            Err(e) => {
                tracing::warn!(n, error = %e, "layout failed, using PCA projection");
                Graded::degraded(self.jitter(self.pca(vectors)), e.to_string())
            }
        }
    }

    fn pca(&self, vectors: &[Vec<f32>]) -> Vec<[f64; 2]> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        pca_2d(vectors, &mut rng)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn jitter(&self, coords: Vec<[f64; 2]>) -> Vec<ProjectedPoint> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(1));
        let j = self.config.jitter.abs();
        coords
            .into_iter()
            .map(|[x, y]| {
                ProjectedPoint::new(
                    x as f32 + rng.gen_range(-j..=j),
                    y as f32 + rng.gen_range(-j..=j),
                )
            })
            .collect()
    }

    /// Neighbor-graph layout.
    ///
    /// # Errors
    ///
    /// [`ProjectionError::TooFewPoints`] below [`MIN_LAYOUT_POINTS`],
    /// [`ProjectionError::NonFinite`] if the optimization diverged.
    pub fn layout(&self, vectors: &[Vec<f32>]) -> Result<Vec<[f64; 2]>, ProjectionError> {
        if vectors.len() < MIN_LAYOUT_POINTS {
            return self.layout_with(vectors, &DistanceMatrix::euclidean(&[]));
        }
        self.layout_with(vectors, &DistanceMatrix::euclidean(vectors))
    }

    fn layout_with(
        &self,
        vectors: &[Vec<f32>],
        dist: &DistanceMatrix,
    ) -> Result<Vec<[f64; 2]>, ProjectionError> {
        let n = vectors.len();
        if n < MIN_LAYOUT_POINTS {
            return Err(ProjectionError::TooFewPoints {
                required: MIN_LAYOUT_POINTS,
                actual: n,
            });
        }

        let k = self.config.n_neighbors.min(n - 1).max(1);
        let graph = fuzzy_graph(dist, k);

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut coords = pca_2d(vectors, &mut rng);
        if coords.iter().all(|&[x, y]| x == 0.0 && y == 0.0) {
            for c in &mut coords {
                *c = [
                    rng.gen_range(-INIT_SCALE..INIT_SCALE),
                    rng.gen_range(-INIT_SCALE..INIT_SCALE),
                ];
            }
        } else {
            scale_to(&mut coords, INIT_SCALE);
        }

        optimize(
            &mut coords,
            &graph,
            self.config.epochs.max(1),
            self.config.negative_samples,
            &mut rng,
        );

        if coords.iter().flatten().all(|v| v.is_finite()) {
            Ok(coords)
        } else {
            Err(ProjectionError::NonFinite)
        }
    }
}

// ---------------------------------------------------------------------------
// Fuzzy neighbor graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct GraphEdge {
    a: usize,
    b: usize,
    weight: f64,
}

/// Symmetrized fuzzy k-NN graph: `w = w_ab + w_ba - w_ab * w_ba`.
///
/// Only kNN pairs are stored, so memory is `O(n * k)`. Edges come out ordered
/// by `(a, b)` with `a < b`.
fn fuzzy_graph(dist: &DistanceMatrix, k: usize) -> Vec<GraphEdge> {
    #[allow(clippy::cast_precision_loss)]
    let target = (k as f64).log2();
    // (low, high) -> (weight low->high, weight high->low)
    let mut pairs: BTreeMap<(usize, usize), (f64, f64)> = BTreeMap::new();

    for i in 0..dist.len() {
        let neighbors: Vec<(usize, f64)> = dist
            .nearest(i, k)
            .into_iter()
            .map(|(j, d)| (j, f64::from(d)))
            .collect();
        let rho = neighbors
            .iter()
            .map(|&(_, d)| d)
            .find(|&d| d > 0.0)
            .unwrap_or(0.0);
        let sigma = smooth_sigma(&neighbors, rho, target);
        for &(j, d) in &neighbors {
            let w = (-((d - rho).max(0.0)) / sigma).exp();
            let entry = pairs.entry((i.min(j), i.max(j))).or_default();
            if i < j {
                entry.0 = w;
            } else {
                entry.1 = w;
            }
        }
    }

    pairs
        .into_iter()
        .map(|((a, b), (wab, wba))| GraphEdge {
            a,
            b,
            weight: wab + wba - wab * wba,
        })
        .filter(|e| e.weight > 0.0)
        .collect()
}

/// Binary search for the bandwidth whose membership sum equals `target`.
fn smooth_sigma(neighbors: &[(usize, f64)], rho: f64, target: f64) -> f64 {
    let (mut lo, mut hi, mut mid) = (0.0_f64, f64::INFINITY, 1.0_f64);
    for _ in 0..SIGMA_STEPS {
        let sum: f64 = neighbors
            .iter()
            .map(|&(_, d)| (-((d - rho).max(0.0)) / mid).exp())
            .sum();
        if (sum - target).abs() < 1e-5 {
            break;
        }
        if sum > target {
            hi = mid;
            mid = f64::midpoint(lo, hi);
        } else {
            lo = mid;
            mid = if hi.is_infinite() { mid * 2.0 } else { f64::midpoint(lo, hi) };
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = neighbors.iter().map(|&(_, d)| d).sum::<f64>() / neighbors.len().max(1) as f64;
    mid.max(1e-3 * mean).max(1e-12)
}

// ---------------------------------------------------------------------------
// Optimization
// ---------------------------------------------------------------------------

fn clip(v: f64) -> f64 {
    v.clamp(-GRADIENT_CLIP, GRADIENT_CLIP)
}

#[allow(clippy::cast_precision_loss)]
fn optimize(
    coords: &mut [[f64; 2]],
    graph: &[GraphEdge],
    epochs: usize,
    negative_samples: usize,
    rng: &mut ChaCha8Rng,
) {
    let n = coords.len();
    let max_weight = graph.iter().map(|e| e.weight).fold(0.0_f64, f64::max);
    if max_weight <= 0.0 {
        return;
    }

    // Edges are sampled proportionally to weight; too-weak edges never fire.
    let period: Vec<f64> = graph
        .iter()
        .map(|e| {
            let samples = epochs as f64 * e.weight / max_weight;
            if samples >= 1.0 { epochs as f64 / samples } else { f64::INFINITY }
        })
        .collect();
    let mut next_due = period.clone();

    for epoch in 0..epochs {
        let alpha = 1.0 - epoch as f64 / epochs as f64;
        let now = epoch as f64;

        for (e, edge) in graph.iter().enumerate() {
            if next_due[e] > now + 1.0 {
                continue;
            }
            next_due[e] += period[e];

            let (a, b) = (edge.a, edge.b);
            let d2 = squared(coords[a], coords[b]);
            if d2 > 0.0 {
                let coeff = -2.0 * CURVE_A * CURVE_B * d2.powf(CURVE_B - 1.0)
                    / (CURVE_A * d2.powf(CURVE_B) + 1.0);
                for dim in 0..2 {
                    let grad = clip(coeff * (coords[a][dim] - coords[b][dim])) * alpha;
                    coords[a][dim] += grad;
                    coords[b][dim] -= grad;
                }
            }

            for _ in 0..negative_samples {
                let other = rng.gen_range(0..n);
                if other == a {
                    continue;
                }
                let d2 = squared(coords[a], coords[other]);
                let coeff =
                    2.0 * CURVE_B / ((0.001 + d2) * (CURVE_A * d2.powf(CURVE_B) + 1.0));
                for dim in 0..2 {
                    let grad = if coeff > 0.0 {
                        clip(coeff * (coords[a][dim] - coords[other][dim]))
                    } else {
                        GRADIENT_CLIP
                    };
                    coords[a][dim] += grad * alpha;
                }
            }
        }
    }
}

fn squared(p: [f64; 2], q: [f64; 2]) -> f64 {
    (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2)
}

fn scale_to(coords: &mut [[f64; 2]], bound: f64) {
    let max_abs = coords
        .iter()
        .flatten()
        .fold(0.0_f64, |m, v| m.max(v.abs()));
    if max_abs > 0.0 {
        for v in coords.iter_mut().flatten() {
            *v *= bound / max_abs;
        }
    }
}

// ---------------------------------------------------------------------------
// PCA
// ---------------------------------------------------------------------------

/// First two principal component scores by power iteration with deflation.
/// Missing components (rank < 2) are zero. Signs are fixed so the largest
/// absolute score of each component is positive.
fn pca_2d(vectors: &[Vec<f32>], rng: &mut ChaCha8Rng) -> Vec<[f64; 2]> {
    let n = vectors.len();
    let dim = vectors.first().map_or(0, Vec::len);
    let mut out = vec![[0.0_f64; 2]; n];
    if n < 2 || dim == 0 {
        return out;
    }

    #[allow(clippy::cast_precision_loss)]
    let mean: Vec<f64> = (0..dim)
        .map(|d| vectors.iter().map(|v| f64::from(v[d])).sum::<f64>() / n as f64)
        .collect();
    let mut centered: Vec<Vec<f64>> = vectors
        .iter()
        .map(|v| v.iter().zip(&mean).map(|(&x, m)| f64::from(x) - m).collect())
        .collect();

    for component in 0..2 {
        let Some(axis) = principal_axis(&centered, dim, rng) else {
            break;
        };
        let scores: Vec<f64> = centered.iter().map(|row| dot(row, &axis)).collect();
        for (row, score) in centered.iter_mut().zip(&scores) {
            for (x, a) in row.iter_mut().zip(&axis) {
                *x -= score * a;
            }
        }

        let pivot = scores
            .iter()
            .copied()
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap_or(0.0);
        let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
        for (o, s) in out.iter_mut().zip(scores) {
            o[component] = sign * s;
        }
    }
    out
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Dominant right singular vector of `rows`, or `None` when the residual is
/// zero.
fn principal_axis(rows: &[Vec<f64>], dim: usize, rng: &mut ChaCha8Rng) -> Option<Vec<f64>> {
    let mut v: Vec<f64> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let norm = dot(&v, &v).sqrt();
    if norm == 0.0 {
        return None;
    }
    v.iter_mut().for_each(|x| *x /= norm);

    for _ in 0..POWER_STEPS {
        let projected: Vec<f64> = rows.iter().map(|row| dot(row, &v)).collect();
        let mut next = vec![0.0_f64; dim];
        for (row, p) in rows.iter().zip(&projected) {
            for (nx, x) in next.iter_mut().zip(row) {
                *nx += x * p;
            }
        }
        let norm = dot(&next, &next).sqrt();
        if norm < 1e-12 {
            return None;
        }
        next.iter_mut().for_each(|x| *x /= norm);
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        if delta < 1e-10 {
            break;
        }
    }
    Some(v)
}
