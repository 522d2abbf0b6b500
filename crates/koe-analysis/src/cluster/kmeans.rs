//! Seeded k-means (Lloyd iterations, k-means++ initialization).

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::linalg::squared_euclidean;

/// Result of one k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub labels: Vec<i32>,
    pub centroids: Vec<Vec<f32>>,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    k: usize,
    n_init: usize,
    max_iter: usize,
    seed: u64,
}

impl KMeans {
    #[must_use]
    pub const fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            n_init: 10,
            max_iter: 300,
            seed,
        }
    }

    #[must_use]
    pub const fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    #[must_use]
    pub const fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Fit `n_init` seeded restarts and keep the lowest inertia (earliest run
    /// on ties). `k` is clamped to `1..=n`.
    #[must_use]
    pub fn fit(&self, vectors: &[Vec<f32>]) -> KMeansFit {
        let n = vectors.len();
        if n == 0 {
            return KMeansFit {
                labels: Vec::new(),
                centroids: Vec::new(),
                inertia: 0.0,
            };
        }
        let k = self.k.max(1).min(n);

        let mut best: Option<KMeansFit> = None;
        for run in 0..self.n_init.max(1) {
            let mut rng =
                ChaCha8Rng::seed_from_u64(self.seed.wrapping_add((run as u64) << 32));
            let fit = self.run_once(vectors, k, &mut rng);
            if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }
        best.unwrap_or_else(|| KMeansFit {
            labels: vec![0; n],
            centroids: Vec::new(),
            inertia: 0.0,
        })
    }

    fn run_once(&self, vectors: &[Vec<f32>], k: usize, rng: &mut ChaCha8Rng) -> KMeansFit {
        let n = vectors.len();
        let dim = vectors[0].len();
        let mut centroids = plus_plus_init(vectors, k, rng);
        let mut labels: Vec<usize> = Vec::new();

        for _ in 0..self.max_iter.max(1) {
            let (assigned, mut distances) = assign(vectors, &centroids);
            if assigned == labels {
                break;
            }
            labels = assigned;

            let mut sums = vec![vec![0.0_f64; dim]; k];
            let mut counts = vec![0_usize; k];
            for (i, &c) in labels.iter().enumerate() {
                counts[c] += 1;
                for (s, &v) in sums[c].iter_mut().zip(&vectors[i]) {
                    *s += f64::from(v);
                }
            }

            for c in 0..k {
                if counts[c] == 0 {
                    // Empty cluster: restart it on the point worst served by
                    // its current centroid.
                    let far = (0..n)
                        .max_by(|&a, &b| distances[a].total_cmp(&distances[b]).then(b.cmp(&a)))
                        .unwrap_or(0);
                    centroids[c] = vectors[far].clone();
                    distances[far] = 0.0;
                    continue;
                }
                centroids[c] = mean(&sums[c], counts[c]);
            }
        }

        let (labels, distances) = assign(vectors, &centroids);
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let labels = labels.into_iter().map(|c| c as i32).collect();
        KMeansFit {
            labels,
            centroids,
            inertia: distances.iter().sum(),
        }
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn mean(sum: &[f64], count: usize) -> Vec<f32> {
    let count = count as f64;
    sum.iter().map(|s| (s / count) as f32).collect()
}

/// Nearest centroid of every point (lowest index on ties) and the squared
/// distance to it.
fn assign(vectors: &[Vec<f32>], centroids: &[Vec<f32>]) -> (Vec<usize>, Vec<f64>) {
    vectors
        .iter()
        .map(|v| {
            centroids
                .iter()
                .enumerate()
                .map(|(c, centroid)| (c, f64::from(squared_euclidean(v, centroid))))
                .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
        })
        .unzip()
}

/// k-means++ seeding: each next centroid is drawn with probability
/// proportional to its squared distance from the nearest chosen one.
fn plus_plus_init(vectors: &[Vec<f32>], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f32>> {
    let n = vectors.len();
    let first = rng.gen_range(0..n);
    let mut centroids = vec![vectors[first].clone()];
    let mut nearest: Vec<f64> = vectors
        .iter()
        .map(|v| f64::from(squared_euclidean(v, &centroids[0])))
        .collect();

    while centroids.len() < k {
        let total: f64 = nearest.iter().sum();
        let next = if total > 0.0 {
            let target = rng.gen_range(0.0..total);
            let mut acc = 0.0;
            nearest
                .iter()
                .position(|&d| {
                    acc += d;
                    acc > target
                })
                .unwrap_or(n - 1)
        } else {
            rng.gen_range(0..n)
        };

        let chosen = vectors[next].clone();
        for (d, v) in nearest.iter_mut().zip(vectors) {
            *d = d.min(f64::from(squared_euclidean(v, &chosen)));
        }
        centroids.push(chosen);
    }
    centroids
}
