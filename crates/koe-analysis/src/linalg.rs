//! Small dense vector helpers shared by the outlier, clustering, and
//! projection stages.

use rayon::prelude::*;

#[must_use]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[must_use]
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    squared_euclidean(a, b).sqrt()
}

/// Mean of the rows selected by `members`. Empty `members` gives a zero
/// vector of `dim` entries.
#[must_use]
pub fn centroid(vectors: &[Vec<f32>], members: &[usize], dim: usize) -> Vec<f32> {
    let mut sum = vec![0.0_f32; dim];
    for &i in members {
        for (s, v) in sum.iter_mut().zip(&vectors[i]) {
            *s += v;
        }
    }
    if !members.is_empty() {
        #[allow(clippy::cast_precision_loss)]
        let count = members.len() as f32;
        for s in &mut sum {
            *s /= count;
        }
    }
    sum
}

/// Percentile with linear interpolation between closest ranks, `q` in
/// `[0, 1]`. Returns `0.0` for an empty slice.
#[must_use]
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    #[allow(clippy::cast_precision_loss)]
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    #[allow(clippy::cast_precision_loss)]
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Dense symmetric matrix of pairwise Euclidean distances.
///
/// Rows are computed in parallel. Memory is `n * n` floats, which is fine for
/// survey-sized inputs (a few thousand texts).
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f32>,
}

impl DistanceMatrix {
    #[must_use]
    pub fn euclidean(vectors: &[Vec<f32>]) -> Self {
        let n = vectors.len();
        let rows: Vec<Vec<f32>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            0.0
                        } else {
                            euclidean(&vectors[i], &vectors[j])
                        }
                    })
                    .collect()
            })
            .collect();
        Self {
            n,
            data: rows.concat(),
        }
    }

    /// The distances among `indices`, in that order.
    #[must_use]
    pub fn subset(&self, indices: &[usize]) -> Self {
        let data = indices
            .iter()
            .flat_map(|&i| indices.iter().map(move |&j| self.get(i, j)))
            .collect();
        Self {
            n: indices.len(),
            data,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.n
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.data[i * self.n + j]
    }

    #[must_use]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|d| d.is_finite())
    }

    /// The `k` nearest other points of `i`, closest first. Ties break on the
    /// lower index.
    #[must_use]
    pub fn nearest(&self, i: usize, k: usize) -> Vec<(usize, f32)> {
        let mut others: Vec<(usize, f32)> = self
            .row(i)
            .iter()
            .copied()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .collect();
        others.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        others.truncate(k);
        others
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn distances_are_symmetric() {
        let vectors = vec![vec![0.0, 0.0], vec![3.0, 4.0], vec![0.0, 1.0]];
        let dist = DistanceMatrix::euclidean(&vectors);
        assert_eq!(dist.len(), 3);
        assert!((dist.get(0, 1) - 5.0).abs() < 1e-6);
        assert_eq!(dist.get(0, 1), dist.get(1, 0));
        assert_eq!(dist.get(2, 2), 0.0);
        assert!(dist.is_finite());
    }

    #[test]
    fn nearest_excludes_self_and_sorts() {
        let vectors = vec![vec![0.0], vec![5.0], vec![1.0], vec![2.0]];
        let dist = DistanceMatrix::euclidean(&vectors);
        let near: Vec<usize> = dist.nearest(0, 2).into_iter().map(|(j, _)| j).collect();
        assert_eq!(near, vec![2, 3]);
    }

    #[test]
    fn subset_matches_a_fresh_matrix() {
        let vectors = vec![vec![0.0], vec![5.0], vec![1.0], vec![2.0]];
        let picked = [3, 0, 1];
        let kept: Vec<Vec<f32>> = picked.iter().map(|&i| vectors[i].clone()).collect();
        assert_eq!(
            DistanceMatrix::euclidean(&vectors).subset(&picked),
            DistanceMatrix::euclidean(&kept)
        );
        assert!(DistanceMatrix::euclidean(&vectors).subset(&[]).is_empty());
    }

    #[test]
    fn centroid_of_members() {
        let vectors = vec![vec![0.0, 2.0], vec![2.0, 4.0], vec![100.0, 100.0]];
        assert_eq!(centroid(&vectors, &[0, 1], 2), vec![1.0, 3.0]);
        assert_eq!(centroid(&vectors, &[], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((percentile(&values, 0.5) - 3.0).abs() < 1e-12);
        assert!((percentile(&values, 0.9) - 4.6).abs() < 1e-12);
        assert!((percentile(&values, 1.0) - 5.0).abs() < 1e-12);
        assert_eq!(percentile(&[], 0.5), 0.0);
    }
}
