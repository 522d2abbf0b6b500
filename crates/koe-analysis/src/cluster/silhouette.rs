use std::collections::BTreeMap;

use crate::linalg::DistanceMatrix;

/// Mean silhouette coefficient of `labels` over precomputed distances.
///
/// Points in a cluster of one contribute `0`. Returns `-1.0` unless there are
/// between 2 and `n - 1` distinct labels.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn silhouette_score(dist: &DistanceMatrix, labels: &[i32]) -> f64 {
    let n = labels.len();
    let mut clusters: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        clusters.entry(label).or_default().push(i);
    }
    if clusters.len() < 2 || clusters.len() >= n {
        return -1.0;
    }

    let mean_distance = |i: usize, members: &[usize]| -> f64 {
        let others = members.iter().filter(|&&j| j != i);
        let count = others.clone().count();
        if count == 0 {
            return 0.0;
        }
        others.map(|&j| f64::from(dist.get(i, j))).sum::<f64>() / count as f64
    };

    let total: f64 = (0..n)
        .map(|i| {
            let own = labels[i];
            let Some(members) = clusters.get(&own) else {
                return 0.0;
            };
            if members.len() == 1 {
                return 0.0;
            }
            let a = mean_distance(i, members);
            let b = clusters
                .iter()
                .filter(|(label, _)| **label != own)
                .map(|(_, other)| mean_distance(i, other))
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 { (b - a) / denom } else { 0.0 }
        })
        .sum();

    total / n as f64
}
