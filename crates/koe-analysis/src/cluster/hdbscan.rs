//! HDBSCAN over a precomputed distance matrix.
//!
//! Pipeline:
//! 1. Core distance of every point: distance to its `min_samples`-th nearest
//!    neighbor, counting the point itself.
//! 2. Minimum spanning tree of the mutual reachability graph (dense Prim,
//!    `O(n^2)`).
//! 3. Single-linkage hierarchy from the sorted MST edges (union-find).
//! 4. Condensed tree: splits where a side is smaller than `min_cluster_size`
//!    become points falling out of the parent cluster.
//! 5. Excess-of-mass selection of the most stable clusters. The root is never
//!    selectable, so a single all-covering cluster is reported as noise.
//! 6. Each point takes the selected cluster on its fall-out cluster's
//!    ancestor path, or `-1`.

use rayon::prelude::*;

use crate::error::ClusterError;
use crate::linalg::DistanceMatrix;

/// Distances below this are treated as this value when converting to
/// `lambda = 1 / distance`, so duplicate points get a large finite lambda.
const MIN_DISTANCE: f64 = 1e-10;

#[derive(Debug, Clone, Copy)]
pub struct Hdbscan {
    min_cluster_size: usize,
    min_samples: usize,
}

impl Hdbscan {
    /// `min_samples` defaults to `min_cluster_size`.
    #[must_use]
    pub const fn new(min_cluster_size: usize) -> Self {
        Self {
            min_cluster_size,
            min_samples: min_cluster_size,
        }
    }

    #[must_use]
    pub const fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Cluster labels for every row of `dist`: `0..m` for the selected
    /// clusters, `-1` for noise.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::TooFewPoints`] when there are fewer points than
    /// `min_cluster_size` (or fewer than two), and [`ClusterError::NonFinite`]
    /// when any distance is NaN or infinite.
    pub fn fit(&self, dist: &DistanceMatrix) -> Result<Vec<i32>, ClusterError> {
        let n = dist.len();
        let min_cluster_size = self.min_cluster_size.max(2);
        if n < min_cluster_size {
            return Err(ClusterError::TooFewPoints {
                required: min_cluster_size,
                actual: n,
            });
        }
        if !dist.is_finite() {
            return Err(ClusterError::NonFinite);
        }

        // Step 1-3: density-aware hierarchy.
        let core = core_distances(dist, self.min_samples);
        let mst = minimum_spanning_tree(dist, &core);
        let merges = single_linkage(n, mst);

        // Step 4-6: condense, select, label.
        let tree = CondensedTree::build(&merges, n, min_cluster_size);
        let selected = tree.select_excess_of_mass();
        Ok(tree.labels(&selected))
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

fn core_distances(dist: &DistanceMatrix, min_samples: usize) -> Vec<f64> {
    let n = dist.len();
    // `min_samples` counts the point itself; index among the other n - 1.
    let index = min_samples.saturating_sub(2).min(n.saturating_sub(2));
    (0..n)
        .into_par_iter()
        .map(|i| {
            let mut others: Vec<f32> = dist
                .row(i)
                .iter()
                .enumerate()
                .filter_map(|(j, &d)| (j != i).then_some(d))
                .collect();
            if others.is_empty() {
                return 0.0;
            }
            let (_, kth, _) = others.select_nth_unstable_by(index, f32::total_cmp);
            f64::from(*kth)
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    a: usize,
    b: usize,
    weight: f64,
}

fn mutual_reachability(dist: &DistanceMatrix, core: &[f64], i: usize, j: usize) -> f64 {
    f64::from(dist.get(i, j)).max(core[i]).max(core[j])
}

fn minimum_spanning_tree(dist: &DistanceMatrix, core: &[f64]) -> Vec<Edge> {
    let n = dist.len();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut attach = vec![0_usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    in_tree[current] = true;
    for _ in 1..n {
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            let weight = mutual_reachability(dist, core, current, j);
            if weight < best[j] {
                best[j] = weight;
                attach[j] = current;
            }
        }
        let Some(next) = (0..n)
            .filter(|&j| !in_tree[j])
            .min_by(|&a, &b| best[a].total_cmp(&best[b]).then(a.cmp(&b)))
        else {
            break;
        };
        in_tree[next] = true;
        edges.push(Edge {
            a: attach[next],
            b: next,
            weight: best[next],
        });
        current = next;
    }
    edges
}

/// One merge of the single-linkage tree. Merge `m` creates node `n + m`;
/// nodes below `n` are points.
#[derive(Debug, Clone, Copy)]
struct Merge {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        let total = 2 * n - 1;
        Self {
            parent: (0..total).collect(),
            size: (0..total).map(|i| usize::from(i < n)).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }
}

fn single_linkage(n: usize, mut edges: Vec<Edge>) -> Vec<Merge> {
    edges.sort_by(|x, y| x.weight.total_cmp(&y.weight));
    let mut uf = UnionFind::new(n);
    let mut merges = Vec::with_capacity(edges.len());

    for edge in edges {
        let left = uf.find(edge.a);
        let right = uf.find(edge.b);
        let node = n + merges.len();
        let size = uf.size[left] + uf.size[right];
        uf.parent[left] = node;
        uf.parent[right] = node;
        uf.size[node] = size;
        merges.push(Merge {
            left,
            right,
            distance: edge.weight,
            size,
        });
    }
    merges
}

// ---------------------------------------------------------------------------
// Condensed tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Child {
    Point(usize),
    Cluster(usize),
}

#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: Child,
    lambda: f64,
    size: usize,
}

/// Condensed cluster tree. Cluster `0` is the root; every child cluster has
/// a larger id than its parent.
struct CondensedTree {
    edges: Vec<CondensedEdge>,
    n_points: usize,
    n_clusters: usize,
}

impl CondensedTree {
    fn build(merges: &[Merge], n: usize, min_cluster_size: usize) -> Self {
        let node_size = |node: usize| if node < n { 1 } else { merges[node - n].size };
        let leaves = |node: usize| -> Vec<usize> {
            let mut out = Vec::new();
            let mut stack = vec![node];
            while let Some(x) = stack.pop() {
                if x < n {
                    out.push(x);
                } else {
                    stack.push(merges[x - n].left);
                    stack.push(merges[x - n].right);
                }
            }
            out
        };

        let mut edges = Vec::new();
        let mut cluster_of = vec![0_usize; n + merges.len()];
        let mut n_clusters = 1;
        let mut stack = Vec::new();
        if let Some(root) = (n + merges.len()).checked_sub(1).filter(|&r| r >= n) {
            stack.push(root);
        }

        while let Some(node) = stack.pop() {
            let merge = merges[node - n];
            let parent = cluster_of[node];
            let lambda = 1.0 / merge.distance.max(MIN_DISTANCE);

            let fall_out = |child: usize, edges: &mut Vec<CondensedEdge>| {
                for p in leaves(child) {
                    edges.push(CondensedEdge {
                        parent,
                        child: Child::Point(p),
                        lambda,
                        size: 1,
                    });
                }
            };

            let big_left = node_size(merge.left) >= min_cluster_size;
            let big_right = node_size(merge.right) >= min_cluster_size;
            match (big_left, big_right) {
                (true, true) => {
                    for child in [merge.left, merge.right] {
                        cluster_of[child] = n_clusters;
                        edges.push(CondensedEdge {
                            parent,
                            child: Child::Cluster(n_clusters),
                            lambda,
                            size: node_size(child),
                        });
                        n_clusters += 1;
                        stack.push(child);
                    }
                }
                (false, false) => {
                    fall_out(merge.left, &mut edges);
                    fall_out(merge.right, &mut edges);
                }
                (true, false) => {
                    fall_out(merge.right, &mut edges);
                    cluster_of[merge.left] = parent;
                    stack.push(merge.left);
                }
                (false, true) => {
                    fall_out(merge.left, &mut edges);
                    cluster_of[merge.right] = parent;
                    stack.push(merge.right);
                }
            }
        }

        Self {
            edges,
            n_points: n,
            n_clusters,
        }
    }

    fn parents(&self) -> Vec<Option<usize>> {
        let mut parents = vec![None; self.n_clusters];
        for edge in &self.edges {
            if let Child::Cluster(c) = edge.child {
                parents[c] = Some(edge.parent);
            }
        }
        parents
    }

    fn stabilities(&self) -> Vec<f64> {
        let mut birth = vec![0.0_f64; self.n_clusters];
        for edge in &self.edges {
            if let Child::Cluster(c) = edge.child {
                birth[c] = edge.lambda;
            }
        }
        let mut stability = vec![0.0_f64; self.n_clusters];
        for edge in &self.edges {
            #[allow(clippy::cast_precision_loss)]
            let size = edge.size as f64;
            stability[edge.parent] += (edge.lambda - birth[edge.parent]) * size;
        }
        stability
    }

    /// Excess-of-mass selection: a cluster is kept when it is at least as
    /// stable as the best selection among its descendants.
    fn select_excess_of_mass(&self) -> Vec<bool> {
        let stability = self.stabilities();
        let mut children = vec![Vec::new(); self.n_clusters];
        for edge in &self.edges {
            if let Child::Cluster(c) = edge.child {
                children[edge.parent].push(c);
            }
        }

        let mut selected = vec![false; self.n_clusters];
        let mut subtree = vec![0.0_f64; self.n_clusters];
        for c in (1..self.n_clusters).rev() {
            let child_sum: f64 = children[c].iter().map(|&ch| subtree[ch]).sum();
            if children[c].is_empty() || stability[c] >= child_sum {
                selected[c] = true;
                subtree[c] = stability[c];
                let mut stack = children[c].clone();
                while let Some(d) = stack.pop() {
                    selected[d] = false;
                    stack.extend(&children[d]);
                }
            } else {
                subtree[c] = child_sum;
            }
        }
        selected
    }

    fn labels(&self, selected: &[bool]) -> Vec<i32> {
        let parents = self.parents();
        let mut label_of = vec![-1_i32; self.n_clusters];
        let mut next = 0;
        for (c, &is_selected) in selected.iter().enumerate() {
            if is_selected {
                label_of[c] = next;
                next += 1;
            }
        }

        let mut labels = vec![-1_i32; self.n_points];
        for edge in &self.edges {
            let Child::Point(p) = edge.child else {
                continue;
            };
            let mut cluster = Some(edge.parent);
            while let Some(c) = cluster {
                if selected[c] {
                    labels[p] = label_of[c];
                    break;
                }
                cluster = parents[c];
            }
        }
        labels
    }
}
