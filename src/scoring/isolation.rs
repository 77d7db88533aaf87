//! Isolation forest
//!
//! Random axis-aligned splits isolate outliers in fewer steps than inliers, so
//! the average path length from root to leaf is a density-free outlier measure.
//! Scores follow the "higher is more normal" convention: `-2^(-E[h(x)] / c(ψ))`,
//! which lies in `[-1, 0)`.

use rand::{Rng, SeedableRng, rngs::StdRng, seq::index::sample};

use crate::features::FEATURE_COUNT;

use super::OutlierModel;

pub const DEFAULT_TREES: usize = 100;
pub const DEFAULT_MAX_SAMPLES: usize = 256;
pub const DEFAULT_SEED: u64 = 42;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

type Row = [f64; FEATURE_COUNT];

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: usize,
    max_samples: usize,
    seed: u64,
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(DEFAULT_TREES, DEFAULT_MAX_SAMPLES, DEFAULT_SEED)
    }
}

impl IsolationForest {
    pub fn new(trees: usize, max_samples: usize, seed: u64) -> IsolationForest {
        Self {
            trees: trees.max(1),
            max_samples: max_samples.max(1),
            seed,
        }
    }

    /// Fit a fresh forest on `rows` and score every row against it.
    ///
    /// The RNG is reseeded on each call, so identical inputs always produce
    /// identical scores.
    pub fn score_samples(&self, rows: &[Row]) -> Vec<f64> {
        if rows.is_empty() {
            return Vec::new();
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let subsample = self.max_samples.min(rows.len());
        let height_limit = (subsample.max(2) as f64).log2().ceil() as usize;

        let forest: Vec<Node> = (0..self.trees)
            .map(|_| {
                let indices = sample(&mut rng, rows.len(), subsample).into_vec();
                build(rows, indices, 0, height_limit, &mut rng)
            })
            .collect();

        let normalizer = average_path_length(subsample);

        rows.iter()
            .map(|row| {
                let mean_depth = forest
                    .iter()
                    .map(|tree| path_length(tree, row, 0))
                    .sum::<f64>()
                    / forest.len() as f64;

                let ratio = if normalizer > 0.0 {
                    mean_depth / normalizer
                } else {
                    0.0
                };
                -(2f64.powf(-ratio))
            })
            .collect()
    }
}

impl OutlierModel for IsolationForest {
    fn fit_score(&mut self, rows: &[Row]) -> Vec<f64> {
        self.score_samples(rows)
    }
}

fn build(
    rows: &[Row],
    indices: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= height_limit || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // only features that still vary inside this node can split it
    let candidates: Vec<(usize, f64, f64)> = (0..FEATURE_COUNT)
        .filter_map(|feature| {
            let (min, max) = indices.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(min, max), &i| (min.min(rows[i][feature]), max.max(rows[i][feature])),
            );
            (min.is_finite() && max.is_finite() && max > min).then_some((feature, min, max))
        })
        .collect();

    if candidates.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, min, max) = candidates[rng.gen_range(0..candidates.len())];
    let u: f64 = rng.gen_range(0.0..1.0);
    let threshold = min * (1.0 - u) + max * u;

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| rows[i][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build(rows, left, depth + 1, height_limit, rng)),
        right: Box::new(build(rows, right, depth + 1, height_limit, rng)),
    }
}

fn path_length(node: &Node, row: &Row, depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] <= *threshold {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points, `c(n)`.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        n => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}
