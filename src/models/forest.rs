//! Isolation forest scoring
//!
//! Used as an auxiliary scorer inside the hybrid ensemble: anomalous rows
//! isolate in fewer random splits, so short average path lengths translate
//! into high scores.

use crate::error::{EngineError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

const EULER_MASCHERONI: f64 = 0.577_215_664_9;

/// One node of an isolation tree, stored in a flat arena
#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn build(
        x: &Array2<f64>,
        indices: &[usize],
        max_depth: usize,
        rng: &mut Xoshiro256PlusPlus,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(x, indices, 0, max_depth, rng);
        tree
    }

    /// Grow a subtree and return its root index in the arena
    fn grow(
        &mut self,
        x: &Array2<f64>,
        indices: &[usize],
        depth: usize,
        max_depth: usize,
        rng: &mut Xoshiro256PlusPlus,
    ) -> usize {
        if depth >= max_depth || indices.len() <= 1 {
            return self.push(Node::Leaf {
                size: indices.len(),
            });
        }

        let feature = rng.gen_range(0..x.ncols());
        let values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
        let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        if (hi - lo).abs() < 1e-12 {
            return self.push(Node::Leaf {
                size: indices.len(),
            });
        }

        let threshold = rng.gen_range(lo..hi);
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature]] < threshold);

        if left_idx.is_empty() || right_idx.is_empty() {
            return self.push(Node::Leaf {
                size: indices.len(),
            });
        }

        // Reserve the split slot before growing children so the root of a
        // subtree always precedes its descendants.
        let slot = self.push(Node::Leaf { size: 0 });
        let left = self.grow(x, &left_idx, depth + 1, max_depth, rng);
        let right = self.grow(x, &right_idx, depth + 1, max_depth, rng);
        self.nodes[slot] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        slot
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        let mut depth = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { size } => return depth as f64 + average_bst_depth(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] < *threshold { *left } else { *right };
                    depth += 1;
                }
            }
        }
    }
}

/// Expected unsuccessful-search depth in a BST over `n` points
fn average_bst_depth(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Isolation forest anomaly scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    n_trees: usize,
    max_samples: usize,
    contamination: f64,
    seed: u64,
    trees: Option<Vec<IsolationTree>>,
    samples_per_tree: Option<usize>,
    threshold: Option<f64>,
}

impl IsolationForest {
    pub fn new() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: 42,
            trees: None,
            samples_per_tree: None,
            threshold: None,
        }
    }

    pub fn with_n_trees(mut self, n: usize) -> Self {
        self.n_trees = n.max(1);
        self
    }

    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(EngineError::TrainingError(
                "cannot fit on an empty feature matrix".to_string(),
            ));
        }

        let samples_per_tree = self.max_samples.min(n_samples);
        let max_depth = (samples_per_tree as f64).log2().ceil() as usize;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);

        let trees: Vec<IsolationTree> = (0..self.n_trees)
            .map(|_| {
                let indices: Vec<usize> = (0..samples_per_tree)
                    .map(|_| rng.gen_range(0..n_samples))
                    .collect();
                IsolationTree::build(x, &indices, max_depth, &mut rng)
            })
            .collect();

        self.trees = Some(trees);
        self.samples_per_tree = Some(samples_per_tree);

        let scores = self.score_samples(x)?;
        let mut sorted: Vec<f64> = scores.iter().copied().collect();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((self.contamination * n_samples as f64) as usize).min(n_samples - 1);
        self.threshold = Some(sorted[idx]);

        Ok(())
    }

    /// Anomaly score in (0, 1), higher means more anomalous
    pub fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let trees = self.trees.as_ref().ok_or(EngineError::ModelNotFitted)?;
        let normalizer = average_bst_depth(self.samples_per_tree.unwrap_or(256));

        let scores: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let sample: Vec<f64> = row.iter().copied().collect();
                let avg_path: f64 = trees
                    .iter()
                    .map(|tree| tree.path_length(&sample))
                    .sum::<f64>()
                    / trees.len() as f64;
                2.0_f64.powf(-avg_path / normalizer)
            })
            .collect();

        Ok(Array1::from_vec(scores))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let threshold = self.threshold.ok_or(EngineError::ModelNotFitted)?;
        let scores = self.score_samples(x)?;
        Ok(scores.mapv(|s| if s >= threshold { 1 } else { 0 }))
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_with_outliers() -> Array2<f64> {
        let mut data = Vec::new();
        for i in 0..50 {
            data.push((i % 10) as f64);
            data.push(((i % 10) + 1) as f64);
        }
        data.extend_from_slice(&[100.0, 100.0]);
        data.extend_from_slice(&[-50.0, -50.0]);
        Array2::from_shape_vec((52, 2), data).unwrap()
    }

    #[test]
    fn test_outliers_score_higher() {
        let x = data_with_outliers();
        let mut forest = IsolationForest::new()
            .with_n_trees(50)
            .with_contamination(0.05)
            .with_seed(7);
        forest.fit(&x).unwrap();

        let scores = forest.score_samples(&x).unwrap();
        assert!(scores[50] > scores[0]);
        assert!(scores[51] > scores[0]);
    }

    #[test]
    fn test_predict_flags_some_anomalies() {
        let x = data_with_outliers();
        let mut forest = IsolationForest::new().with_n_trees(50).with_seed(7);
        forest.fit(&x).unwrap();

        let labels = forest.predict(&x).unwrap();
        assert!(labels.iter().any(|&l| l == 1));
        assert!(labels.iter().all(|&l| l == 0 || l == 1));
    }

    #[test]
    fn test_deterministic_with_seed() {
        let x = data_with_outliers();
        let mut a = IsolationForest::new().with_n_trees(20).with_seed(3);
        let mut b = IsolationForest::new().with_n_trees(20).with_seed(3);
        a.fit(&x).unwrap();
        b.fit(&x).unwrap();
        assert_eq!(a.score_samples(&x).unwrap(), b.score_samples(&x).unwrap());
    }

    #[test]
    fn test_score_before_fit_fails() {
        let forest = IsolationForest::new();
        let x = Array2::zeros((2, 2));
        assert!(matches!(
            forest.score_samples(&x),
            Err(EngineError::ModelNotFitted)
        ));
    }
}
