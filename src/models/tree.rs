//! Depth-limited regression tree, the base learner for boosting

use crate::error::{EngineError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// CART-style regression tree fitted by variance reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    max_depth: usize,
    min_samples_leaf: usize,
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    pub fn new(max_depth: usize, min_samples_leaf: usize) -> Self {
        Self {
            max_depth,
            min_samples_leaf: min_samples_leaf.max(1),
            nodes: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(EngineError::TrainingError(format!(
                "feature/label shape mismatch: {} rows vs {} labels",
                x.nrows(),
                y.len()
            )));
        }

        self.nodes.clear();
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.grow(x, y, &indices, 0);
        Ok(())
    }

    /// Grow a subtree, returning its root index in the arena
    fn grow(&mut self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize], depth: usize) -> usize {
        let n = indices.len();
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n as f64;

        if depth >= self.max_depth || n < 2 * self.min_samples_leaf {
            return self.push(TreeNode::Leaf { value: mean });
        }

        let Some((feature, threshold)) = self.best_split(x, y, indices) else {
            return self.push(TreeNode::Leaf { value: mean });
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature]] < threshold);

        if left_idx.is_empty() || right_idx.is_empty() {
            return self.push(TreeNode::Leaf { value: mean });
        }

        // Reserve the split slot before growing children
        let slot = self.push(TreeNode::Leaf { value: mean });
        let left = self.grow(x, y, &left_idx, depth + 1);
        let right = self.grow(x, y, &right_idx, depth + 1);
        self.nodes[slot] = TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        };
        slot
    }

    /// Best (feature, threshold) by sum-of-squared-error reduction,
    /// scanned with prefix sums over value-sorted rows
    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
    ) -> Option<(usize, f64)> {
        let n = indices.len();
        let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, cost)

        for feature in 0..x.ncols() {
            let mut order: Vec<usize> = indices.to_vec();
            order.sort_by(|&a, &b| {
                x[[a, feature]]
                    .partial_cmp(&x[[b, feature]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut sum_left = 0.0;
            let mut sq_left = 0.0;
            let total: f64 = order.iter().map(|&i| y[i]).sum();
            let total_sq: f64 = order.iter().map(|&i| y[i] * y[i]).sum();

            for pos in 1..n {
                let yi = y[order[pos - 1]];
                sum_left += yi;
                sq_left += yi * yi;

                let prev = x[[order[pos - 1], feature]];
                let curr = x[[order[pos], feature]];
                if prev == curr || pos < self.min_samples_leaf || n - pos < self.min_samples_leaf
                {
                    continue;
                }

                let n_left = pos as f64;
                let n_right = (n - pos) as f64;
                let sum_right = total - sum_left;
                let sq_right = total_sq - sq_left;
                let cost = (sq_left - sum_left * sum_left / n_left)
                    + (sq_right - sum_right * sum_right / n_right);

                if best.map_or(true, |(_, _, c)| cost < c) {
                    best = Some((feature, (prev + curr) / 2.0, cost));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }

    fn push(&mut self, node: TreeNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.nodes.is_empty() {
            return Err(EngineError::ModelNotFitted);
        }

        let values: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let mut idx = 0;
                loop {
                    match &self.nodes[idx] {
                        TreeNode::Leaf { value } => return *value,
                        TreeNode::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            idx = if row[*feature] < *threshold { *left } else { *right };
                        }
                    }
                }
            })
            .collect();

        Ok(Array1::from_vec(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fits_step_function() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![0.0, 0.0, 0.0, 5.0, 5.0, 5.0];

        let mut tree = RegressionTree::new(3, 1);
        tree.fit(&x, &y).unwrap();

        let pred = tree.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-10);
        }
    }

    #[test]
    fn test_constant_target_single_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![4.0, 4.0, 4.0];

        let mut tree = RegressionTree::new(3, 1);
        tree.fit(&x, &y).unwrap();

        let pred = tree.predict(&array![[99.0]]).unwrap();
        assert!((pred[0] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_depth_zero_predicts_mean() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 2.0, 3.0, 4.0];

        let mut tree = RegressionTree::new(0, 1);
        tree.fit(&x, &y).unwrap();

        let pred = tree.predict(&x).unwrap();
        for p in pred.iter() {
            assert!((p - 2.5).abs() < 1e-10);
        }
    }

    #[test]
    fn test_shape_mismatch_fails() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        let mut tree = RegressionTree::new(3, 1);
        assert!(matches!(
            tree.fit(&x, &y),
            Err(EngineError::TrainingError(_))
        ));
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let tree = RegressionTree::new(3, 1);
        assert!(matches!(
            tree.predict(&array![[1.0]]),
            Err(EngineError::ModelNotFitted)
        ));
    }
}
