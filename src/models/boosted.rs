//! Gradient-boosted binary classifier
//!
//! Regression trees fitted to logistic-loss residuals with shrinkage and
//! row/column subsampling. This is the supervised family the engine picks
//! for large labeled datasets.

use crate::error::{EngineError, Result};
use crate::models::{Detector, RegressionTree};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Row count above which residuals are computed in parallel
const PARALLEL_RESIDUAL_CUTOFF: usize = 10_000;

/// Boosting hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Row subsample ratio per tree
    pub subsample: f64,
    /// Column subsample ratio per tree
    pub colsample: f64,
    pub seed: u64,
}

impl Default for BoostedConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 4,
            min_samples_leaf: 1,
            subsample: 0.8,
            colsample: 0.8,
            seed: 42,
        }
    }
}

/// Gradient-boosted trees over logistic loss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedClassifier {
    config: BoostedConfig,
    trees: Vec<RegressionTree>,
    columns_per_tree: Vec<Vec<usize>>,
    initial_log_odds: f64,
    is_fitted: bool,
}

impl BoostedClassifier {
    pub fn new(config: BoostedConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            columns_per_tree: Vec::new(),
            initial_log_odds: 0.0,
            is_fitted: false,
        }
    }

    fn fit_logistic(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples == 0 || n_samples != y.len() {
            return Err(EngineError::TrainingError(format!(
                "feature/label shape mismatch: {} rows vs {} labels",
                n_samples,
                y.len()
            )));
        }

        let p = y.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        self.initial_log_odds = (p / (1.0 - p)).ln();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.seed);

        self.trees.clear();
        self.columns_per_tree.clear();

        for _ in 0..self.config.n_estimators {
            let residuals = compute_residuals(y, &log_odds);

            let rows = sample_indices(n_samples, self.config.subsample, &mut rng);
            let cols = sample_indices(n_features, self.config.colsample, &mut rng);

            let x_sub = x.select(Axis(0), &rows).select(Axis(1), &cols);
            let r_sub: Array1<f64> = rows.iter().map(|&i| residuals[i]).collect();

            let mut tree =
                RegressionTree::new(self.config.max_depth, self.config.min_samples_leaf);
            tree.fit(&x_sub, &r_sub)?;

            let updates = tree.predict(&x_sub)?;
            for (i, &row) in rows.iter().enumerate() {
                log_odds[row] += self.config.learning_rate * updates[i];
            }

            self.trees.push(tree);
            self.columns_per_tree.push(cols);
        }

        self.is_fitted = true;
        Ok(())
    }

    /// Outlier probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(EngineError::ModelNotFitted);
        }

        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for (tree, cols) in self.trees.iter().zip(self.columns_per_tree.iter()) {
            let x_sub = x.select(Axis(1), cols);
            let updates = tree.predict(&x_sub)?;
            for i in 0..x.nrows() {
                log_odds[i] += self.config.learning_rate * updates[i];
            }
        }

        Ok(log_odds.mapv(sigmoid))
    }
}

impl Detector for BoostedClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<i64>>) -> Result<()> {
        let y = y.ok_or_else(|| {
            EngineError::TrainingError("supervised training requires labels".to_string())
        })?;
        let targets: Array1<f64> = y.mapv(|v| if v > 0 { 1.0 } else { 0.0 });
        self.fit_logistic(x, &targets)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p >= 0.5 { 1 } else { 0 }))
    }
}

fn sigmoid(log_odds: f64) -> f64 {
    1.0 / (1.0 + (-log_odds).exp())
}

/// Gradient of the log loss: y - sigmoid(log_odds)
fn compute_residuals(y: &Array1<f64>, log_odds: &Array1<f64>) -> Array1<f64> {
    let n = y.len();
    if n > PARALLEL_RESIDUAL_CUTOFF {
        let res: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|i| y[i] - sigmoid(log_odds[i]))
            .collect();
        Array1::from_vec(res)
    } else {
        y.iter()
            .zip(log_odds.iter())
            .map(|(yi, lo)| yi - sigmoid(*lo))
            .collect()
    }
}

/// Shuffled, sorted index sample covering `ratio` of `n`
fn sample_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let size = (((n as f64) * ratio).ceil() as usize).clamp(1, n);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(size);
    indices.sort_unstable();
    indices
}
