//! Empirical-CDF outlier detection
//!
//! Scores each row by how far its feature values sit in the tails of the
//! per-feature empirical distributions observed at fit time. Parameter-free
//! apart from the contamination ratio.

use crate::error::{EngineError, Result};
use crate::models::Detector;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Unsupervised detector over per-feature empirical tail probabilities.
///
/// For a value `v` in feature `j`, the left and right tail probabilities are
/// estimated from the sorted training values of `j`; the row score sums the
/// larger negative log tail over all features. The decision threshold is the
/// contamination quantile of the training scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcodDetector {
    contamination: f64,
    /// Sorted training values, one vector per feature
    reference: Option<Vec<Vec<f64>>>,
    threshold: Option<f64>,
}

impl EcodDetector {
    pub fn new() -> Self {
        Self {
            contamination: 0.1,
            reference: None,
            threshold: None,
        }
    }

    /// Set the expected proportion of outliers
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    /// Anomaly score per row, higher means more anomalous
    pub fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let reference = self
            .reference
            .as_ref()
            .ok_or(EngineError::ModelNotFitted)?;

        if x.ncols() != reference.len() {
            return Err(EngineError::DataError(format!(
                "expected {} features, got {}",
                reference.len(),
                x.ncols()
            )));
        }

        let scores: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(reference.iter())
                    .map(|(&v, sorted)| tail_score(sorted, v))
                    .sum()
            })
            .collect();

        Ok(Array1::from_vec(scores))
    }

    pub fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(f64::INFINITY)
    }
}

impl Default for EcodDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for EcodDetector {
    fn fit(&mut self, x: &Array2<f64>, _y: Option<&Array1<i64>>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(EngineError::TrainingError(
                "cannot fit on an empty feature matrix".to_string(),
            ));
        }

        let reference: Vec<Vec<f64>> = (0..x.ncols())
            .map(|j| {
                let mut column: Vec<f64> = x.column(j).iter().copied().collect();
                column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                column
            })
            .collect();
        self.reference = Some(reference);

        // Threshold at the contamination quantile of training scores
        let scores = self.score_samples(x)?;
        let mut sorted: Vec<f64> = scores.iter().copied().collect();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((self.contamination * x.nrows() as f64) as usize).min(x.nrows() - 1);
        self.threshold = Some(sorted[idx]);

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let threshold = self.threshold.ok_or(EngineError::ModelNotFitted)?;
        let scores = self.score_samples(x)?;
        Ok(scores.mapv(|s| if s >= threshold { 1 } else { 0 }))
    }
}

/// max(-log left tail, -log right tail) for `v` against a sorted reference.
/// Tail probabilities use add-one smoothing so boundary values stay finite.
fn tail_score(sorted: &[f64], v: f64) -> f64 {
    let n = sorted.len() as f64;
    let le = sorted.partition_point(|&s| s <= v) as f64;
    let ge = n - sorted.partition_point(|&s| s < v) as f64;

    let left = (le + 1.0) / (n + 2.0);
    let right = (ge + 1.0) / (n + 2.0);

    (-left.ln()).max(-right.ln())
}
