//! Hybrid semi-supervised outlier ensemble
//!
//! Unsupervised scorers fit on every row (labeled or not) and their scores
//! augment the feature matrix; a boosted classifier then fits on the
//! augmented features of the labeled rows only. Labels below zero mark
//! unlabeled rows; that sentinel convention is owned here.

use crate::error::{EngineError, Result};
use crate::models::{BoostedClassifier, BoostedConfig, Detector, EcodDetector, IsolationForest};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Outlier-score augmentation feeding a boosted classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridDetector {
    ecod: EcodDetector,
    forest: IsolationForest,
    classifier: BoostedClassifier,
}

impl HybridDetector {
    pub fn new() -> Self {
        Self {
            ecod: EcodDetector::new(),
            forest: IsolationForest::new(),
            classifier: BoostedClassifier::new(BoostedConfig::default()),
        }
    }

    /// Feature matrix extended with one score column per scorer
    fn augment(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let ecod_scores = self.ecod.score_samples(x)?;
        let forest_scores = self.forest.score_samples(x)?;

        let mut augmented = Array2::zeros((x.nrows(), x.ncols() + 2));
        augmented
            .slice_mut(ndarray::s![.., ..x.ncols()])
            .assign(x);
        augmented
            .slice_mut(ndarray::s![.., x.ncols()])
            .assign(&ecod_scores);
        augmented
            .slice_mut(ndarray::s![.., x.ncols() + 1])
            .assign(&forest_scores);

        Ok(augmented)
    }
}

impl Default for HybridDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for HybridDetector {
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<i64>>) -> Result<()> {
        let y = y.ok_or_else(|| {
            EngineError::TrainingError("semi-supervised training requires labels".to_string())
        })?;
        if x.nrows() != y.len() {
            return Err(EngineError::TrainingError(format!(
                "feature/label shape mismatch: {} rows vs {} labels",
                x.nrows(),
                y.len()
            )));
        }

        // Scorers see every row, labeled or not
        self.ecod.fit(x, None)?;
        self.forest.fit(x)?;

        let labeled: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, &label)| label >= 0)
            .map(|(i, _)| i)
            .collect();
        if labeled.is_empty() {
            return Err(EngineError::TrainingError(
                "semi-supervised training requires at least one labeled row".to_string(),
            ));
        }

        let augmented = self.augment(x)?;
        let x_labeled = augmented.select(Axis(0), &labeled);
        let y_labeled: Array1<i64> = labeled.iter().map(|&i| y[i]).collect();

        self.classifier.fit(&x_labeled, Some(&y_labeled))
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        let augmented = self.augment(x)?;
        self.classifier.predict(&augmented)
    }
}
