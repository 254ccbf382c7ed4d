//! Anomaly model families
//!
//! Three trainer entry points cover the engine's needs:
//! - [`train_unsupervised`] — empirical-CDF tail detector, no labels
//! - [`train_supervised`] — gradient-boosted binary classifier
//! - [`train_semisupervised`] — hybrid outlier-ensemble classifier,
//!   tolerates partially labeled data
//!
//! Every fitted model predicts `0` (inlier) or `1` (outlier) per row.

mod boosted;
mod ecod;
mod forest;
mod hybrid;
mod tree;

pub use boosted::{BoostedClassifier, BoostedConfig};
pub use ecod::EcodDetector;
pub use forest::IsolationForest;
pub use hybrid::HybridDetector;
pub use tree::RegressionTree;

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Uniform fit/predict capability over all model families.
///
/// `fit` takes labels where the family uses them; label conventions
/// (integer casting, unlabeled sentinels) are owned by each family.
pub trait Detector {
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<i64>>) -> Result<()>;

    /// One label per row: 0 = inlier, 1 = outlier
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>>;
}

/// A fitted model of any family, serializable as one artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnomalyModel {
    Ecod(EcodDetector),
    Boosted(BoostedClassifier),
    Hybrid(HybridDetector),
}

impl AnomalyModel {
    /// Family name, for logging
    pub fn family(&self) -> &'static str {
        match self {
            AnomalyModel::Ecod(_) => "ecod",
            AnomalyModel::Boosted(_) => "boosted",
            AnomalyModel::Hybrid(_) => "hybrid",
        }
    }
}

impl Detector for AnomalyModel {
    fn fit(&mut self, x: &Array2<f64>, y: Option<&Array1<i64>>) -> Result<()> {
        match self {
            AnomalyModel::Ecod(m) => m.fit(x, y),
            AnomalyModel::Boosted(m) => m.fit(x, y),
            AnomalyModel::Hybrid(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        match self {
            AnomalyModel::Ecod(m) => m.predict(x),
            AnomalyModel::Boosted(m) => m.predict(x),
            AnomalyModel::Hybrid(m) => m.predict(x),
        }
    }
}

/// Fit the unsupervised detector on unlabeled features
pub fn train_unsupervised(x: &Array2<f64>) -> Result<AnomalyModel> {
    let mut model = EcodDetector::new();
    model.fit(x, None)?;
    Ok(AnomalyModel::Ecod(model))
}

/// Fit the supervised classifier on fully labeled features
pub fn train_supervised(x: &Array2<f64>, y: &Array1<i64>) -> Result<AnomalyModel> {
    let mut model = BoostedClassifier::new(BoostedConfig::default());
    model.fit(x, Some(y))?;
    Ok(AnomalyModel::Boosted(model))
}

/// Fit the hybrid ensemble on partially labeled features.
/// Labels below zero mark unlabeled rows.
pub fn train_semisupervised(x: &Array2<f64>, y: &Array1<i64>) -> Result<AnomalyModel> {
    let mut model = HybridDetector::new();
    model.fit(x, Some(y))?;
    Ok(AnomalyModel::Hybrid(model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn clustered_data() -> Array2<f64> {
        let mut data = Vec::new();
        for i in 0..40 {
            data.push((i % 5) as f64);
            data.push((i % 5) as f64 + 0.5);
        }
        data.extend_from_slice(&[80.0, -70.0]);
        Array2::from_shape_vec((41, 2), data).unwrap()
    }

    #[test]
    fn test_train_unsupervised_round_trip() {
        let x = clustered_data();
        let model = train_unsupervised(&x).unwrap();
        assert_eq!(model.family(), "ecod");

        let labels = model.predict(&x).unwrap();
        assert_eq!(labels.len(), 41);
        assert!(labels.iter().all(|&l| l == 0 || l == 1));
    }

    #[test]
    fn test_model_serde_round_trip() {
        let x = clustered_data();
        let model = train_unsupervised(&x).unwrap();

        let bytes = bincode::serialize(&model).unwrap();
        let restored: AnomalyModel = bincode::deserialize(&bytes).unwrap();

        let a = model.predict(&x).unwrap();
        let b = restored.predict(&x).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_train_supervised_fits_labels() {
        let x = array![
            [0.0, 0.1],
            [0.1, 0.0],
            [0.2, 0.1],
            [0.1, 0.2],
            [5.0, 5.1],
            [5.1, 5.0],
            [5.2, 5.1],
            [5.0, 5.2],
        ];
        let y = array![0i64, 0, 0, 0, 1, 1, 1, 1];

        let model = train_supervised(&x, &y).unwrap();
        assert_eq!(model.family(), "boosted");

        let labels = model.predict(&x).unwrap();
        let correct = labels
            .iter()
            .zip(y.iter())
            .filter(|(a, b)| a == b)
            .count();
        assert!(correct >= 6, "got {} correct of 8", correct);
    }
}
