//! Train/predict engine
//!
//! One engine instance manages one model slot: `create` selects a family,
//! fits, and persists; `predict` reloads the artifact and scores new rows.
//! Calls are synchronous and stateless between each other; the host owns any
//! concurrency control over the slot.

use crate::config::{CreateOptions, ModelType, PredictOptions};
use crate::error::{EngineError, Result};
use crate::models::{self, Detector};
use crate::preprocessing::{preprocess, to_feature_matrix};
use crate::storage::{self, MetadataStore, ModelArgs, MODEL_ARGS_KEY};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Target name synthesized when training without a label column
pub const DEFAULT_TARGET: &str = "outlier";

/// Row-identifier column injected by the host, stripped before prediction
pub const ROW_ID_COLUMN: &str = "__row_id";

/// Labeled row count above which the fully supervised family is preferred
/// over the hybrid ensemble (exclusive boundary)
pub const SUPERVISED_ROW_THRESHOLD: usize = 3000;

/// Anomaly detection engine bound to one model slot.
///
/// The artifact path derives from the host-supplied instance id, so separate
/// instances sharing an artifact directory never collide.
pub struct DetectorEngine<S: MetadataStore> {
    store: S,
    artifact_dir: PathBuf,
    instance_id: String,
}

impl<S: MetadataStore> DetectorEngine<S> {
    pub fn new(store: S, artifact_dir: impl Into<PathBuf>, instance_id: impl Into<String>) -> Self {
        Self {
            store,
            artifact_dir: artifact_dir.into(),
            instance_id: instance_id.into(),
        }
    }

    fn artifact_path(&self) -> PathBuf {
        self.artifact_dir
            .join(format!("{}.model.bin", self.instance_id))
    }

    /// Train a model and persist it together with its metadata record.
    ///
    /// An explicit `options.using.type` selects the family directly; an
    /// unrecognized value fails with `InvalidConfiguration` before anything
    /// is fitted or persisted. Without an explicit type the family is
    /// inferred: a present target column means supervised (with a row-count
    /// split between the boosted and hybrid families), an absent one means
    /// unsupervised under the synthesized `"outlier"` target.
    pub fn create(
        &self,
        target: Option<&str>,
        df: &DataFrame,
        options: &CreateOptions,
    ) -> Result<()> {
        let mode = options
            .using
            .model_type
            .as_deref()
            .map(str::parse::<ModelType>)
            .transpose()?;

        let target = target.unwrap_or(DEFAULT_TARGET);

        let model = match mode {
            Some(ModelType::Supervised) => {
                let (x, y) = self.labeled_features(df, target)?;
                models::train_supervised(&x, &y)?
            }
            Some(ModelType::SemiSupervised) => {
                let (x, y) = self.labeled_features(df, target)?;
                models::train_semisupervised(&x, &y)?
            }
            Some(ModelType::Unsupervised) => {
                let x = self.unlabeled_features(df, target)?;
                models::train_unsupervised(&x)?
            }
            None => {
                if df.column(target).is_ok() {
                    let (x, y) = self.labeled_features(df, target)?;
                    if df.height() > SUPERVISED_ROW_THRESHOLD {
                        models::train_supervised(&x, &y)?
                    } else {
                        models::train_semisupervised(&x, &y)?
                    }
                } else {
                    let x = self.unlabeled_features(df, target)?;
                    models::train_unsupervised(&x)?
                }
            }
        };

        let path = self.artifact_path();
        storage::save_model(&path, &model)?;

        let args = ModelArgs::new(&path, target);
        self.store
            .json_set(MODEL_ARGS_KEY, &serde_json::to_value(&args)?)?;

        info!(
            rows = df.height(),
            family = model.family(),
            target = target,
            "trained anomaly model"
        );
        Ok(())
    }

    /// Score new rows with the persisted model.
    ///
    /// Returns a single-column frame named after the stored target, one
    /// prediction per input row in input order. The model is reloaded from
    /// storage on every call. `options` is accepted for interface symmetry
    /// and currently unused.
    pub fn predict(&self, df: &DataFrame, _options: &PredictOptions) -> Result<DataFrame> {
        let value = self
            .store
            .json_get(MODEL_ARGS_KEY)?
            .ok_or(EngineError::ModelNotFitted)?;
        let args: ModelArgs = serde_json::from_value(value)?;

        let mut frame = df.clone();
        if frame.column(ROW_ID_COLUMN).is_ok() {
            frame = frame.drop(ROW_ID_COLUMN)?;
        }
        if frame.column(&args.target).is_ok() {
            frame = frame.drop(&args.target)?;
        }

        let processed = preprocess(&frame)?;
        let x = to_feature_matrix(&processed)?;

        let model = storage::load_model(args.model_path.as_ref())?;
        debug!(
            rows = df.height(),
            family = model.family(),
            "scoring with reloaded model"
        );
        let labels = model.predict(&x)?;

        let predictions = Int64Chunked::from_vec(args.target.as_str().into(), labels.to_vec())
            .into_series();
        Ok(DataFrame::new(vec![predictions.into_column()])?)
    }

    /// Drop the target, preprocess the rest, and integer-cast the raw labels
    fn labeled_features(
        &self,
        df: &DataFrame,
        target: &str,
    ) -> Result<(Array2<f64>, Array1<i64>)> {
        let labels = df
            .column(target)
            .map_err(|_| EngineError::FeatureNotFound(target.to_string()))?
            .as_materialized_series()
            .cast(&DataType::Int64)
            .map_err(|e| EngineError::DataError(e.to_string()))?;
        let labels: Array1<i64> = labels
            .i64()
            .map_err(|e| EngineError::DataError(e.to_string()))?
            .into_iter()
            .map(|opt| {
                opt.ok_or_else(|| {
                    EngineError::DataError(format!("null label in target column '{}'", target))
                })
            })
            .collect::<Result<Vec<i64>>>()?
            .into();

        let features = preprocess(&df.drop(target)?)?;
        Ok((to_feature_matrix(&features)?, labels))
    }

    /// Preprocess the full frame, minus a target column if one is present
    fn unlabeled_features(&self, df: &DataFrame, target: &str) -> Result<Array2<f64>> {
        let frame = if df.column(target).is_ok() {
            df.drop(target)?
        } else {
            df.clone()
        };
        let features = preprocess(&frame)?;
        to_feature_matrix(&features)
    }
}
