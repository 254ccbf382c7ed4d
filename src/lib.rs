//! Anomaly detection engine with a uniform train/predict contract
//!
//! Hosts embed this crate to train and apply anomaly-detection models over
//! tabular data. Two operations cover the lifecycle:
//!
//! - [`DetectorEngine::create`] selects a model family (explicitly via
//!   options, or inferred from target presence and row count), preprocesses
//!   the data, fits, and persists the artifact plus a small metadata record.
//! - [`DetectorEngine::predict`] reloads the persisted model, preprocesses
//!   incoming rows the same way, and returns one prediction per row under
//!   the stored target name.
//!
//! # Modules
//!
//! - [`preprocessing`] - one-hot encoding and standardization over polars frames
//! - [`models`] - the three model families behind the [`models::Detector`] trait
//! - [`engine`] - family selection, training, and prediction
//! - [`storage`] - artifact serialization and the host metadata-store seam
//! - [`config`] - create-request options
//!
//! # Example
//!
//! ```no_run
//! use anomaly_engine::{CreateOptions, DetectorEngine, FsMetadataStore, PredictOptions};
//! use polars::prelude::*;
//!
//! # fn main() -> anomaly_engine::Result<()> {
//! let df = df!("temperature" => &[20.1, 19.8, 20.3, 55.0])?;
//!
//! let store = FsMetadataStore::new("/tmp/detector/meta")?;
//! let engine = DetectorEngine::new(store, "/tmp/detector/artifacts", "sensor-a");
//!
//! engine.create(None, &df, &CreateOptions::default())?;
//! let result = engine.predict(&df, &PredictOptions::default())?;
//! assert_eq!(result.get_column_names()[0].as_str(), "outlier");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod preprocessing;
pub mod storage;

pub use config::{CreateOptions, ModelType, PredictOptions, UsingOptions};
pub use engine::{DetectorEngine, DEFAULT_TARGET, ROW_ID_COLUMN, SUPERVISED_ROW_THRESHOLD};
pub use error::{EngineError, Result};
pub use models::{AnomalyModel, Detector};
pub use storage::{FsMetadataStore, MetadataStore, ModelArgs};
