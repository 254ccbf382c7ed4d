//! Error types for the anomaly detection engine

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the engine and its components.
///
/// `InvalidConfiguration` is the only error the engine raises on its own
/// behalf; everything else surfaces failures from the data layer, the
/// trainers, or storage without translation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
