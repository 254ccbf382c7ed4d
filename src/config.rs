//! Request options for model creation and prediction

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Options accepted by [`DetectorEngine::create`](crate::engine::DetectorEngine::create).
///
/// Hosts typically hand these through as JSON:
/// `{"using": {"type": "semi-supervised"}}`. A fresh `CreateOptions::default()`
/// is the empty configuration; it is never shared between calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOptions {
    #[serde(default)]
    pub using: UsingOptions,
}

/// The `using` clause of a create request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsingOptions {
    /// Explicit model family. When absent the engine infers one from the data.
    #[serde(rename = "type")]
    pub model_type: Option<String>,
}

impl CreateOptions {
    /// Options with an explicit model family
    pub fn with_model_type(model_type: impl Into<String>) -> Self {
        Self {
            using: UsingOptions {
                model_type: Some(model_type.into()),
            },
        }
    }
}

/// Options accepted by [`DetectorEngine::predict`](crate::engine::DetectorEngine::predict).
///
/// Present for interface symmetry with the host's calling convention;
/// prediction currently reads nothing from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictOptions {}

/// The three recognized model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    Supervised,
    SemiSupervised,
    Unsupervised,
}

impl FromStr for ModelType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "supervised" => Ok(ModelType::Supervised),
            "semi-supervised" => Ok(ModelType::SemiSupervised),
            "unsupervised" => Ok(ModelType::Unsupervised),
            other => Err(EngineError::InvalidConfiguration(format!(
                "model type must be one of 'supervised', 'semi-supervised', or 'unsupervised', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelType::Supervised => "supervised",
            ModelType::SemiSupervised => "semi-supervised",
            ModelType::Unsupervised => "unsupervised",
        };
        f.write_str(s)
    }
}
