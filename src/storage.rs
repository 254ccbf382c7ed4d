//! Model artifact and metadata persistence
//!
//! The artifact is an opaque bincode blob at a caller-chosen path. Metadata
//! is a small JSON record stored through [`MetadataStore`], the abstraction
//! the host's key-value store plugs into. No versioning, integrity checks,
//! or encryption.

use crate::error::{EngineError, Result};
use crate::models::AnomalyModel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Fixed metadata key for the model record
pub const MODEL_ARGS_KEY: &str = "model_args";

/// Persisted model record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArgs {
    pub model_path: String,
    pub target: String,
    pub created_at: String,
}

impl ModelArgs {
    pub fn new(model_path: &Path, target: impl Into<String>) -> Self {
        Self {
            model_path: model_path.to_string_lossy().into_owned(),
            target: target.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Key-value JSON metadata store owned by the host
pub trait MetadataStore {
    fn json_set(&self, key: &str, value: &Value) -> Result<()>;
    fn json_get(&self, key: &str) -> Result<Option<Value>>;
}

/// File-backed metadata store, one `{key}.json` per key
#[derive(Debug, Clone)]
pub struct FsMetadataStore {
    dir: PathBuf,
}

impl FsMetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl MetadataStore for FsMetadataStore {
    fn json_set(&self, key: &str, value: &Value) -> Result<()> {
        let file = File::create(self.key_path(key))?;
        serde_json::to_writer(BufWriter::new(file), value)?;
        Ok(())
    }

    fn json_get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(path)?;
        let value = serde_json::from_reader(BufReader::new(file))?;
        Ok(Some(value))
    }
}

/// Serialize a fitted model to `path`
pub fn save_model(path: &Path, model: &AnomalyModel) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    bincode::serialize_into(BufWriter::new(file), model)
        .map_err(|e| EngineError::SerializationError(e.to_string()))
}

/// Reload a fitted model from `path`
pub fn load_model(path: &Path) -> Result<AnomalyModel> {
    let file = File::open(path)?;
    bincode::deserialize_from(BufReader::new(file))
        .map_err(|e| EngineError::SerializationError(e.to_string()))
}
