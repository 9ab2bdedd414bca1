//! Pipeline configuration
//!
//! Storage locations plus the training and inference tunables. Built from
//! defaults, environment variables or a JSON file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NidsError, Result};
use crate::inference::InferenceConfig;
use crate::training::{ModelType, TrainingConfig};

/// Directory for uploaded prediction inputs and prediction outputs
pub const ENV_UPLOAD_DIR: &str = "NIDS_UPLOAD_DIR";
/// Directory holding the model artifact
pub const ENV_MODELS_DIR: &str = "NIDS_MODELS_DIR";
/// Directory holding training CSVs
pub const ENV_DATA_DIR: &str = "NIDS_DATA_DIR";
pub const ENV_LABEL_COLUMN: &str = "NIDS_LABEL_COLUMN";
pub const ENV_MODEL: &str = "NIDS_MODEL";
pub const ENV_SEED: &str = "NIDS_SEED";

/// Full configuration of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub upload_dir: PathBuf,
    pub models_dir: PathBuf,
    pub data_dir: PathBuf,
    /// CSV field separator for training and prediction input
    #[serde(default = "default_delimiter")]
    pub delimiter: u8,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

fn default_delimiter() -> u8 {
    b','
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            models_dir: PathBuf::from("models"),
            data_dir: PathBuf::from("data"),
            delimiter: default_delimiter(),
            training: TrainingConfig::default(),
            inference: InferenceConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Place `uploads/`, `models/` and `data/` under `base`
    pub fn with_base_dir(mut self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        self.upload_dir = base.join("uploads");
        self.models_dir = base.join("models");
        self.data_dir = base.join("data");
        self
    }

    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    /// Storage locations in bootstrap order
    pub fn directories(&self) -> [&Path; 3] {
        [&self.upload_dir, &self.models_dir, &self.data_dir]
    }

    /// Defaults overridden by `NIDS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `NIDS_*` key
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_UPLOAD_DIR) {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_MODELS_DIR) {
            config.models_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(label) = lookup(ENV_LABEL_COLUMN) {
            config.training.label_column = label;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            config.training.model_type = model
                .parse::<ModelType>()
                .map_err(|e| NidsError::ConfigError(format!("{}: {}", ENV_MODEL, e)))?;
        }
        if let Some(seed) = lookup(ENV_SEED) {
            config.training.random_seed = seed.trim().parse().map_err(|_| {
                NidsError::ConfigError(format!("{}: '{}' is not an unsigned integer", ENV_SEED, seed))
            })?;
        }

        config.training.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            NidsError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            NidsError::ConfigError(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.training.validate()?;
        Ok(config)
    }

    /// Save as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
