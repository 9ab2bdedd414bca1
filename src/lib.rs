//! NIDS Pipeline - network intrusion detection from flow CSVs
//!
//! This crate trains a supervised classifier on labeled network-flow records,
//! persists it as a self-describing artifact and applies it to unlabeled
//! batches:
//! - Schema normalization of raw CSV cells into a numeric feature matrix
//! - Seeded, stratified train/holdout split
//! - Decision tree, random forest and Gaussian naive Bayes classifiers
//! - Atomic, versioned artifact storage
//! - Batch inference with per-row confidence and an anomaly summary
//!
//! # Modules
//!
//! - [`preprocessing`] - Schema inference, imputation, categorical encoding
//! - [`training`] - Classifiers, splitter and training engine
//! - [`export`] - Model artifact and on-disk store
//! - [`inference`] - Schema-locked batch prediction
//! - [`bootstrap`] - Storage directory setup
//! - [`config`] - Pipeline configuration (defaults, env, JSON)
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use nids_pipeline::{ensure_directories, load_model, predict_from_csv, train_model_from_csv};
//!
//! # fn main() -> nids_pipeline::Result<()> {
//! ensure_directories(["uploads", "models", "data"])?;
//! let metrics = train_model_from_csv("data/flows.csv", "label", "models")?;
//! println!("{}", metrics.summary_line());
//!
//! let model = load_model("models")?;
//! let (rows, summary) = predict_from_csv(model.as_ref(), "uploads/batch.csv")?;
//! println!("{} rows, anomaly rate {:?}", rows.len(), summary.anomaly_rate);
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;
pub mod config;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod inference;

// Persistence
pub mod export;
pub mod bootstrap;

// Entry points
pub mod pipeline;
pub mod utils;
pub mod cli;

pub use error::{NidsError, Result};
pub use bootstrap::ensure_directories;
pub use pipeline::{
    is_allowed_file, load_model, predict_from_csv, predict_from_csv_with, predictions_file_name,
    resolve_data_file, train_model_from_csv, train_model_from_csv_with,
};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{NidsError, Result};

    // Configuration
    pub use crate::config::PipelineConfig;

    // Preprocessing
    pub use crate::preprocessing::{FeatureSchema, LabelEncoder, SchemaNormalizer};

    // Training
    pub use crate::training::{Classifier, ModelType, TrainEngine, TrainedModel, TrainingConfig, TrainingMetrics};

    // Inference
    pub use crate::inference::{InferenceConfig, InferenceEngine, PredictionResult, PredictionSummary};

    // Export
    pub use crate::export::{ArtifactStore, ModelArtifact};

    // Pipeline operations
    pub use crate::bootstrap::ensure_directories;
    pub use crate::pipeline::{load_model, predict_from_csv, train_model_from_csv};
}
