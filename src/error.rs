//! Error types for the NIDS pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, NidsError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum NidsError {
    /// Input columns are incompatible with the expected or locked schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// No usable rows remained after parsing
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Too few rows to split into training and holdout sets
    #[error("Insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// The underlying fit routine failed
    #[error("Training error: {0}")]
    TrainingError(String),

    /// The artifact file exists but cannot be read back
    #[error("Corrupt artifact at {path}: {reason}")]
    CorruptArtifact { path: String, reason: String },

    /// Inference was attempted without a trained artifact
    #[error("Model not trained")]
    ModelNotTrained,

    /// A named input file does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl NidsError {
    /// Whether this error came out of a classifier fit
    pub fn is_training_failure(&self) -> bool {
        matches!(self, NidsError::TrainingError(_) | NidsError::ComputationError(_))
    }
}

impl From<polars::error::PolarsError> for NidsError {
    fn from(err: polars::error::PolarsError) -> Self {
        NidsError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for NidsError {
    fn from(err: serde_json::Error) -> Self {
        NidsError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for NidsError {
    fn from(err: ndarray::ShapeError) -> Self {
        NidsError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
