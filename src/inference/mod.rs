//! Inference engine module
//!
//! Applies a trained artifact to unlabeled flows:
//! - Schema-locked normalization (unseen categories never fail)
//! - Chunked scoring, parallel via rayon
//! - Per-row label and confidence in input order
//! - Batch summary with class counts and anomaly rate

mod config;
mod engine;

pub use config::InferenceConfig;
pub use engine::{InferenceEngine, PredictionResult, PredictionSummary};
