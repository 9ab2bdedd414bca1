//! Data preprocessing module
//!
//! Provides the schema normalizer that turns raw flow records into numeric
//! features:
//! - Per-column type inference (numeric vs categorical)
//! - Mean imputation for numeric columns
//! - First-seen integer codes for categorical columns, with reserved
//!   missing/unknown codes
//! - Schema-locked re-application at inference time

mod normalizer;
mod schema;

pub use normalizer::{SchemaNormalizer, TrainingData, CellStats};
pub use schema::{
    ColumnKind, FeatureColumn, FeatureSchema, LabelEncoder, MISSING_CODE, UNKNOWN_CODE,
};
