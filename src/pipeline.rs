//! Top-level pipeline operations
//!
//! These are the entry points a front end calls: bootstrap storage, train
//! from a CSV, load the stored model and predict a CSV batch.

use chrono::NaiveDateTime;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::{NidsError, Result};
use crate::export::{ArtifactStore, ModelArtifact};
use crate::inference::{InferenceConfig, InferenceEngine, PredictionResult, PredictionSummary};
use crate::training::{TrainEngine, TrainingConfig, TrainingMetrics};
use crate::utils::DataLoader;

/// File extensions accepted as pipeline input
pub const ALLOWED_EXTENSIONS: &[&str] = &["csv"];

/// Train on `csv_path` and store the artifact in `models_dir`.
///
/// The previous artifact is only replaced when training succeeds.
pub fn train_model_from_csv(
    csv_path: impl AsRef<Path>,
    label_column: &str,
    models_dir: impl AsRef<Path>,
) -> Result<TrainingMetrics> {
    let config = PipelineConfig::default()
        .with_models_dir(models_dir.as_ref())
        .with_training(TrainingConfig::new(label_column));
    train_model_from_csv_with(csv_path, &config)
}

/// Train with every tunable taken from `config`
pub fn train_model_from_csv_with(
    csv_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<TrainingMetrics> {
    let csv_path = csv_path.as_ref();
    info!(
        path = %csv_path.display(),
        label = %config.training.label_column,
        model = %config.training.model_type,
        "Training from CSV"
    );

    let df = DataLoader::new()
        .with_delimiter(config.delimiter)
        .load_csv(csv_path)?;
    let mut engine = TrainEngine::new(config.training.clone());
    engine.fit(&df)?;

    let artifact = engine.into_artifact()?;
    let metrics = artifact.metrics.clone();
    ArtifactStore::new(&config.models_dir).save(&artifact)?;

    Ok(metrics)
}

/// Load the artifact stored in `models_dir`, if any
pub fn load_model(models_dir: impl AsRef<Path>) -> Result<Option<ModelArtifact>> {
    ArtifactStore::new(models_dir).load()
}

/// Predict every row of `csv_path` with `model`
pub fn predict_from_csv(
    model: Option<&ModelArtifact>,
    csv_path: impl AsRef<Path>,
) -> Result<(Vec<PredictionResult>, PredictionSummary)> {
    predict_from_csv_with(model, csv_path, &InferenceConfig::default())
}

pub fn predict_from_csv_with(
    model: Option<&ModelArtifact>,
    csv_path: impl AsRef<Path>,
    config: &InferenceConfig,
) -> Result<(Vec<PredictionResult>, PredictionSummary)> {
    let engine = InferenceEngine::new(model, config.clone())?;
    let df = DataLoader::new().load_csv(csv_path)?;
    engine.predict(&df)
}

/// Whether `file_name` has an accepted extension (case-insensitive)
pub fn is_allowed_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            ALLOWED_EXTENSIONS.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Path of `file_name` inside `data_dir`.
///
/// Only a bare file name is accepted; the file must exist.
pub fn resolve_data_file(data_dir: impl AsRef<Path>, file_name: &str) -> Result<PathBuf> {
    let mut components = Path::new(file_name).components();
    let is_bare_name = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !is_bare_name {
        return Err(NidsError::InvalidParameter {
            name: "file_name".to_string(),
            value: file_name.to_string(),
            reason: "must be a plain file name".to_string(),
        });
    }

    let path = data_dir.as_ref().join(file_name);
    if !path.is_file() {
        return Err(NidsError::FileNotFound(path.display().to_string()));
    }
    Ok(path)
}

/// `predictions_YYYYmmdd_HHMMSS.csv` for the given local time
pub fn predictions_file_name(at: NaiveDateTime) -> String {
    format!("predictions_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_is_allowed_file() {
        assert!(is_allowed_file("flows.csv"));
        assert!(is_allowed_file("FLOWS.CSV"));
        assert!(!is_allowed_file("flows.xlsx"));
        assert!(!is_allowed_file("csv"));
        assert!(!is_allowed_file(""));
    }

    #[test]
    fn test_predictions_file_name() {
        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap();
        assert_eq!(predictions_file_name(at), "predictions_20240309_140507.csv");
    }

    #[test]
    fn test_resolve_data_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("train.csv"), "a,label\n1,x\n").unwrap();

        assert_eq!(
            resolve_data_file(dir.path(), "train.csv").unwrap(),
            dir.path().join("train.csv")
        );
        assert!(matches!(
            resolve_data_file(dir.path(), "missing.csv"),
            Err(NidsError::FileNotFound(_))
        ));
        assert!(matches!(
            resolve_data_file(dir.path(), "../train.csv"),
            Err(NidsError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_predict_without_model() {
        let err = predict_from_csv(None, "does-not-matter.csv").unwrap_err();
        assert!(matches!(err, NidsError::ModelNotTrained));
    }
}
