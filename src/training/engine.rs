//! Training engine implementation

use crate::error::{NidsError, Result};
use crate::export::ModelArtifact;
use crate::preprocessing::{ColumnKind, FeatureSchema, LabelEncoder, SchemaNormalizer};
use super::decision_tree::DecisionTree;
use super::models::{Averaging, ClassificationScores, Classifier, TrainingMetrics};
use super::naive_bayes::GaussianNaiveBayes;
use super::random_forest::RandomForest;
use super::split::{DatasetSplitter, SplitConfig};
use super::{ModelType, TrainingConfig};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Enum to hold trained model variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    NaiveBayes(GaussianNaiveBayes),
}

impl TrainedModel {
    pub fn model_type(&self) -> ModelType {
        match self {
            TrainedModel::DecisionTree(_) => ModelType::DecisionTree,
            TrainedModel::RandomForest(_) => ModelType::RandomForest,
            TrainedModel::NaiveBayes(_) => ModelType::NaiveBayes,
        }
    }

    pub fn as_classifier(&self) -> &dyn Classifier {
        match self {
            TrainedModel::DecisionTree(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::NaiveBayes(m) => m,
        }
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.as_classifier().predict_proba(x)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_classifier().predict(x)
    }

    pub fn n_classes(&self) -> usize {
        self.as_classifier().n_classes()
    }

    /// Whether every learned parameter is finite; JSON has no inf or NaN
    pub fn is_finite(&self) -> bool {
        match self {
            TrainedModel::DecisionTree(m) => m.is_finite(),
            TrainedModel::RandomForest(m) => m.is_finite(),
            TrainedModel::NaiveBayes(m) => m.is_finite(),
        }
    }
}

/// Main training engine
///
/// Runs normalizer → splitter → classifier fit → holdout evaluation on a
/// labeled frame. A failed fit leaves the engine untrained.
#[derive(Debug, Clone)]
pub struct TrainEngine {
    config: TrainingConfig,
    normalizer: SchemaNormalizer,
    model: Option<TrainedModel>,
    metrics: Option<TrainingMetrics>,
    benign_classes: Vec<String>,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            normalizer: SchemaNormalizer::new(),
            model: None,
            metrics: None,
            benign_classes: Vec::new(),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit the configured classifier to `df` and evaluate it on the holdout split
    pub fn fit(&mut self, df: &DataFrame) -> Result<&TrainingMetrics> {
        let start = Instant::now();
        self.config.validate()?;

        let mut normalizer = SchemaNormalizer::new();
        let data = normalizer.fit_transform(df, &self.config.label_column)?;
        let encoder = normalizer
            .label_encoder()
            .cloned()
            .ok_or_else(|| NidsError::TrainingError("label encoder missing after fit".to_string()))?;

        if let Some(column) = normalizer.schema().and_then(non_finite_fill) {
            return Err(NidsError::TrainingError(format!(
                "fill value of column '{}' is not finite",
                column
            )));
        }

        if encoder.n_classes() < 2 {
            return Err(NidsError::TrainingError(format!(
                "training data needs at least two distinct labels, found {} ({})",
                encoder.n_classes(),
                encoder.classes().join(", ")
            )));
        }

        let split = DatasetSplitter::new(SplitConfig::from(&self.config))
            .split(&data.features, &data.labels)?;
        info!(
            train = split.y_train.len(),
            holdout = split.y_holdout.len(),
            skipped_classes = split.indices.skipped_classes.len(),
            "Split dataset"
        );
        for &code in &split.indices.skipped_classes {
            warn!(
                class = encoder.decode(code).unwrap_or("?"),
                "Class has too few rows for the holdout set"
            );
        }

        let model = self
            .train_model(&split.x_train, &split.y_train, encoder.n_classes())
            .map_err(|e| match e {
                NidsError::TrainingError(_) => e,
                other => NidsError::TrainingError(format!(
                    "{} fit failed: {}",
                    self.config.model_type, other
                )),
            })?;

        if !model.is_finite() {
            return Err(NidsError::TrainingError(format!(
                "{} fit produced non-finite parameters",
                self.config.model_type
            )));
        }

        let benign_classes = encoder.benign_classes(&self.config.benign_labels);
        let benign_codes: Vec<usize> = benign_classes
            .iter()
            .filter_map(|c| encoder.encode(c))
            .collect();
        let averaging = Averaging::for_classes(encoder.n_classes(), &benign_codes);

        let y_pred = model.predict(&split.x_holdout)?;
        let scores = ClassificationScores::compute(&split.y_holdout, &y_pred, averaging);

        let metrics = TrainingMetrics {
            accuracy: scores.accuracy,
            precision: scores.precision,
            recall: scores.recall,
            f1_score: scores.f1_score,
            averaging,
            positive_class: match averaging {
                Averaging::Binary { positive } => encoder.decode(positive).map(str::to_string),
                Averaging::Macro => None,
            },
            n_train: split.y_train.len(),
            n_holdout: split.y_holdout.len(),
            n_features: data.features.ncols(),
            n_classes: encoder.n_classes(),
            skipped_classes: split
                .indices
                .skipped_classes
                .iter()
                .filter_map(|&c| encoder.decode(c).map(str::to_string))
                .collect(),
            training_time_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            model = %self.config.model_type,
            accuracy = metrics.accuracy,
            f1 = metrics.f1_score,
            elapsed_secs = metrics.training_time_secs,
            "Model trained"
        );

        self.normalizer = normalizer;
        self.model = Some(model);
        self.benign_classes = benign_classes;
        self.metrics = Some(metrics);

        self.metrics
            .as_ref()
            .ok_or_else(|| NidsError::TrainingError("metrics missing after fit".to_string()))
    }

    fn train_model(&self, x: &Array2<f64>, y: &Array1<f64>, n_classes: usize) -> Result<TrainedModel> {
        if x.iter().any(|v| !v.is_finite()) {
            return Err(NidsError::TrainingError(
                "feature matrix contains non-finite values".to_string(),
            ));
        }
        debug!(model = %self.config.model_type, rows = x.nrows(), features = x.ncols(), "Fitting classifier");

        let model = match self.config.model_type {
            ModelType::DecisionTree => {
                let mut model = DecisionTree::new()
                    .with_max_depth_opt(self.config.max_depth)
                    .with_min_samples_split(self.config.min_samples_split)
                    .with_min_samples_leaf(self.config.min_samples_leaf)
                    .with_random_state(self.config.random_seed)
                    .with_n_classes(n_classes);
                model.fit(x, y)?;
                TrainedModel::DecisionTree(model)
            }
            ModelType::RandomForest => {
                let mut model = RandomForest::new(self.config.n_estimators)
                    .with_max_depth_opt(self.config.max_depth)
                    .with_min_samples_split(self.config.min_samples_split)
                    .with_min_samples_leaf(self.config.min_samples_leaf)
                    .with_random_state(self.config.random_seed)
                    .with_n_classes(n_classes);
                model.fit(x, y)?;
                TrainedModel::RandomForest(model)
            }
            ModelType::NaiveBayes => {
                let mut model = GaussianNaiveBayes::new()
                    .with_var_smoothing(self.config.var_smoothing)
                    .with_n_classes(n_classes);
                model.fit(x, y)?;
                TrainedModel::NaiveBayes(model)
            }
        };

        Ok(model)
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    /// Get training metrics
    pub fn metrics(&self) -> Option<&TrainingMetrics> {
        self.metrics.as_ref()
    }

    pub fn schema(&self) -> Option<&FeatureSchema> {
        self.normalizer.schema()
    }

    pub fn label_encoder(&self) -> Option<&LabelEncoder> {
        self.normalizer.label_encoder()
    }

    pub fn benign_classes(&self) -> &[String] {
        &self.benign_classes
    }

    /// Package the fitted model with everything inference needs
    pub fn into_artifact(self) -> Result<ModelArtifact> {
        let model = self.model.ok_or(NidsError::ModelNotTrained)?;
        let metrics = self.metrics.ok_or(NidsError::ModelNotTrained)?;
        let (schema, labels) = self.normalizer.into_parts().ok_or(NidsError::ModelNotTrained)?;

        Ok(ModelArtifact::new(
            model,
            schema,
            labels,
            self.benign_classes,
            self.config.label_column,
            metrics,
        ))
    }
}

/// First numeric column whose fill value is not finite
fn non_finite_fill(schema: &FeatureSchema) -> Option<&str> {
    schema.columns().iter().find_map(|column| match column.kind {
        ColumnKind::Numeric { fill_value } if !fill_value.is_finite() => Some(column.name.as_str()),
        _ => None,
    })
}
