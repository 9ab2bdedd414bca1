//! Inference engine implementation
//!
//! Applies a stored artifact to a raw batch: the artifact's schema is locked
//! onto a normalizer, rows are scored in chunks (in parallel via rayon), and
//! the per-row results are folded into a summary.

use crate::error::{NidsError, Result};
use crate::export::ModelArtifact;
use crate::preprocessing::{CellStats, SchemaNormalizer};
use super::InferenceConfig;
use ndarray::{s, Array2};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

/// Prediction for one input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Zero-based position in the input batch
    pub row: usize,
    pub label: String,
    /// Probability of the predicted class
    pub confidence: f64,
}

/// Aggregate view of a prediction batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub num_rows: usize,
    /// Rows per predicted class
    pub class_counts: BTreeMap<String, usize>,
    /// Rows predicted as non-benign, when the artifact knows its benign classes
    pub anomaly_count: Option<usize>,
    pub anomaly_rate: Option<f64>,
    /// Categorical cells with a value never seen in training
    pub unknown_categories: usize,
    /// Empty cells filled from the schema
    pub imputed_cells: usize,
}

impl PredictionSummary {
    /// Fold per-row results into a summary
    pub fn from_results(results: &[PredictionResult], artifact: &ModelArtifact, stats: CellStats) -> Self {
        let mut class_counts = BTreeMap::new();
        for result in results {
            *class_counts.entry(result.label.clone()).or_insert(0usize) += 1;
        }

        let num_rows = results.len();
        let anomaly_count = if artifact.benign_classes.is_empty() {
            None
        } else {
            Some(results.iter().filter(|r| !artifact.is_benign(&r.label)).count())
        };
        let anomaly_rate = anomaly_count
            .filter(|_| num_rows > 0)
            .map(|count| count as f64 / num_rows as f64);

        Self {
            num_rows,
            class_counts,
            anomaly_count,
            anomaly_rate,
            unknown_categories: stats.unknown,
            imputed_cells: stats.imputed,
        }
    }
}

/// Scores raw batches with a loaded artifact
#[derive(Debug, Clone)]
pub struct InferenceEngine<'a> {
    config: InferenceConfig,
    artifact: &'a ModelArtifact,
    normalizer: SchemaNormalizer,
}

impl<'a> InferenceEngine<'a> {
    /// Bind to an artifact; `None` means no model has been trained yet
    pub fn new(artifact: Option<&'a ModelArtifact>, config: InferenceConfig) -> Result<Self> {
        let artifact = artifact.ok_or(NidsError::ModelNotTrained)?;
        Ok(Self {
            config,
            normalizer: SchemaNormalizer::locked(artifact.schema.clone()),
            artifact,
        })
    }

    pub fn artifact(&self) -> &ModelArtifact {
        self.artifact
    }

    /// Predict every row of `df`; any failure rejects the whole batch
    pub fn predict(&self, df: &DataFrame) -> Result<(Vec<PredictionResult>, PredictionSummary)> {
        let start = Instant::now();
        let (x, stats) = self.normalizer.transform_with_stats(df)?;
        let proba = self.predict_proba(&x)?;

        let results = proba
            .rows()
            .into_iter()
            .enumerate()
            .map(|(row, probs)| {
                let (code, confidence) = best_class(probs.iter().copied());
                let label = self
                    .artifact
                    .labels
                    .decode(code)
                    .ok_or_else(|| {
                        NidsError::ComputationError(format!("model produced unknown class code {}", code))
                    })?
                    .to_string();
                Ok(PredictionResult { row, label, confidence })
            })
            .collect::<Result<Vec<_>>>()?;

        let summary = PredictionSummary::from_results(&results, self.artifact, stats);

        info!(
            rows = summary.num_rows,
            anomalies = summary.anomaly_count.unwrap_or(0),
            unknown_categories = summary.unknown_categories,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch predicted"
        );

        Ok((results, summary))
    }

    /// Class probabilities for an already normalized matrix
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let model = self.artifact.model.as_classifier();
        let n_rows = x.nrows();
        let batch_size = self.config.batch_size.max(1);

        if !self.config.parallel || n_rows <= batch_size {
            return model.predict_proba(x);
        }

        let starts: Vec<usize> = (0..n_rows).step_by(batch_size).collect();
        let chunks: Vec<Array2<f64>> = starts
            .par_iter()
            .map(|&begin| {
                let end = (begin + batch_size).min(n_rows);
                model.predict_proba(&x.slice(s![begin..end, ..]).to_owned())
            })
            .collect::<Result<_>>()?;

        let views: Vec<_> = chunks.iter().map(|c| c.view()).collect();
        Ok(ndarray::concatenate(ndarray::Axis(0), &views)?)
    }
}

/// Most probable class and its probability; ties go to the lowest code
fn best_class<I: IntoIterator<Item = f64>>(probs: I) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (code, p) in probs.into_iter().enumerate() {
        if p > best.1 {
            best = (code, p);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_class() {
        assert_eq!(best_class([0.2, 0.8]), (1, 0.8));
        assert_eq!(best_class([0.5, 0.5]), (0, 0.5));
    }

    #[test]
    fn test_engine_requires_artifact() {
        let err = InferenceEngine::new(None, InferenceConfig::default()).unwrap_err();
        assert!(matches!(err, NidsError::ModelNotTrained));
    }
}
