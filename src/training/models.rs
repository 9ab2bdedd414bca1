//! Classifier trait and evaluation metrics

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// How precision, recall and F1 are aggregated across classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Averaging {
    /// Scores of a single positive class (two-class problems)
    Binary { positive: usize },
    /// Unweighted mean over classes seen in truth or predictions
    Macro,
}

impl Averaging {
    /// Pick the averaging mode for `n_classes` classes.
    ///
    /// With two classes the positive class is the non-benign one when exactly
    /// one class is benign, otherwise code 1.
    pub fn for_classes(n_classes: usize, benign_codes: &[usize]) -> Self {
        if n_classes != 2 {
            return Averaging::Macro;
        }
        let positive = match benign_codes {
            [benign] => 1 - (*benign).min(1),
            _ => 1,
        };
        Averaging::Binary { positive }
    }
}

/// Holdout evaluation of a freshly trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub averaging: Averaging,
    /// Name of the positive class under binary averaging
    pub positive_class: Option<String>,
    pub n_train: usize,
    pub n_holdout: usize,
    pub n_features: usize,
    pub n_classes: usize,
    /// Classes with too few rows to appear in the holdout set
    pub skipped_classes: Vec<String>,
    /// Training time in seconds
    pub training_time_secs: f64,
}

/// Accuracy, precision, recall and F1 for one prediction run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationScores {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

impl ClassificationScores {
    /// Score `y_pred` against `y_true`; both hold integer class codes
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>, averaging: Averaging) -> Self {
        let n = y_true.len();
        if n == 0 {
            return Self {
                accuracy: 0.0,
                precision: 0.0,
                recall: 0.0,
                f1_score: 0.0,
            };
        }

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < 0.5)
            .count();
        let accuracy = correct as f64 / n as f64;

        let (precision, recall, f1_score) = match averaging {
            Averaging::Binary { positive } => class_scores(y_true, y_pred, positive),
            Averaging::Macro => {
                let mut classes: Vec<usize> = y_true
                    .iter()
                    .chain(y_pred.iter())
                    .map(|v| v.round() as usize)
                    .collect();
                classes.sort_unstable();
                classes.dedup();

                let k = classes.len() as f64;
                let (p, r, f) = classes
                    .iter()
                    .map(|&c| class_scores(y_true, y_pred, c))
                    .fold((0.0, 0.0, 0.0), |acc, s| (acc.0 + s.0, acc.1 + s.1, acc.2 + s.2));
                (p / k, r / k, f / k)
            }
        };

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
        }
    }
}

/// One-vs-rest precision, recall and F1 for class `class`
fn class_scores(y_true: &Array1<f64>, y_pred: &Array1<f64>, class: usize) -> (f64, f64, f64) {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        let t_pos = t.round() as usize == class;
        let p_pos = p.round() as usize == class;
        match (t_pos, p_pos) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        0.0
    };
    let recall = if tp + fn_ > 0 {
        tp as f64 / (tp + fn_) as f64
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    (precision, recall, f1)
}

impl TrainingMetrics {
    /// One-line report, e.g. `Accuracy: 0.9500, F1: 0.9474`
    pub fn summary_line(&self) -> String {
        format!("Accuracy: {:.4}, F1: {:.4}", self.accuracy, self.f1_score)
    }
}

/// Common interface for the supported classifiers.
///
/// Labels are class codes `0..n_classes` stored as `f64`.
pub trait Classifier: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Per-class probabilities, one row per sample, columns in code order
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Number of classes the model scores
    fn n_classes(&self) -> usize;

    /// Most probable class code per sample
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.rows().into_iter().map(|row| argmax(row.iter().copied()) as f64).collect())
    }
}

/// Index of the largest value; ties go to the lowest index
pub(crate) fn argmax<I: IntoIterator<Item = f64>>(values: I) -> usize {
    let mut best = 0;
    let mut best_val = f64::NEG_INFINITY;
    for (i, v) in values.into_iter().enumerate() {
        if v > best_val {
            best = i;
            best_val = v;
        }
    }
    best
}

/// Number of classes implied by a label vector (highest code + 1)
pub(crate) fn classes_in(y: &Array1<f64>) -> usize {
    y.iter().map(|v| v.round().max(0.0) as usize + 1).max().unwrap_or(0)
}
