//! Gaussian Naive Bayes classifier

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{NidsError, Result};
use super::models::{classes_in, Classifier};

/// Gaussian Naive Bayes Classifier
///
/// Per-class statistics are indexed by class code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    /// Mean of each feature for each class
    means: Vec<Vec<f64>>,
    /// Variance of each feature for each class
    variances: Vec<Vec<f64>>,
    /// Prior probability of each class
    priors: Vec<f64>,
    /// Portion of the largest feature variance added to every variance
    var_smoothing: f64,
    n_classes: usize,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            means: Vec::new(),
            variances: Vec::new(),
            priors: Vec::new(),
            var_smoothing: 1e-9,
            n_classes: 0,
        }
    }

    /// Set variance smoothing parameter
    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    /// Score at least `n_classes` classes
    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Fit the classifier
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(NidsError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(NidsError::TrainingError("cannot fit naive Bayes on zero samples".to_string()));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(NidsError::ComputationError("feature matrix contains non-finite values".to_string()));
        }

        self.n_classes = self.n_classes.max(classes_in(y));
        let n_classes = self.n_classes;

        let largest_var = x
            .var_axis(Axis(0), 0.0)
            .iter()
            .cloned()
            .fold(0.0f64, f64::max);
        let epsilon = if largest_var > 0.0 {
            self.var_smoothing * largest_var
        } else {
            self.var_smoothing
        };

        let mut counts = vec![0usize; n_classes];
        let mut means = vec![vec![0.0; n_features]; n_classes];
        let mut m2 = vec![vec![0.0; n_features]; n_classes];

        // Single-pass Welford's algorithm for mean and variance
        for (row, &label) in x.rows().into_iter().zip(y.iter()) {
            let class = label.round().max(0.0) as usize;
            counts[class] += 1;
            let count = counts[class] as f64;
            for (j, &val) in row.iter().enumerate() {
                let delta = val - means[class][j];
                means[class][j] += delta / count;
                let delta2 = val - means[class][j];
                m2[class][j] += delta * delta2;
            }
        }

        let mut variances = Vec::with_capacity(n_classes);
        for (class, class_m2) in m2.iter().enumerate() {
            let n_class = counts[class].max(1) as f64;
            let vars: Vec<f64> = class_m2.iter().map(|&s| s / n_class + epsilon).collect();
            if let Some(bad) = vars.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
                return Err(NidsError::ComputationError(format!(
                    "variance {} for class {} is not positive; raise var_smoothing",
                    bad, class
                )));
            }
            variances.push(vars);
        }

        self.priors = counts.iter().map(|&c| c as f64 / n_samples as f64).collect();
        self.means = means;
        self.variances = variances;

        Ok(())
    }

    /// Predict log probabilities
    pub fn predict_log_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.priors.is_empty() {
            return Err(NidsError::ModelNotTrained);
        }
        let n_features = self.means.first().map_or(0, Vec::len);
        if x.ncols() != n_features {
            return Err(NidsError::ShapeError {
                expected: format!("{} features", n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut log_probs = Array2::zeros((x.nrows(), self.n_classes));

        for (i, row) in x.rows().into_iter().enumerate() {
            for class in 0..self.n_classes {
                log_probs[[i, class]] = if self.priors[class] > 0.0 {
                    self.priors[class].ln() + self.log_likelihood(row, class)
                } else {
                    f64::NEG_INFINITY
                };
            }
        }

        // Normalize (log-sum-exp trick)
        for (i, mut row) in log_probs.rows_mut().into_iter().enumerate() {
            let max_val = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            if !max_val.is_finite() {
                return Err(NidsError::ComputationError(format!(
                    "row {} has no finite class likelihood",
                    i
                )));
            }
            let log_sum: f64 = row.iter().map(|&v| (v - max_val).exp()).sum::<f64>().ln();
            for val in row.iter_mut() {
                *val = *val - max_val - log_sum;
            }
        }

        Ok(log_probs)
    }

    /// Whether means, variances and priors are all finite
    pub fn is_finite(&self) -> bool {
        self.priors.iter().all(|p| p.is_finite())
            && self.means.iter().flatten().all(|m| m.is_finite())
            && self.variances.iter().flatten().all(|v| v.is_finite())
    }

    /// Predict probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(self.predict_log_proba(x)?.mapv(f64::exp))
    }

    fn log_likelihood(&self, x: ArrayView1<f64>, class: usize) -> f64 {
        x.iter()
            .zip(self.means[class].iter())
            .zip(self.variances[class].iter())
            .map(|((&xi, &mean), &var)| {
                // Log of Gaussian PDF
                -0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * PI).ln())
            })
            .sum()
    }

    /// Get class priors, indexed by class code
    pub fn class_priors(&self) -> &[f64] {
        &self.priors
    }
}

impl Classifier for GaussianNaiveBayes {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GaussianNaiveBayes::fit(self, x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        GaussianNaiveBayes::predict_proba(self, x)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}
