//! Training configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NidsError;

/// Classifier to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    /// Single CART decision tree
    DecisionTree,
    /// Bagged ensemble of decision trees
    RandomForest,
    /// Gaussian Naive Bayes
    NaiveBayes,
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::RandomForest
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelType::DecisionTree => "decision_tree",
            ModelType::RandomForest => "random_forest",
            ModelType::NaiveBayes => "naive_bayes",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelType {
    type Err = NidsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "decision_tree" | "tree" => Ok(ModelType::DecisionTree),
            "random_forest" | "forest" => Ok(ModelType::RandomForest),
            "naive_bayes" | "gaussian_nb" => Ok(ModelType::NaiveBayes),
            other => Err(NidsError::InvalidParameter {
                name: "model".to_string(),
                value: other.to_string(),
                reason: "expected decision_tree, random_forest or naive_bayes".to_string(),
            }),
        }
    }
}

/// Configuration for model training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Model type to train
    pub model_type: ModelType,

    /// Label column name
    pub label_column: String,

    /// Fraction of each class withheld for evaluation
    pub holdout_fraction: f64,

    /// Seed for the split and for any randomized model
    pub random_seed: u64,

    /// Minimum usable rows before a split is attempted
    pub min_rows: usize,

    /// Labels treated as benign traffic (case-insensitive)
    pub benign_labels: Vec<String>,

    // Tree-specific parameters
    /// Maximum depth of trees
    pub max_depth: Option<usize>,

    /// Minimum samples required to split a node
    pub min_samples_split: usize,

    /// Minimum samples per leaf
    pub min_samples_leaf: usize,

    /// Number of trees (random forest)
    pub n_estimators: usize,

    /// Variance floor added to every feature (naive Bayes)
    pub var_smoothing: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::RandomForest,
            label_column: "label".to_string(),
            holdout_fraction: 0.2,
            random_seed: 42,
            min_rows: 2,
            benign_labels: vec!["normal".to_string(), "benign".to_string()],
            max_depth: Some(16),
            min_samples_split: 2,
            min_samples_leaf: 1,
            n_estimators: 100,
            var_smoothing: 1e-9,
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration for the given label column
    pub fn new(label_column: impl Into<String>) -> Self {
        Self {
            label_column: label_column.into(),
            ..Default::default()
        }
    }

    /// Builder method to set model type
    pub fn with_model(mut self, model_type: ModelType) -> Self {
        self.model_type = model_type;
        self
    }

    /// Builder method to set number of estimators
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to set max depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Builder method to set the holdout fraction
    pub fn with_holdout_fraction(mut self, fraction: f64) -> Self {
        self.holdout_fraction = fraction;
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Builder method to set the benign labels
    pub fn with_benign_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.benign_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the naive Bayes variance floor
    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    /// Check that parameters are within range
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.label_column.trim().is_empty() {
            return Err(NidsError::InvalidParameter {
                name: "label_column".to_string(),
                value: self.label_column.clone(),
                reason: "must not be empty".to_string(),
            });
        }
        if !(self.holdout_fraction > 0.0 && self.holdout_fraction < 1.0) {
            return Err(NidsError::InvalidParameter {
                name: "holdout_fraction".to_string(),
                value: self.holdout_fraction.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        if self.min_rows < 2 {
            return Err(NidsError::InvalidParameter {
                name: "min_rows".to_string(),
                value: self.min_rows.to_string(),
                reason: "a split needs at least 2 rows".to_string(),
            });
        }
        if self.model_type == ModelType::RandomForest && self.n_estimators == 0 {
            return Err(NidsError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "a forest needs at least one tree".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.holdout_fraction, 0.2);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.label_column, "label");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = TrainingConfig::new("class")
            .with_model(ModelType::DecisionTree)
            .with_n_estimators(200)
            .with_max_depth(10)
            .with_benign_labels(["BENIGN"]);

        assert_eq!(config.model_type, ModelType::DecisionTree);
        assert_eq!(config.n_estimators, 200);
        assert_eq!(config.max_depth, Some(10));
        assert_eq!(config.benign_labels, vec!["BENIGN".to_string()]);
    }

    #[test]
    fn test_model_type_parse() {
        assert_eq!("random_forest".parse::<ModelType>().unwrap(), ModelType::RandomForest);
        assert_eq!("Tree".parse::<ModelType>().unwrap(), ModelType::DecisionTree);
        assert!("svm".parse::<ModelType>().is_err());
        assert_eq!(ModelType::NaiveBayes.to_string(), "naive_bayes");
    }

    #[test]
    fn test_validate_rejects_bad_fraction() {
        let config = TrainingConfig::default().with_holdout_fraction(1.0);
        assert!(matches!(config.validate(), Err(NidsError::InvalidParameter { .. })));
    }
}
