//! Model training module
//!
//! Provides the classifiers used to detect malicious flows:
//! - Decision trees and Random Forests
//! - Gaussian Naive Bayes
//!
//! plus the seeded stratified splitter and the engine that ties them to the
//! schema normalizer.

mod config;
mod engine;
mod models;
pub mod split;
pub mod decision_tree;
pub mod random_forest;
pub mod naive_bayes;

pub use config::{TrainingConfig, ModelType};
pub use engine::{TrainEngine, TrainedModel};
pub use models::{Averaging, ClassificationScores, Classifier, TrainingMetrics};
pub use split::{DatasetSplit, DatasetSplitter, SplitConfig, SplitIndices};
pub use decision_tree::{DecisionTree, TreeNode, Criterion};
pub use random_forest::{RandomForest, MaxFeatures};
pub use naive_bayes::GaussianNaiveBayes;
