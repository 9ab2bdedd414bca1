//! Seeded, stratified train/holdout partitioning

use crate::error::{NidsError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::TrainingConfig;

/// Parameters of the holdout split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fraction of each class withheld for evaluation
    pub holdout_fraction: f64,
    /// Seed of the shuffle
    pub seed: u64,
    /// Minimum rows before a split is attempted
    pub min_rows: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.2,
            seed: 42,
            min_rows: 2,
        }
    }
}

impl SplitConfig {
    pub fn with_holdout_fraction(mut self, fraction: f64) -> Self {
        self.holdout_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl From<&TrainingConfig> for SplitConfig {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            holdout_fraction: config.holdout_fraction,
            seed: config.random_seed,
            min_rows: config.min_rows,
        }
    }
}

/// Row indices of each side of a split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// Training rows, ascending
    pub train: Vec<usize>,
    /// Holdout rows, ascending
    pub holdout: Vec<usize>,
    /// Class codes too small to contribute a holdout row
    pub skipped_classes: Vec<usize>,
}

/// Materialized training and holdout sets
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_holdout: Array2<f64>,
    pub y_holdout: Array1<f64>,
    pub indices: SplitIndices,
}

/// Stratified splitter; the same input and seed always give the same split
#[derive(Debug, Clone, Default)]
pub struct DatasetSplitter {
    config: SplitConfig,
}

impl DatasetSplitter {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Assign every row to train or holdout.
    ///
    /// Per class (in code order) the rows are shuffled and
    /// `max(1, round(n * fraction))`, capped at `n - 1`, go to holdout.
    /// Single-row classes stay in training.
    pub fn split_indices(&self, y: &Array1<f64>) -> Result<SplitIndices> {
        let n = y.len();
        if n < self.config.min_rows {
            return Err(NidsError::InsufficientData {
                required: self.config.min_rows,
                actual: n,
            });
        }

        // Group indices by class label
        let mut class_indices: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, &label) in y.iter().enumerate() {
            class_indices.entry(label.round().max(0.0) as usize).or_default().push(i);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut train = Vec::with_capacity(n);
        let mut holdout = Vec::new();
        let mut skipped_classes = Vec::new();

        for (class, mut indices) in class_indices {
            let size = indices.len();
            if size < 2 {
                skipped_classes.push(class);
                train.extend(indices);
                continue;
            }

            indices.shuffle(&mut rng);
            let holdout_size = ((size as f64 * self.config.holdout_fraction).round() as usize)
                .max(1)
                .min(size - 1);

            holdout.extend_from_slice(&indices[..holdout_size]);
            train.extend_from_slice(&indices[holdout_size..]);
        }

        if holdout.is_empty() {
            return Err(NidsError::InsufficientData {
                required: 2,
                actual: 1,
            });
        }

        train.sort_unstable();
        holdout.sort_unstable();

        debug!(
            train = train.len(),
            holdout = holdout.len(),
            skipped = skipped_classes.len(),
            "Split computed"
        );

        Ok(SplitIndices {
            train,
            holdout,
            skipped_classes,
        })
    }

    /// Split a feature matrix and its labels
    pub fn split(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<DatasetSplit> {
        if x.nrows() != y.len() {
            return Err(NidsError::ShapeError {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }

        let indices = self.split_indices(y)?;

        Ok(DatasetSplit {
            x_train: x.select(Axis(0), &indices.train),
            y_train: y.select(Axis(0), &indices.train),
            x_holdout: x.select(Axis(0), &indices.holdout),
            y_holdout: y.select(Axis(0), &indices.holdout),
            indices,
        })
    }
}
