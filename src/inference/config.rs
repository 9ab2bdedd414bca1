//! Inference configuration

use serde::{Deserialize, Serialize};

/// Configuration for batch inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Rows scored per chunk
    pub batch_size: usize,

    /// Score chunks in parallel with rayon
    pub parallel: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            parallel: true,
        }
    }
}

impl InferenceConfig {
    /// Builder method to set batch size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Builder method to toggle parallel scoring
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
