//! Self-describing model artifact
//!
//! Everything inference needs travels in one document: the fitted classifier,
//! the feature schema it was trained on, the label encoding and the training
//! metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::preprocessing::{FeatureSchema, LabelEncoder};
use crate::training::{ModelType, TrainedModel, TrainingMetrics};

/// Format tag written into every artifact
pub const ARTIFACT_FORMAT: &str = "nids-pipeline/model";

/// Semantic version of the artifact layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArtifactVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ArtifactVersion {
    /// Layout produced by this build
    pub const CURRENT: ArtifactVersion = ArtifactVersion::new(1, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Artifacts are readable when the major version matches
    pub fn is_compatible_with(&self, other: &ArtifactVersion) -> bool {
        self.major == other.major
    }
}

impl std::fmt::Display for ArtifactVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Default for ArtifactVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Leading fields checked before the full document is decoded
#[derive(Debug, Deserialize)]
struct ArtifactHeader {
    format: String,
    version: ArtifactVersion,
}

/// Trained model plus the exact schema and encoding it expects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format: String,
    pub version: ArtifactVersion,
    pub model: TrainedModel,
    pub schema: FeatureSchema,
    pub labels: LabelEncoder,
    /// Class names counted as non-anomalous
    pub benign_classes: Vec<String>,
    pub label_column: String,
    pub trained_at: DateTime<Utc>,
    pub metrics: TrainingMetrics,
}

impl ModelArtifact {
    pub fn new(
        model: TrainedModel,
        schema: FeatureSchema,
        labels: LabelEncoder,
        benign_classes: Vec<String>,
        label_column: impl Into<String>,
        metrics: TrainingMetrics,
    ) -> Self {
        Self {
            format: ARTIFACT_FORMAT.to_string(),
            version: ArtifactVersion::CURRENT,
            model,
            schema,
            labels,
            benign_classes,
            label_column: label_column.into(),
            trained_at: Utc::now(),
            metrics,
        }
    }

    pub fn model_type(&self) -> ModelType {
        self.model.model_type()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.schema.feature_names()
    }

    pub fn is_benign(&self, class: &str) -> bool {
        self.benign_classes.iter().any(|b| b == class)
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Decode an artifact, checking format tag and version first.
    ///
    /// The error is a human-readable reason; the caller attaches the path.
    pub fn from_json_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        let header: ArtifactHeader =
            serde_json::from_slice(bytes).map_err(|e| format!("unreadable header: {}", e))?;

        if header.format != ARTIFACT_FORMAT {
            return Err(format!(
                "format tag '{}' is not '{}'",
                header.format, ARTIFACT_FORMAT
            ));
        }
        if !header.version.is_compatible_with(&ArtifactVersion::CURRENT) {
            return Err(format!(
                "artifact version {} is not readable by version {}",
                header.version,
                ArtifactVersion::CURRENT
            ));
        }

        let artifact: ModelArtifact =
            serde_json::from_slice(bytes).map_err(|e| format!("malformed artifact: {}", e))?;

        if artifact.model.n_classes() != artifact.labels.n_classes() {
            return Err(format!(
                "model scores {} classes but the label encoder has {}",
                artifact.model.n_classes(),
                artifact.labels.n_classes()
            ));
        }

        Ok(artifact)
    }
}
