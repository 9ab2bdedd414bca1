//! Model artifact persistence
//!
//! A trained model is stored as a single versioned JSON document together
//! with its feature schema and label encoding, so it can be applied to new
//! data without any other state.

mod artifact;
mod store;

pub use artifact::{ArtifactVersion, ModelArtifact, ARTIFACT_FORMAT};
pub use store::{ArtifactInfo, ArtifactStore, ARTIFACT_FILE_NAME};
