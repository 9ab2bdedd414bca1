//! On-disk artifact store
//!
//! One artifact per models directory at `<dir>/model.json`. Saves go through
//! `model.json.tmp` and a rename, so a reader sees either the previous
//! artifact or the new one, never a partial file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{NidsError, Result};
use super::artifact::ModelArtifact;

/// File name of the current artifact
pub const ARTIFACT_FILE_NAME: &str = "model.json";

/// Metadata of the stored artifact, read without decoding it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub path: PathBuf,
    pub modified: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Artifact store rooted at a models directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Canonical artifact path
    pub fn path(&self) -> PathBuf {
        self.dir.join(ARTIFACT_FILE_NAME)
    }

    fn tmp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.tmp", ARTIFACT_FILE_NAME))
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Write `artifact`, replacing any previous one
    pub fn save(&self, artifact: &ModelArtifact) -> Result<PathBuf> {
        let bytes = artifact.to_json_bytes()?;
        fs::create_dir_all(&self.dir)?;

        let tmp_path = self.tmp_path();
        let path = self.path();

        if let Err(e) = write_synced(&tmp_path, &bytes) {
            // Only a regular file at the tmp path is ours to clean up
            if tmp_path.is_file() {
                let _ = fs::remove_file(&tmp_path);
            }
            return Err(e.into());
        }
        fs::rename(&tmp_path, &path)?;
        sync_dir(&self.dir);

        info!(
            path = %path.display(),
            bytes = bytes.len(),
            model = %artifact.model_type(),
            "Artifact written"
        );
        Ok(path)
    }

    /// Read the stored artifact; `None` if nothing has been saved yet
    pub fn load(&self) -> Result<Option<ModelArtifact>> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No artifact stored");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let artifact = ModelArtifact::from_json_bytes(&bytes).map_err(|reason| {
            warn!(path = %path.display(), %reason, "Artifact rejected");
            NidsError::CorruptArtifact {
                path: path.display().to_string(),
                reason,
            }
        })?;

        debug!(
            path = %path.display(),
            model = %artifact.model_type(),
            version = %artifact.version,
            "Artifact loaded"
        );
        Ok(Some(artifact))
    }

    /// Path, modification time and size of the stored artifact
    pub fn info(&self) -> Result<Option<ArtifactInfo>> {
        let path = self.path();
        let meta = match fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(ArtifactInfo {
            modified: DateTime::<Utc>::from(meta.modified()?),
            size_bytes: meta.len(),
            path,
        }))
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Persist the rename; not every platform can open a directory for syncing
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}
