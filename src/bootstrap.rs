//! Storage bootstrap

use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{NidsError, Result};

/// Create each directory in `paths` if it is missing.
///
/// Safe to call repeatedly. A path that exists but is not a directory is an
/// error.
pub fn ensure_directories<I, P>(paths: I) -> Result<()>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            debug!(path = %path.display(), "Directory present");
            continue;
        }
        if path.exists() {
            return Err(NidsError::ConfigError(format!(
                "{} exists and is not a directory",
                path.display()
            )));
        }
        fs::create_dir_all(path)?;
        info!(path = %path.display(), "Created directory");
    }
    Ok(())
}
