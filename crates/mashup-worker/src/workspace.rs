//! Per-run scratch directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

/// Temporary directory owned exclusively by one run.
///
/// Everything the run downloads or decodes lives here. The directory is
/// removed when the workspace is dropped, on every exit path including
/// cancellation.
#[derive(Debug)]
pub struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    /// Create a fresh `mashup_*` directory under `base`.
    pub fn create_in(base: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(base)?;
        let dir = tempfile::Builder::new().prefix("mashup_").tempdir_in(base)?;
        debug!(path = %dir.path().display(), "Created run workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory now and report failures instead of ignoring them.
    pub fn cleanup(self) {
        let path: PathBuf = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "Removed run workspace"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove run workspace"),
        }
    }
}
