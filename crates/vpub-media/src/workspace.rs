//! Scoped workspace directories for pipeline invocations.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::MediaResult;

/// A transient, exclusively-owned scratch directory for one pipeline
/// invocation.
///
/// The directory and everything inside it are removed when the workspace
/// is dropped, so early returns, errors, and task cancellation all clean
/// up without a dedicated teardown path. Call [`Workspace::close`] on the
/// happy path to surface removal failures in the logs.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a uniquely-named workspace under `base_dir`.
    ///
    /// `label` seeds the directory prefix so operators can attribute
    /// leftovers from a crashed process to a submission.
    pub async fn create(base_dir: impl AsRef<Path>, label: &str) -> MediaResult<Self> {
        let base_dir = base_dir.as_ref();
        tokio::fs::create_dir_all(base_dir).await?;

        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", label))
            .tempdir_in(base_dir)?;

        debug!(workspace = %dir.path().display(), "Created workspace");
        Ok(Self { dir })
    }

    /// The workspace root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A path for a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Remove the workspace now, logging (not propagating) failures.
    ///
    /// Cleanup problems must never override the outcome of the pipeline
    /// call that owned this workspace.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(workspace = %path.display(), error = %e, "Failed to remove workspace");
        }
    }
}
