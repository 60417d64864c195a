//! Per-run scoped temporary directories
//!
//! Every pipeline run gets its own uniquely-named directory so concurrent
//! runs on one machine never collide, and no directory is ever reused.
//! Removal is guaranteed on every exit path: explicit [`Workspace::finish`]
//! on the happy path, a best-effort `Drop` on error paths. The `keep` flag
//! turns removal into reporting.

use crate::error::{LipSyncError, LipSyncResult};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Scoped temporary directory for one pipeline run
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    keep: bool,
    finished: bool,
}

impl Workspace {
    /// Create a fresh workspace under `parent` (system temp dir if `None`)
    pub async fn create(parent: Option<&Path>, keep: bool) -> LipSyncResult<Self> {
        let parent = parent
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);
        let dir = parent.join(format!("lipsync-run-{}", Uuid::new_v4()));

        tokio::fs::create_dir_all(dir.join("results"))
            .await
            .map_err(|e| LipSyncError::io(format!("creating workspace {}", dir.display()), e))?;

        debug!("Workspace created: {}", dir.display());
        Ok(Self {
            dir,
            keep,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Directory the engine writes its results into
    pub fn results_dir(&self) -> PathBuf {
        self.dir.join("results")
    }

    pub fn keep(&self) -> bool {
        self.keep
    }

    /// Tear down (or report) the workspace
    ///
    /// Returns the retained path when `keep` was requested, `None` after
    /// removal.
    pub async fn finish(mut self) -> LipSyncResult<Option<PathBuf>> {
        self.finished = true;
        if self.keep {
            debug!("Workspace retained: {}", self.dir.display());
            return Ok(Some(self.dir.clone()));
        }
        tokio::fs::remove_dir_all(&self.dir)
            .await
            .map_err(|e| LipSyncError::io(format!("removing workspace {}", self.dir.display()), e))?;
        debug!("Workspace removed: {}", self.dir.display());
        Ok(None)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.finished || self.keep {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            warn!("Failed to remove workspace {}: {}", self.dir.display(), e);
        }
    }
}
