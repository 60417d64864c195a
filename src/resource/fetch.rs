//! Resource fetching backends
//!
//! The cache talks to the network through the [`Fetcher`] trait so tests
//! can substitute deterministic fakes. The real implementation downloads
//! checkpoints over HTTPS and clones repositories with the system `git`.

use crate::error::{LipSyncError, LipSyncResult};
use crate::resource::Resource;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Abstract acquisition backend
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download a checkpoint artifact into `dest` (an in-progress path;
    /// the cache verifies and renames it afterwards)
    async fn fetch_checkpoint(&self, resource: &Resource, dest: &Path) -> LipSyncResult<()>;

    /// Materialize a repository tree into `dest`
    async fn fetch_repository(&self, resource: &Resource, dest: &Path) -> LipSyncResult<()>;
}

/// Production fetcher: ureq for checkpoints, `git clone` for repositories
pub struct HttpGitFetcher {
    download_timeout: Duration,
}

impl HttpGitFetcher {
    pub fn new(download_timeout: Duration) -> Self {
        Self { download_timeout }
    }
}

impl Default for HttpGitFetcher {
    fn default() -> Self {
        // Checkpoints run to hundreds of MB; allow an hour per transfer
        Self::new(Duration::from_secs(3600))
    }
}

#[async_trait]
impl Fetcher for HttpGitFetcher {
    async fn fetch_checkpoint(&self, resource: &Resource, dest: &Path) -> LipSyncResult<()> {
        let url = resource.source.clone();
        let dest: PathBuf = dest.to_path_buf();
        let timeout = self.download_timeout;

        info!("Downloading {} from {}", resource.id(), url);

        // ureq is a blocking client; run the whole transfer off the runtime
        tokio::task::spawn_blocking(move || download_to_file(&url, &dest, timeout))
            .await
            .map_err(|e| LipSyncError::Internal(format!("download task panicked: {e}")))?
    }

    async fn fetch_repository(&self, resource: &Resource, dest: &Path) -> LipSyncResult<()> {
        info!("Cloning {} into {}", resource.source, dest.display());

        let output = Command::new("git")
            .args(["clone", "--depth", "1", &resource.source])
            .arg(dest)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| LipSyncError::command_failed(format!("git clone {}", resource.source), e))?;

        if output.status.success() {
            debug!("Clone complete: {}", dest.display());
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(LipSyncError::command_exec(
                format!("git clone {}", resource.source),
                stderr,
            ))
        }
    }
}

fn download_to_file(url: &str, dest: &Path, timeout: Duration) -> LipSyncResult<()> {
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into();

    let mut response = agent.get(url).call().map_err(|e| LipSyncError::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let mut file = std::fs::File::create(dest)
        .map_err(|e| LipSyncError::io(format!("creating {}", dest.display()), e))?;

    let mut reader = response.body_mut().as_reader();
    let bytes = std::io::copy(&mut reader, &mut file).map_err(|e| LipSyncError::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    debug!("Downloaded {} bytes to {}", bytes, dest.display());
    Ok(())
}
