//! Cache entry sidecar records
//!
//! Each cached checkpoint gets a `<name>.meta.json` sidecar next to the
//! artifact recording what was verified and when. The sidecar is written
//! with `unverified` status while a download is in flight and flipped to
//! `verified` only after the artifact has been hashed and atomically
//! renamed into place, so a crash mid-transfer can never leave a
//! `verified` record behind.

use crate::checksum::DigestAlgorithm;
use crate::error::{LipSyncError, LipSyncResult};
use crate::resource::{Resource, ResourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Verification state of a cached artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Acquisition in flight; artifact must not be trusted
    Unverified,
    /// Artifact matched its expected digest at acquisition time
    Verified,
    /// Last acquisition attempt ended in a digest mismatch
    Failed,
}

/// Persisted record for one cached resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub engine: String,
    pub kind: ResourceKind,
    pub name: String,
    pub status: VerificationStatus,
    /// Digest algorithm and value recorded at verification time
    pub algorithm: Option<DigestAlgorithm>,
    pub digest: Option<String>,
    pub acquired_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Build an entry for a resource in the given state
    pub fn new(resource: &Resource, status: VerificationStatus, digest: Option<String>) -> Self {
        Self {
            engine: resource.engine.clone(),
            kind: resource.kind,
            name: resource.name.clone(),
            status,
            algorithm: resource.digest.as_ref().map(|d| d.algorithm),
            digest,
            acquired_at: Utc::now(),
        }
    }

    /// Sidecar path for an artifact: `<artifact>.meta.json`
    pub fn sidecar_path(artifact: &Path) -> PathBuf {
        let mut name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str(".meta.json");
        artifact.with_file_name(name)
    }

    /// Load a sidecar record, if one exists
    ///
    /// An unparseable sidecar is treated as absent rather than fatal; the
    /// caller will re-acquire and rewrite it.
    pub fn load(path: &Path) -> LipSyncResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .map_err(|e| LipSyncError::io(format!("reading cache entry {}", path.display()), e))?;
        match serde_json::from_str(&content) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!("Discarding corrupt cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    /// Write the sidecar record
    pub fn save(&self, path: &Path) -> LipSyncResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| LipSyncError::io(format!("writing cache entry {}", path.display()), e))
    }

    /// Whether this entry can be reused without re-acquisition
    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }
}
