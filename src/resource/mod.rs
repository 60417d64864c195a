//! Engine resource model and on-disk cache
//!
//! An engine needs two kinds of external artifacts before it can run: its
//! upstream repository (cloned code tree) and one or more pretrained
//! checkpoints. Both are declared as [`Resource`]s by the engine adapter and
//! materialized through [`ResourceCache::ensure`], which guarantees
//! at-most-one acquisition per resource identity even across concurrent
//! processes sharing a cache root.
//!
//! # Cache layout
//!
//! ```text
//! <root>/
//!   <engine>/
//!     repo/                      cloned engine code
//!     checkpoints/<name>         verified checkpoint artifact
//!     checkpoints/<name>.meta.json   sidecar record (digest, status, timestamp)
//!     .locks/<kind>-<name>.lock  per-resource acquisition lock
//! ```

pub mod cache;
pub mod entry;
pub mod fetch;

pub use cache::ResourceCache;
pub use entry::{CacheEntry, VerificationStatus};
pub use fetch::{Fetcher, HttpGitFetcher};

use crate::checksum::DigestAlgorithm;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of cacheable artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Cloned upstream code tree
    Repository,
    /// Pretrained weight file
    Checkpoint,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repository => write!(f, "repository"),
            Self::Checkpoint => write!(f, "checkpoint"),
        }
    }
}

/// Expected content digest for a checkpoint resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedDigest {
    pub algorithm: DigestAlgorithm,
    pub value: String,
}

/// A cacheable external artifact required by an engine
///
/// Immutable once declared by an adapter. Checkpoints carry an expected
/// digest; repositories are identified by their clone URL alone.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Engine this resource belongs to (cache subtree name)
    pub engine: String,
    pub kind: ResourceKind,
    /// Logical name; for checkpoints, also the cached file name
    pub name: String,
    /// HTTP URL (checkpoints) or git URL (repositories)
    pub source: String,
    pub digest: Option<ExpectedDigest>,
}

impl Resource {
    /// Declare a repository resource
    pub fn repository(
        engine: impl Into<String>,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            engine: engine.into(),
            kind: ResourceKind::Repository,
            name: name.into(),
            source: source.into(),
            digest: None,
        }
    }

    /// Declare a checkpoint resource with its expected digest
    pub fn checkpoint(
        engine: impl Into<String>,
        name: impl Into<String>,
        source: impl Into<String>,
        algorithm: DigestAlgorithm,
        digest: impl Into<String>,
    ) -> Self {
        Self {
            engine: engine.into(),
            kind: ResourceKind::Checkpoint,
            name: name.into(),
            source: source.into(),
            digest: Some(ExpectedDigest {
                algorithm,
                value: digest.into(),
            }),
        }
    }

    /// Stable identity string used in logs and error messages
    pub fn id(&self) -> String {
        format!("{}/{}/{}", self.engine, self.kind, self.name)
    }
}
