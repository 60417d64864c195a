//! Content digests for downloaded artifacts
//!
//! Streams file contents through the hasher in fixed-size chunks so memory
//! use stays bounded regardless of checkpoint size. SHA-256 is the default;
//! MD5 remains available because some upstream engines still publish MD5
//! sums in their distribution metadata.

use crate::error::{LipSyncError, LipSyncResult};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const READ_BUF_SIZE: usize = 64 * 1024;

/// Digest algorithm used to verify a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Sha256,
    Md5,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Md5 => write!(f, "md5"),
        }
    }
}

/// Compute the hex digest of a file's full contents
pub fn digest_file(algorithm: DigestAlgorithm, path: &Path) -> LipSyncResult<String> {
    let file = File::open(path)
        .map_err(|e| LipSyncError::io(format!("opening {} for hashing", path.display()), e))?;

    match algorithm {
        DigestAlgorithm::Sha256 => stream_digest(file, Sha256::new(), path),
        DigestAlgorithm::Md5 => stream_digest(file, Md5::new(), path),
    }
}

fn stream_digest<D: Digest>(mut file: File, mut hasher: D, path: &Path) -> LipSyncResult<String> {
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| LipSyncError::io(format!("reading {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Check a file against an expected hex digest
///
/// Returns `false` on mismatch; errors only when the path is unreadable.
/// Comparison is case-insensitive since upstream metadata mixes cases.
pub fn verify(algorithm: DigestAlgorithm, path: &Path, expected: &str) -> LipSyncResult<bool> {
    let actual = digest_file(algorithm, path)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}
