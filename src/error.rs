//! Error types for the lipsync pipeline
//!
//! All modules use `LipSyncResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lipsync operations
pub type LipSyncResult<T> = Result<T, LipSyncError>;

/// All errors that can occur in the pipeline
#[derive(Error, Debug)]
pub enum LipSyncError {
    // Parameter errors (fail before any acquisition or subprocess)
    #[error("Invalid parameter --{flag}: {reason}")]
    InvalidParameter { flag: String, reason: String },

    #[error("Parameter --{flag} is not supported by the {engine} engine")]
    UnsupportedParameter { engine: String, flag: String },

    #[error("Input file not found or unreadable: {0}")]
    InputNotFound(PathBuf),

    // Resource errors
    #[error(
        "Resource {resource} unavailable after {attempts} attempts: {reason}. \
         Delete {cache_path} and retry."
    )]
    ResourceUnavailable {
        resource: String,
        attempts: u32,
        reason: String,
        cache_path: PathBuf,
    },

    #[error("Checksum mismatch for {resource}: expected {expected}, got {actual}")]
    Integrity {
        resource: String,
        expected: String,
        actual: String,
    },

    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    // Pipeline stage errors
    #[error("Inference failed: {command}, exit code: {code}")]
    InferenceFailed { command: String, code: i32 },

    #[error("No output produced in {dir}: {reason}")]
    OutputNotFound { dir: PathBuf, reason: String },

    #[error("Upscaling failed: {reason} (raw clip preserved at {raw_clip})")]
    UpscaleFailed { reason: String, raw_clip: PathBuf },

    #[error("Stage timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("Run cancelled")]
    Cancelled,

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LipSyncError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Pipeline stage this error belongs to, for exit reporting
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            Self::InvalidParameter { .. }
            | Self::UnsupportedParameter { .. }
            | Self::InputNotFound(_) => Some("validate"),
            Self::ResourceUnavailable { .. } | Self::Integrity { .. } => Some("resources"),
            Self::InferenceFailed { .. } | Self::OutputNotFound { .. } => Some("inference"),
            Self::UpscaleFailed { .. } => Some("upscale"),
            _ => None,
        }
    }

    /// Whether the resource layer may retry this error internally
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Download { .. }
                | Self::CommandFailed { .. }
                | Self::CommandExecution { .. }
                | Self::Io { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::ResourceUnavailable { cache_path, .. } => Some(format!(
                "Remove the cached entry and retry: rm -rf {}",
                cache_path.display()
            )),
            Self::Integrity { resource, .. } => Some(format!(
                "The downloaded artifact for {resource} was discarded; rerun to download again"
            )),
            Self::UpscaleFailed { raw_clip, .. } => Some(format!(
                "The unscaled clip is usable as-is: {}",
                raw_clip.display()
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = LipSyncError::UnsupportedParameter {
            engine: "sadtalker".to_string(),
            flag: "pads".to_string(),
        };
        assert!(err.to_string().contains("--pads"));
        assert!(err.to_string().contains("sadtalker"));
    }

    #[test]
    fn error_stage_classification() {
        let err = LipSyncError::InputNotFound(PathBuf::from("/missing.png"));
        assert_eq!(err.stage(), Some("validate"));

        let err = LipSyncError::InferenceFailed {
            command: "python3 inference.py".to_string(),
            code: 1,
        };
        assert_eq!(err.stage(), Some("inference"));

        let err = LipSyncError::Internal("oops".to_string());
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn upscale_failed_keeps_raw_clip() {
        let err = LipSyncError::UpscaleFailed {
            reason: "exit code 1".to_string(),
            raw_clip: PathBuf::from("/tmp/raw.mp4"),
        };
        assert!(err.to_string().contains("/tmp/raw.mp4"));
        assert!(err.hint().unwrap().contains("/tmp/raw.mp4"));
    }

    #[test]
    fn resource_unavailable_names_recovery_path() {
        let err = LipSyncError::ResourceUnavailable {
            resource: "wav2lip/checkpoint/wav2lip.pth".to_string(),
            attempts: 3,
            reason: "connection refused".to_string(),
            cache_path: PathBuf::from("/cache/wav2lip/checkpoints/wav2lip.pth"),
        };
        assert!(err.to_string().contains("3 attempts"));
        assert!(err.hint().unwrap().contains("rm -rf"));
    }
}
