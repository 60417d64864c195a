//! Configuration schema
//!
//! Configuration is stored at `~/.config/lipsync/config.toml`. Every field
//! has a default, so a missing file or a partial file both work; CLI flags
//! override whatever the file says.

use crate::engine::params::PreprocessMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Resource cache settings
    pub cache: CacheConfig,

    /// Pipeline defaults
    pub pipeline: PipelineConfig,

    /// Upscale stage settings
    pub upscale: UpscaleConfig,

    /// SadTalker engine settings
    pub sadtalker: SadTalkerConfig,

    /// Wav2Lip engine settings
    pub wav2lip: Wav2LipConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Python interpreter used to run engine inference scripts
    pub python: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
        }
    }
}

/// Resource cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root directory (defaults to the platform cache dir)
    pub root: Option<PathBuf>,

    /// Re-hash cached checkpoints before reusing them in a new run
    pub verify_on_reuse: bool,

    /// Bounded retry count for downloads and clones
    pub download_retries: u32,

    /// Base backoff between retries, doubled per attempt
    pub retry_backoff_secs: u64,

    /// Per-transfer timeout for checkpoint downloads
    pub download_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            verify_on_reuse: true,
            download_retries: 3,
            retry_backoff_secs: 2,
            download_timeout_secs: 3600,
        }
    }
}

/// Pipeline defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frames per second for the generated video
    pub fps: u32,

    /// Base generation resolution before optional upscaling
    pub resolution: u32,

    /// Maximum wall-clock time for the inference subprocess
    pub inference_timeout_secs: u64,

    /// Maximum wall-clock time for the upscale subprocess
    pub upscale_timeout_secs: u64,

    /// Keep per-run workspaces instead of removing them
    pub keep_workspace: bool,

    /// Parent directory for per-run workspaces (defaults to the system
    /// temp dir)
    pub workspace_root: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fps: 25,
            resolution: 512,
            inference_timeout_secs: 1800,
            upscale_timeout_secs: 600,
            keep_workspace: false,
            workspace_root: None,
        }
    }
}

/// Upscale stage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpscaleConfig {
    /// Run the upscale stage at all
    pub enabled: bool,

    /// Target width
    pub width: u32,

    /// Target height
    pub height: u32,

    /// ffmpeg scaling filter
    pub filter: String,

    /// x264 preset
    pub preset: String,

    /// x264 constant rate factor
    pub crf: u32,

    /// Post-processor binary
    pub program: String,
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 1920,
            height: 1080,
            filter: "lanczos".to_string(),
            preset: "medium".to_string(),
            crf: 18,
            program: "ffmpeg".to_string(),
        }
    }
}

/// SadTalker engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SadTalkerConfig {
    /// Upstream repository to clone
    pub repo_url: String,

    /// Default preprocessing strategy
    pub preprocess: PreprocessMode,

    /// Default expression scale factor
    pub expression_scale: f32,

    /// Default still mode (suppress extra head motion)
    pub still: bool,

    /// Default face enhancer (e.g. "gfpgan")
    pub enhancer: Option<String>,
}

impl Default for SadTalkerConfig {
    fn default() -> Self {
        Self {
            repo_url: "https://github.com/OpenTalker/SadTalker.git".to_string(),
            preprocess: PreprocessMode::Full,
            expression_scale: 1.0,
            still: true,
            enhancer: None,
        }
    }
}

/// Wav2Lip engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Wav2LipConfig {
    /// Upstream repository to clone
    pub repo_url: String,

    /// Default padding around the detected face (top, bottom, left, right)
    pub pads: [u32; 4],

    /// Default static mode (treat the input as a single still image)
    #[serde(rename = "static")]
    pub static_face: bool,

    /// Disable smoothing of face detections over time
    pub nosmooth: bool,

    /// Batch size for the lip-sync model
    pub wav2lip_batch_size: Option<u32>,

    /// Batch size for the face detector
    pub face_det_batch_size: Option<u32>,

    /// Resize factor applied before inference
    pub resize_factor: f32,
}

impl Default for Wav2LipConfig {
    fn default() -> Self {
        Self {
            repo_url: "https://github.com/Rudrabha/Wav2Lip.git".to_string(),
            pads: [0, 10, 0, 0],
            static_face: true,
            nosmooth: false,
            wav2lip_batch_size: None,
            face_det_batch_size: None,
            resize_factor: 1.0,
        }
    }
}
