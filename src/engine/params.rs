//! Engine-agnostic generation parameters
//!
//! One parameter set covers both engines. Tuning that only one variant
//! understands is optional here; setting it while the other engine is
//! selected is an error surfaced by the adapter before anything is
//! downloaded or spawned.

use crate::error::{LipSyncError, LipSyncResult};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Preprocessing strategy for face-driven generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessMode {
    /// Keep the full frame
    Full,
    /// Crop to the detected face
    Crop,
    /// Aggressive crop for difficult inputs
    #[value(name = "extreme_crop")]
    ExtremeCrop,
}

impl Default for PreprocessMode {
    fn default() -> Self {
        Self::Full
    }
}

impl fmt::Display for PreprocessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Crop => write!(f, "crop"),
            Self::ExtremeCrop => write!(f, "extreme_crop"),
        }
    }
}

/// Engine-agnostic generation parameters
///
/// `None` means "not set by the user": the adapter falls back to its
/// configured default, or rejects the field if it belongs to the other
/// engine.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    /// Base generation resolution (256 or 512)
    pub resolution: u32,
    /// Output frame rate
    pub fps: u32,

    // SadTalker tuning
    pub preprocess: Option<PreprocessMode>,
    pub expression_scale: Option<f32>,
    pub still: Option<bool>,
    pub enhancer: Option<String>,

    // Wav2Lip tuning
    /// Padding around the detected face: top, bottom, left, right
    pub pads: Option<[u32; 4]>,
    /// Treat the input as a single still image
    pub static_face: Option<bool>,
    pub nosmooth: Option<bool>,
    pub wav2lip_batch_size: Option<u32>,
    pub face_det_batch_size: Option<u32>,
    pub resize_factor: Option<f32>,
    /// Crop rectangle x1, y1, x2, y2; -1 means "to the edge"
    pub crop: Option<[i64; 4]>,
}

const VALID_RESOLUTIONS: &[u32] = &[256, 512];

impl GenerationParams {
    /// Range- and shape-check every field, regardless of engine
    ///
    /// Runs before any resource acquisition or subprocess spawn so bad
    /// input fails fast with the offending flag named.
    pub fn validate(&self) -> LipSyncResult<()> {
        if !VALID_RESOLUTIONS.contains(&self.resolution) {
            return Err(invalid("resolution", "must be 256 or 512"));
        }
        if !(5..=60).contains(&self.fps) {
            return Err(invalid("fps", "must be between 5 and 60"));
        }
        if let Some(scale) = self.expression_scale {
            if !(scale > 0.0 && scale <= 3.0) {
                return Err(invalid(
                    "expression-scale",
                    "must be greater than 0 and at most 3",
                ));
            }
        }
        if let Some(factor) = self.resize_factor {
            if factor <= 0.0 {
                return Err(invalid("resize-factor", "must be greater than 0"));
            }
        }
        if let Some(size) = self.wav2lip_batch_size {
            if size == 0 {
                return Err(invalid("wav2lip-batch-size", "must be at least 1"));
            }
        }
        if let Some(size) = self.face_det_batch_size {
            if size == 0 {
                return Err(invalid("face-det-batch-size", "must be at least 1"));
            }
        }
        if let Some([x1, y1, x2, y2]) = self.crop {
            if x1 < 0 || y1 < 0 {
                return Err(invalid("crop", "x1 and y1 must be non-negative"));
            }
            if x2 != -1 && x2 <= x1 {
                return Err(invalid("crop", "x2 must be greater than x1 (or -1)"));
            }
            if y2 != -1 && y2 <= y1 {
                return Err(invalid("crop", "y2 must be greater than y1 (or -1)"));
            }
        }
        Ok(())
    }
}

fn invalid(flag: &str, reason: &str) -> LipSyncError {
    LipSyncError::InvalidParameter {
        flag: flag.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> GenerationParams {
        GenerationParams {
            resolution: 512,
            fps: 25,
            ..Default::default()
        }
    }

    fn flag_of(err: LipSyncError) -> String {
        match err {
            LipSyncError::InvalidParameter { flag, .. } => flag,
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn valid_defaults_pass() {
        base().validate().unwrap();
    }

    #[test]
    fn resolution_is_restricted() {
        let mut params = base();
        params.resolution = 1024;
        assert_eq!(flag_of(params.validate().unwrap_err()), "resolution");
    }

    #[test]
    fn fps_bounds() {
        let mut params = base();
        params.fps = 4;
        assert_eq!(flag_of(params.validate().unwrap_err()), "fps");

        params.fps = 61;
        assert_eq!(flag_of(params.validate().unwrap_err()), "fps");

        params.fps = 60;
        params.validate().unwrap();
    }

    #[test]
    fn expression_scale_bounds() {
        let mut params = base();
        params.expression_scale = Some(0.0);
        assert_eq!(flag_of(params.validate().unwrap_err()), "expression-scale");

        params.expression_scale = Some(3.5);
        assert!(params.validate().is_err());

        params.expression_scale = Some(1.4);
        params.validate().unwrap();
    }

    #[test]
    fn crop_shape_checked() {
        let mut params = base();
        params.crop = Some([10, 10, 5, 20]);
        assert_eq!(flag_of(params.validate().unwrap_err()), "crop");

        params.crop = Some([10, 10, -1, -1]);
        params.validate().unwrap();

        params.crop = Some([-2, 0, 10, 10]);
        assert!(params.validate().is_err());
    }

    #[test]
    fn batch_sizes_must_be_positive() {
        let mut params = base();
        params.wav2lip_batch_size = Some(0);
        assert!(params.validate().is_err());

        params.wav2lip_batch_size = Some(16);
        params.face_det_batch_size = Some(0);
        assert!(params.validate().is_err());
    }

    #[test]
    fn preprocess_mode_display() {
        assert_eq!(PreprocessMode::Full.to_string(), "full");
        assert_eq!(PreprocessMode::ExtremeCrop.to_string(), "extreme_crop");
    }
}
