//! Post-processing upscale stage
//!
//! Wraps one ffmpeg invocation that raises the raw clip to the target
//! resolution with a high-quality resampling filter. The audio stream is
//! copied bit-for-bit, never re-encoded. A zero exit code alone is not
//! trusted; the output file must actually exist.

use crate::config::schema::UpscaleConfig;
use crate::engine::Invocation;
use crate::error::{LipSyncError, LipSyncResult};
use crate::pipeline::process;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// External upscaler wrapping the configured post-processor
pub struct Upscaler {
    config: UpscaleConfig,
    timeout: Duration,
}

impl Upscaler {
    pub fn new(config: UpscaleConfig, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    /// Build the post-processor command line for one clip
    pub fn build_invocation(&self, input: &Path, output: &Path) -> Invocation {
        Invocation {
            program: self.config.program.clone(),
            args: vec![
                "-y".to_string(),
                "-i".to_string(),
                input.display().to_string(),
                "-vf".to_string(),
                format!(
                    "scale={}:{}:flags={}",
                    self.config.width, self.config.height, self.config.filter
                ),
                "-c:v".to_string(),
                "libx264".to_string(),
                "-preset".to_string(),
                self.config.preset.clone(),
                "-crf".to_string(),
                self.config.crf.to_string(),
                // Copy the audio stream untouched
                "-c:a".to_string(),
                "copy".to_string(),
                output.display().to_string(),
            ],
            cwd: None,
            env: vec![],
        }
    }

    /// Upscale `input` into `output`
    ///
    /// On failure the input clip is left untouched so the caller can still
    /// use or re-process it; the error carries that path.
    pub async fn upscale(&self, input: &Path, output: &Path) -> LipSyncResult<()> {
        let invocation = self.build_invocation(input, output);
        info!(
            "Upscaling to {}x{}: {}",
            self.config.width,
            self.config.height,
            invocation.display()
        );

        let result = process::run_with_timeout(&invocation, self.timeout).await;
        let process_output = match result {
            Ok(out) => out,
            Err(e @ LipSyncError::Timeout { .. }) | Err(e @ LipSyncError::Cancelled) => {
                return Err(e)
            }
            Err(e) => {
                return Err(LipSyncError::UpscaleFailed {
                    reason: e.to_string(),
                    raw_clip: input.to_path_buf(),
                })
            }
        };

        if !process_output.success() {
            return Err(LipSyncError::UpscaleFailed {
                reason: format!(
                    "{} exited with code {}: {}",
                    self.config.program,
                    process_output.code,
                    process_output.stderr_tail(5)
                ),
                raw_clip: input.to_path_buf(),
            });
        }

        if !output.exists() {
            return Err(LipSyncError::UpscaleFailed {
                reason: format!("no output produced at {}", output.display()),
                raw_clip: input.to_path_buf(),
            });
        }

        Ok(())
    }
}
