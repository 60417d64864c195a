//! SadTalker engine adapter
//!
//! Drives the OpenTalker/SadTalker inference entry point. SadTalker reads
//! its weights from a checkpoint directory, writes results into a
//! timestamped subfolder of the result dir, and takes its tuning as
//! long-form flags on `inference.py`.

use crate::config::schema::{GeneralConfig, SadTalkerConfig};
use crate::engine::adapter::{
    find_clips, unsupported, EngineAdapter, InferenceRun, Invocation, ResolvedResources,
};
use crate::engine::params::GenerationParams;
use crate::engine::EngineKind;
use crate::error::{LipSyncError, LipSyncResult};
use crate::resource::Resource;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::warn;

const ENGINE: &str = "sadtalker";
const RELEASE_BASE: &str = "https://github.com/OpenTalker/SadTalker/releases/download/v0.0.2-rc";

/// Checkpoint set published with the v0.0.2 release
const CHECKPOINTS: &[(&str, &str)] = &[
    (
        "SadTalker_V0.0.2_256.safetensors",
        "5c2d8d2da60a0df5844361c6229902529777746dcacd305dc272a82f567b88fa",
    ),
    (
        "SadTalker_V0.0.2_512.safetensors",
        "7c01eb5e92db84937b140d060ffa8763efbdfda5badfdfb52ca095fbbd74315e",
    ),
    (
        "mapping_00109-model.pth.tar",
        "f299ff0b815b0f55345ddf0959e1c9a4b5facdee85f0c8054ffc64fc371eade1",
    ),
    (
        "mapping_00229-model.pth.tar",
        "4a8034ba10a13afe7f31836982e18c5aa146fa61659a59cc952aa22857365ad6",
    ),
];

/// Adapter for the SadTalker talking-head engine
pub struct SadTalkerAdapter {
    config: SadTalkerConfig,
    python: String,
}

impl SadTalkerAdapter {
    pub fn new(config: SadTalkerConfig, general: &GeneralConfig) -> Self {
        Self {
            config,
            python: general.python.clone(),
        }
    }
}

#[async_trait]
impl EngineAdapter for SadTalkerAdapter {
    fn kind(&self) -> EngineKind {
        EngineKind::SadTalker
    }

    fn required_resources(&self) -> Vec<Resource> {
        let mut resources = vec![Resource::repository(ENGINE, "repo", &self.config.repo_url)];
        for (name, digest) in CHECKPOINTS {
            resources.push(Resource::checkpoint(
                ENGINE,
                *name,
                format!("{RELEASE_BASE}/{name}"),
                crate::checksum::DigestAlgorithm::Sha256,
                *digest,
            ));
        }
        resources
    }

    fn validate_params(&self, params: &GenerationParams) -> LipSyncResult<()> {
        params.validate()?;

        // Wav2Lip tuning has no meaning here; refuse rather than ignore
        if params.pads.is_some() {
            return Err(unsupported(self.kind(), "pads"));
        }
        if params.static_face.is_some() {
            return Err(unsupported(self.kind(), "no-static"));
        }
        if params.nosmooth.is_some() {
            return Err(unsupported(self.kind(), "nosmooth"));
        }
        if params.wav2lip_batch_size.is_some() {
            return Err(unsupported(self.kind(), "wav2lip-batch-size"));
        }
        if params.face_det_batch_size.is_some() {
            return Err(unsupported(self.kind(), "face-det-batch-size"));
        }
        if params.resize_factor.is_some() {
            return Err(unsupported(self.kind(), "resize-factor"));
        }
        if params.crop.is_some() {
            return Err(unsupported(self.kind(), "crop"));
        }
        Ok(())
    }

    fn build_invocation(
        &self,
        params: &GenerationParams,
        resources: &ResolvedResources,
        run: &InferenceRun,
    ) -> LipSyncResult<Invocation> {
        let repo = resources.repo()?;
        let checkpoints = resources.checkpoints_dir()?;

        let preprocess = params.preprocess.unwrap_or(self.config.preprocess);
        let expression_scale = params
            .expression_scale
            .unwrap_or(self.config.expression_scale);
        let still = params.still.unwrap_or(self.config.still);
        let enhancer = params
            .enhancer
            .clone()
            .or_else(|| self.config.enhancer.clone());

        let mut args = vec![
            repo.join("inference.py").display().to_string(),
            "--driven_audio".to_string(),
            run.audio.display().to_string(),
            "--source_image".to_string(),
            run.image.display().to_string(),
            "--checkpoint_dir".to_string(),
            checkpoints.display().to_string(),
            "--result_dir".to_string(),
            run.results_dir.display().to_string(),
            "--preprocess".to_string(),
            preprocess.to_string(),
            "--expression_scale".to_string(),
            expression_scale.to_string(),
            "--size".to_string(),
            params.resolution.to_string(),
            "--fps".to_string(),
            params.fps.to_string(),
        ];
        if still {
            args.push("--still".to_string());
        }
        if let Some(enhancer) = enhancer {
            args.push("--enhancer".to_string());
            args.push(enhancer);
        }

        Ok(Invocation {
            program: self.python.clone(),
            args,
            cwd: Some(repo.to_path_buf()),
            env: vec![("PYTHONPATH".to_string(), repo.display().to_string())],
        })
    }

    async fn locate_output(&self, results_dir: &Path) -> LipSyncResult<PathBuf> {
        let clips = find_clips(results_dir).await?;
        if clips.len() > 1 {
            warn!(
                "Multiple outputs in {}; selecting {}",
                results_dir.display(),
                clips[0].display()
            );
        }
        clips
            .into_iter()
            .next()
            .ok_or_else(|| LipSyncError::OutputNotFound {
                dir: results_dir.to_path_buf(),
                reason: "expected an .mp4 file".to_string(),
            })
    }
}
