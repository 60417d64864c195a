//! Wav2Lip engine adapter
//!
//! Drives the Rudrabha/Wav2Lip inference entry point. Wav2Lip takes its
//! checkpoint path explicitly, writes to a caller-chosen `--outfile`, and
//! additionally expects the S3FD face-detector weights at a hard-coded
//! location inside its own source tree, which `stage_resources` satisfies
//! from the cache.

use crate::checksum::DigestAlgorithm;
use crate::config::schema::{GeneralConfig, Wav2LipConfig};
use crate::engine::adapter::{
    unsupported, EngineAdapter, InferenceRun, Invocation, ResolvedResources,
};
use crate::engine::params::GenerationParams;
use crate::engine::EngineKind;
use crate::error::{LipSyncError, LipSyncResult};
use crate::resource::Resource;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

const ENGINE: &str = "wav2lip";
const OUTPUT_NAME: &str = "result.mp4";

const WAV2LIP_CHECKPOINT: &str = "wav2lip.pth";
const WAV2LIP_CHECKPOINT_URL: &str =
    "https://drive.google.com/uc?id=1cwRmZm4EUdS6WZfiP2spXK7pbybY2coh";
// Upstream still publishes MD5 sums for the GAN-era checkpoints
const WAV2LIP_CHECKPOINT_MD5: &str = "4e824f7185cde971ab154bb5f0745c84";

const S3FD_CHECKPOINT: &str = "s3fd.pth";
const S3FD_CHECKPOINT_URL: &str =
    "https://www.adrianbulat.com/downloads/python-fan/s3fd-619a316812.pth";
const S3FD_CHECKPOINT_SHA256: &str =
    "b888f804e635237397adbf3230528b39637cace7e86f3de8c2d83cf4f0f740ba";

/// Where the upstream face-detection code looks for S3FD weights,
/// relative to the repository root
const S3FD_REPO_RELATIVE: &[&str] = &["face_detection", "detection", "sfd", "s3fd.pth"];

/// Adapter for the Wav2Lip lip-sync engine
pub struct Wav2LipAdapter {
    config: Wav2LipConfig,
    python: String,
}

impl Wav2LipAdapter {
    pub fn new(config: Wav2LipConfig, general: &GeneralConfig) -> Self {
        Self {
            config,
            python: general.python.clone(),
        }
    }

    fn s3fd_repo_path(repo: &Path) -> PathBuf {
        S3FD_REPO_RELATIVE.iter().fold(repo.to_path_buf(), |p, seg| p.join(seg))
    }
}

#[async_trait]
impl EngineAdapter for Wav2LipAdapter {
    fn kind(&self) -> EngineKind {
        EngineKind::Wav2Lip
    }

    fn required_resources(&self) -> Vec<Resource> {
        vec![
            Resource::repository(ENGINE, "repo", &self.config.repo_url),
            Resource::checkpoint(
                ENGINE,
                WAV2LIP_CHECKPOINT,
                WAV2LIP_CHECKPOINT_URL,
                DigestAlgorithm::Md5,
                WAV2LIP_CHECKPOINT_MD5,
            ),
            Resource::checkpoint(
                ENGINE,
                S3FD_CHECKPOINT,
                S3FD_CHECKPOINT_URL,
                DigestAlgorithm::Sha256,
                S3FD_CHECKPOINT_SHA256,
            ),
        ]
    }

    fn validate_params(&self, params: &GenerationParams) -> LipSyncResult<()> {
        params.validate()?;

        // SadTalker tuning has no meaning here; refuse rather than ignore
        if params.preprocess.is_some() {
            return Err(unsupported(self.kind(), "preprocess"));
        }
        if params.expression_scale.is_some() {
            return Err(unsupported(self.kind(), "expression-scale"));
        }
        if params.still.is_some() {
            return Err(unsupported(self.kind(), "no-still"));
        }
        if params.enhancer.is_some() {
            return Err(unsupported(self.kind(), "enhancer"));
        }
        Ok(())
    }

    /// Mirror the S3FD weights into the spot the upstream tree hard-codes
    async fn stage_resources(&self, resources: &ResolvedResources) -> LipSyncResult<()> {
        let detector = resources.checkpoint(S3FD_CHECKPOINT)?;
        let target = Self::s3fd_repo_path(resources.repo()?);

        if target.exists() {
            return Ok(());
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LipSyncError::io(format!("creating {}", parent.display()), e))?;
        }
        debug!("Copying S3FD weights into {}", target.display());
        tokio::fs::copy(detector, &target)
            .await
            .map_err(|e| LipSyncError::io(format!("copying S3FD to {}", target.display()), e))?;
        Ok(())
    }

    fn build_invocation(
        &self,
        params: &GenerationParams,
        resources: &ResolvedResources,
        run: &InferenceRun,
    ) -> LipSyncResult<Invocation> {
        let repo = resources.repo()?;
        let checkpoint = resources.checkpoint(WAV2LIP_CHECKPOINT)?;
        let detector = resources.checkpoint(S3FD_CHECKPOINT)?;
        let outfile = run.results_dir.join(OUTPUT_NAME);

        let pads = params.pads.unwrap_or(self.config.pads);
        let static_face = params.static_face.unwrap_or(self.config.static_face);
        let nosmooth = params.nosmooth.unwrap_or(self.config.nosmooth);
        let wav2lip_batch = params
            .wav2lip_batch_size
            .or(self.config.wav2lip_batch_size);
        let face_det_batch = params
            .face_det_batch_size
            .or(self.config.face_det_batch_size);
        let resize_factor = params.resize_factor.unwrap_or(self.config.resize_factor);

        let mut args = vec![
            repo.join("inference.py").display().to_string(),
            "--checkpoint_path".to_string(),
            checkpoint.display().to_string(),
            "--face".to_string(),
            run.image.display().to_string(),
            "--audio".to_string(),
            run.audio.display().to_string(),
            "--outfile".to_string(),
            outfile.display().to_string(),
            "--fps".to_string(),
            params.fps.to_string(),
            "--pads".to_string(),
        ];
        args.extend(pads.iter().map(u32::to_string));

        if static_face {
            args.push("--static".to_string());
        }
        if nosmooth {
            args.push("--nosmooth".to_string());
        }
        if let Some(batch) = wav2lip_batch {
            args.push("--wav2lip_batch_size".to_string());
            args.push(batch.to_string());
        }
        if let Some(batch) = face_det_batch {
            args.push("--face_det_batch_size".to_string());
            args.push(batch.to_string());
        }
        if resize_factor != 1.0 {
            args.push("--resize_factor".to_string());
            args.push(resize_factor.to_string());
        }
        if let Some(crop) = params.crop {
            args.push("--crop".to_string());
            args.extend(crop.iter().map(i64::to_string));
        }

        Ok(Invocation {
            program: self.python.clone(),
            args,
            cwd: Some(repo.to_path_buf()),
            env: vec![
                ("PYTHONPATH".to_string(), repo.display().to_string()),
                (
                    "WAV2LIP_CHECKPOINT_PATH".to_string(),
                    checkpoint.display().to_string(),
                ),
                ("S3FD_PATH".to_string(), detector.display().to_string()),
            ],
        })
    }

    async fn locate_output(&self, results_dir: &Path) -> LipSyncResult<PathBuf> {
        let expected = results_dir.join(OUTPUT_NAME);
        if expected.exists() {
            Ok(expected)
        } else {
            Err(LipSyncError::OutputNotFound {
                dir: results_dir.to_path_buf(),
                reason: format!("expected {OUTPUT_NAME}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;

    fn adapter() -> Wav2LipAdapter {
        Wav2LipAdapter::new(Wav2LipConfig::default(), &GeneralConfig::default())
    }

    fn resources(repo: PathBuf) -> ResolvedResources {
        let mut resources = ResolvedResources::new(repo);
        resources.insert_checkpoint(
            WAV2LIP_CHECKPOINT,
            PathBuf::from("/cache/wav2lip/checkpoints/wav2lip.pth"),
        );
        resources.insert_checkpoint(
            S3FD_CHECKPOINT,
            PathBuf::from("/cache/wav2lip/checkpoints/s3fd.pth"),
        );
        resources
    }

    fn run() -> InferenceRun {
        InferenceRun {
            image: PathBuf::from("/in/face.png"),
            audio: PathBuf::from("/in/speech.wav"),
            results_dir: PathBuf::from("/work/results"),
        }
    }

    fn params() -> GenerationParams {
        GenerationParams {
            resolution: 512,
            fps: 25,
            ..Default::default()
        }
    }

    #[test]
    fn declares_repo_and_both_checkpoints() {
        let declared = adapter().required_resources();

        assert_eq!(declared.len(), 3);
        assert_eq!(declared[0].kind, ResourceKind::Repository);
        let wav2lip = &declared[1];
        assert_eq!(wav2lip.digest.as_ref().unwrap().algorithm, DigestAlgorithm::Md5);
        let s3fd = &declared[2];
        assert_eq!(s3fd.digest.as_ref().unwrap().algorithm, DigestAlgorithm::Sha256);
    }

    #[test]
    fn invocation_carries_required_flags() {
        let invocation = adapter()
            .build_invocation(&params(), &resources(PathBuf::from("/cache/wav2lip/repo")), &run())
            .unwrap();

        let line = invocation.display();
        assert!(line.contains("--checkpoint_path /cache/wav2lip/checkpoints/wav2lip.pth"));
        assert!(line.contains("--face /in/face.png"));
        assert!(line.contains("--audio /in/speech.wav"));
        assert!(line.contains("--outfile /work/results/result.mp4"));
        assert!(line.contains("--pads 0 10 0 0"));
        assert!(line.contains("--static"), "static mode defaults on");
        assert!(!line.contains("--nosmooth"));
        assert!(!line.contains("--resize_factor"), "1.0 is the upstream default");
        assert!(invocation
            .env
            .iter()
            .any(|(k, _)| k == "WAV2LIP_CHECKPOINT_PATH"));
    }

    #[test]
    fn tuning_flags_appear_when_set() {
        let mut p = params();
        p.pads = Some([5, 20, 5, 5]);
        p.nosmooth = Some(true);
        p.wav2lip_batch_size = Some(64);
        p.resize_factor = Some(2.0);
        p.crop = Some([0, 0, 200, -1]);

        let line = adapter()
            .build_invocation(&p, &resources(PathBuf::from("/r")), &run())
            .unwrap()
            .display();

        assert!(line.contains("--pads 5 20 5 5"));
        assert!(line.contains("--nosmooth"));
        assert!(line.contains("--wav2lip_batch_size 64"));
        assert!(line.contains("--resize_factor 2"));
        assert!(line.contains("--crop 0 0 200 -1"));
    }

    #[test]
    fn rejects_sadtalker_tuning() {
        let mut p = params();
        p.enhancer = Some("gfpgan".to_string());

        let err = adapter().validate_params(&p).unwrap_err();
        match err {
            LipSyncError::UnsupportedParameter { engine, flag } => {
                assert_eq!(engine, "wav2lip");
                assert_eq!(flag, "enhancer");
            }
            other => panic!("expected UnsupportedParameter, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stage_resources_mirrors_detector_into_repo() {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(&repo).unwrap();
        let detector = dir.path().join("s3fd.pth");
        std::fs::write(&detector, b"weights").unwrap();

        let mut resolved = ResolvedResources::new(repo.clone());
        resolved.insert_checkpoint(S3FD_CHECKPOINT, detector);

        adapter().stage_resources(&resolved).await.unwrap();

        let target = Wav2LipAdapter::s3fd_repo_path(&repo);
        assert_eq!(std::fs::read(&target).unwrap(), b"weights");

        // Second staging is a no-op on the existing copy
        adapter().stage_resources(&resolved).await.unwrap();
    }

    #[tokio::test]
    async fn locate_output_requires_fixed_name() {
        let dir = tempfile::TempDir::new().unwrap();

        let err = adapter().locate_output(dir.path()).await.unwrap_err();
        assert!(matches!(err, LipSyncError::OutputNotFound { .. }));

        std::fs::write(dir.path().join(OUTPUT_NAME), b"clip").unwrap();
        let found = adapter().locate_output(dir.path()).await.unwrap();
        assert!(found.ends_with(OUTPUT_NAME));
    }
}
