//! Pipeline orchestration
//!
//! One linear pass per run: validate inputs → ensure resources → run
//! inference in a fresh workspace → optionally upscale → emit the final
//! artifact. No stage is re-entered and the pipeline itself never retries;
//! bounded retries live in the resource layer only. Failures carry the
//! stage they happened in, and an upscale failure still hands the caller
//! the raw clip instead of throwing work away.

use crate::config::{Config, ConfigManager};
use crate::engine::{
    create_adapter, EngineAdapter, EngineKind, GenerationParams, InferenceRun, ResolvedResources,
};
use crate::error::{LipSyncError, LipSyncResult};
use crate::pipeline::process;
use crate::pipeline::upscale::Upscaler;
use crate::pipeline::workspace::Workspace;
use crate::resource::{HttpGitFetcher, ResourceCache, ResourceKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Inputs for one pipeline run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub image: PathBuf,
    pub audio: PathBuf,
    pub output: PathBuf,
    pub engine: EngineKind,
    pub params: GenerationParams,
    /// Run the upscale stage
    pub upscale: bool,
    /// Retain the per-run workspace instead of removing it
    pub keep_workspace: bool,
}

/// What a completed run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub final_clip: PathBuf,
    /// Raw engine output, when it still exists on disk after the run
    pub raw_clip: Option<PathBuf>,
    /// Retained workspace path, when retention was requested
    pub workspace: Option<PathBuf>,
}

/// Drives the generation pipeline end to end
pub struct LipSyncPipeline {
    config: Config,
    cache: ResourceCache,
}

impl LipSyncPipeline {
    /// Build a pipeline (and its resource cache) from configuration
    pub fn new(config: Config) -> Self {
        let root = config
            .cache
            .root
            .clone()
            .unwrap_or_else(ConfigManager::default_cache_root);
        let fetcher = Arc::new(HttpGitFetcher::new(Duration::from_secs(
            config.cache.download_timeout_secs,
        )));
        let cache = ResourceCache::new(root, fetcher)
            .with_retry_policy(
                config.cache.download_retries,
                Duration::from_secs(config.cache.retry_backoff_secs),
            )
            .with_verify_on_reuse(config.cache.verify_on_reuse);
        Self { config, cache }
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Run with the adapter selected by the request's engine tag
    pub async fn run(&self, request: &RunRequest) -> LipSyncResult<RunOutcome> {
        let adapter = create_adapter(request.engine, &self.config);
        self.run_with_adapter(&*adapter, request).await
    }

    /// Run with an explicit adapter
    pub async fn run_with_adapter(
        &self,
        adapter: &dyn EngineAdapter,
        request: &RunRequest,
    ) -> LipSyncResult<RunOutcome> {
        // Validating: parameters first, then inputs; nothing has been
        // downloaded or spawned yet when these fail
        adapter.validate_params(&request.params)?;
        check_input(&request.image).await?;
        check_input(&request.audio).await?;
        ensure_parent_dir(&request.output).await?;

        // ResourcesReady
        let resources = self.ensure_resources(adapter).await?;
        adapter.stage_resources(&resources).await?;

        // Inferring
        let workspace = Workspace::create(
            self.config.pipeline.workspace_root.as_deref(),
            request.keep_workspace,
        )
        .await?;
        info!("Workspace: {}", workspace.path().display());

        let run_ctx = InferenceRun {
            image: request.image.clone(),
            audio: request.audio.clone(),
            results_dir: workspace.results_dir(),
        };
        let invocation = adapter.build_invocation(&request.params, &resources, &run_ctx)?;

        info!("Running {} inference", adapter.kind());
        let inference = process::run_with_timeout(
            &invocation,
            Duration::from_secs(self.config.pipeline.inference_timeout_secs),
        )
        .await?;

        if !inference.success() {
            warn!("Inference stderr tail:\n{}", inference.stderr_tail(20));
            return Err(LipSyncError::InferenceFailed {
                command: invocation.display(),
                code: inference.code,
            });
        }

        let raw_clip = adapter.locate_output(&run_ctx.results_dir).await?;
        info!("Raw clip: {}", raw_clip.display());

        // Upscaling (optional), then Done
        if request.upscale {
            self.upscale_stage(workspace, &raw_clip, request).await
        } else {
            move_file(&raw_clip, &request.output).await?;
            let kept = workspace.finish().await?;
            Ok(RunOutcome {
                final_clip: request.output.clone(),
                raw_clip: Some(request.output.clone()),
                workspace: kept,
            })
        }
    }

    async fn upscale_stage(
        &self,
        workspace: Workspace,
        raw_clip: &Path,
        request: &RunRequest,
    ) -> LipSyncResult<RunOutcome> {
        let upscaler = Upscaler::new(
            self.config.upscale.clone(),
            Duration::from_secs(self.config.pipeline.upscale_timeout_secs),
        );

        if let Err(e) = upscaler.upscale(raw_clip, &request.output).await {
            // The raw clip lives in the workspace; move it next to the
            // requested output so cleanup cannot destroy completed work
            let preserved = preserved_raw_path(&request.output);
            move_file(raw_clip, &preserved).await?;
            if let Some(dir) = workspace.finish().await? {
                info!("Workspace retained: {}", dir.display());
            }
            return Err(match e {
                LipSyncError::UpscaleFailed { reason, .. } => LipSyncError::UpscaleFailed {
                    reason,
                    raw_clip: preserved,
                },
                other => {
                    warn!("Raw clip preserved at {}", preserved.display());
                    other
                }
            });
        }

        let kept = workspace.finish().await?;
        Ok(RunOutcome {
            final_clip: request.output.clone(),
            raw_clip: kept.is_some().then(|| raw_clip.to_path_buf()),
            workspace: kept,
        })
    }

    /// Ensure every declared resource and collect the resulting paths
    async fn ensure_resources(
        &self,
        adapter: &dyn EngineAdapter,
    ) -> LipSyncResult<ResolvedResources> {
        let mut resolved = ResolvedResources::default();
        for resource in adapter.required_resources() {
            let path = self.cache.ensure(&resource).await?;
            match resource.kind {
                ResourceKind::Repository => resolved.set_repo(path),
                ResourceKind::Checkpoint => {
                    resolved.insert_checkpoint(resource.name.clone(), path)
                }
            }
        }
        Ok(resolved)
    }
}

/// Open, not just stat: catches permission problems as well as absence
async fn check_input(path: &Path) -> LipSyncResult<()> {
    match tokio::fs::File::open(path).await {
        Ok(file) => {
            let meta = file
                .metadata()
                .await
                .map_err(|e| LipSyncError::io(format!("reading metadata of {}", path.display()), e))?;
            if meta.is_file() {
                Ok(())
            } else {
                Err(LipSyncError::InputNotFound(path.to_path_buf()))
            }
        }
        Err(_) => Err(LipSyncError::InputNotFound(path.to_path_buf())),
    }
}

async fn ensure_parent_dir(output: &Path) -> LipSyncResult<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LipSyncError::io(format!("creating {}", parent.display()), e))?;
        }
    }
    Ok(())
}

/// Where an orphaned raw clip lands when upscaling fails:
/// `out.mp4` → `out.raw.mp4`
fn preserved_raw_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let ext = output
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".to_string());
    output.with_file_name(format!("{stem}.raw.{ext}"))
}

/// Rename when possible, copy+remove across filesystems
async fn move_file(src: &Path, dst: &Path) -> LipSyncResult<()> {
    if tokio::fs::rename(src, dst).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(src, dst)
        .await
        .map_err(|e| LipSyncError::io(format!("copying {} to {}", src.display(), dst.display()), e))?;
    tokio::fs::remove_file(src)
        .await
        .map_err(|e| LipSyncError::io(format!("removing {}", src.display()), e))?;
    Ok(())
}
