//! Engine adapter capability trait
//!
//! Each supported inference engine implements this trait: declare the
//! resources it needs, turn engine-agnostic parameters into its exact
//! command line, and find the clip it produced. Adapters hold no mutable
//! state; everything they need arrives as arguments.

use crate::engine::params::GenerationParams;
use crate::engine::EngineKind;
use crate::error::{LipSyncError, LipSyncResult};
use crate::resource::Resource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Fully-resolved command for one external invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the subprocess, when it matters
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// One-line rendering for logs and error messages
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Local paths for an engine's ensured resources
#[derive(Debug, Clone, Default)]
pub struct ResolvedResources {
    repo: Option<PathBuf>,
    checkpoints: HashMap<String, PathBuf>,
}

impl ResolvedResources {
    pub fn new(repo: PathBuf) -> Self {
        Self {
            repo: Some(repo),
            checkpoints: HashMap::new(),
        }
    }

    pub fn set_repo(&mut self, repo: PathBuf) {
        self.repo = Some(repo);
    }

    pub fn insert_checkpoint(&mut self, name: impl Into<String>, path: PathBuf) {
        self.checkpoints.insert(name.into(), path);
    }

    /// Cloned engine code tree
    pub fn repo(&self) -> LipSyncResult<&Path> {
        self.repo
            .as_deref()
            .ok_or_else(|| LipSyncError::Internal("engine repository was not ensured".to_string()))
    }

    /// Path of one ensured checkpoint by logical name
    pub fn checkpoint(&self, name: &str) -> LipSyncResult<&Path> {
        self.checkpoints
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| LipSyncError::Internal(format!("checkpoint {name} was not ensured")))
    }

    /// Directory holding the ensured checkpoints
    pub fn checkpoints_dir(&self) -> LipSyncResult<&Path> {
        self.checkpoints
            .values()
            .next()
            .and_then(|p| p.parent())
            .ok_or_else(|| LipSyncError::Internal("no checkpoints were ensured".to_string()))
    }
}

/// Per-run inputs handed to `build_invocation`
#[derive(Debug, Clone)]
pub struct InferenceRun {
    /// Source portrait image
    pub image: PathBuf,
    /// Driving speech audio
    pub audio: PathBuf,
    /// Directory inside the workspace where the engine writes results
    pub results_dir: PathBuf,
}

/// Capability interface implemented by each engine variant
#[async_trait]
pub trait EngineAdapter: Send + Sync {
    /// Which engine this adapter drives
    fn kind(&self) -> EngineKind;

    /// The fixed set of repository and checkpoint resources this engine
    /// needs; performs no I/O
    fn required_resources(&self) -> Vec<Resource>;

    /// Check parameters against this variant before anything is acquired
    /// or spawned: range/shape validation plus rejection of tuning the
    /// variant does not recognize
    fn validate_params(&self, params: &GenerationParams) -> LipSyncResult<()>;

    /// Post-acquisition hook for engines whose upstream code expects
    /// artifacts at hard-coded in-tree locations
    async fn stage_resources(&self, _resources: &ResolvedResources) -> LipSyncResult<()> {
        Ok(())
    }

    /// Translate parameters into the engine's exact command line
    fn build_invocation(
        &self,
        params: &GenerationParams,
        resources: &ResolvedResources,
        run: &InferenceRun,
    ) -> LipSyncResult<Invocation>;

    /// Find the clip the engine produced, or fail with `OutputNotFound`
    /// even when the subprocess exited zero
    async fn locate_output(&self, results_dir: &Path) -> LipSyncResult<PathBuf>;
}

/// Collect every `.mp4` under `dir` (engines nest outputs in
/// timestamped subfolders), sorted for deterministic selection
pub(crate) async fn find_clips(dir: &Path) -> LipSyncResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&current)
            .await
            .map_err(|e| LipSyncError::io(format!("reading {}", current.display()), e))?;
        while let Some(item) = entries
            .next_entry()
            .await
            .map_err(|e| LipSyncError::io(format!("reading {}", current.display()), e))?
        {
            let path = item.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext == "mp4") {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

/// Helper for rejecting tuning that belongs to the other variant
pub(crate) fn unsupported(kind: EngineKind, flag: &str) -> LipSyncError {
    LipSyncError::UnsupportedParameter {
        engine: kind.to_string(),
        flag: flag.to_string(),
    }
}
