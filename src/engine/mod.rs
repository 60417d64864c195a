//! Engine adapters
//!
//! The two supported inference engines are a closed set behind one
//! capability trait, selected by a runtime tag. Adapters translate
//! engine-agnostic parameters into each tool's exact invocation and know
//! where each tool leaves its output.

pub mod adapter;
pub mod params;
mod sadtalker;
mod wav2lip;

pub use adapter::{EngineAdapter, InferenceRun, Invocation, ResolvedResources};
pub use params::{GenerationParams, PreprocessMode};
pub use sadtalker::SadTalkerAdapter;
pub use wav2lip::Wav2LipAdapter;

use crate::config::Config;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported engine variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// OpenTalker/SadTalker: full talking-head motion from one portrait
    #[value(name = "sadtalker")]
    SadTalker,
    /// Rudrabha/Wav2Lip: mouth-region lip sync
    #[value(name = "wav2lip")]
    Wav2Lip,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SadTalker => write!(f, "sadtalker"),
            Self::Wav2Lip => write!(f, "wav2lip"),
        }
    }
}

/// Create the adapter for an engine tag
pub fn create_adapter(kind: EngineKind, config: &Config) -> Box<dyn EngineAdapter> {
    match kind {
        EngineKind::SadTalker => Box::new(SadTalkerAdapter::new(
            config.sadtalker.clone(),
            &config.general,
        )),
        EngineKind::Wav2Lip => Box::new(Wav2LipAdapter::new(
            config.wav2lip.clone(),
            &config.general,
        )),
    }
}
