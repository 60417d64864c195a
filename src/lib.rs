//! lipsync - Lip-synced video generation
//!
//! Turns a still portrait and a speech track into an upscaled lip-synced
//! video by driving one of two external inference engines (SadTalker,
//! Wav2Lip), with verified resource caching and an ffmpeg upscale stage.

pub mod checksum;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod resource;

pub use error::{LipSyncError, LipSyncResult};
