//! CLI argument definitions using clap derive

use crate::engine::{EngineKind, PreprocessMode};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// lipsync - Lip-synced video generation
///
/// Turns a still portrait and a speech track into an upscaled lip-synced
/// video, driving SadTalker or Wav2Lip under the hood.
#[derive(Parser, Debug)]
#[command(name = "lipsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "LIPSYNC_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a lip-synced video
    Run(RunArgs),

    /// Manage cached engine repositories and checkpoints
    Cache(CacheArgs),

    /// Check external prerequisites and cache health
    Status,

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the input portrait image
    pub image: PathBuf,

    /// Path to the input speech audio
    pub audio: PathBuf,

    /// Destination path for the generated video
    pub output: PathBuf,

    /// Engine used for lip-sync generation
    #[arg(long, value_enum, default_value_t = EngineKind::SadTalker)]
    pub engine: EngineKind,

    /// Directory for cached repositories and checkpoints
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Frames per second for the generated video
    #[arg(long)]
    pub fps: Option<u32>,

    /// Base generation resolution before optional upscaling
    #[arg(long)]
    pub resolution: Option<u32>,

    /// Skip the final upscaling stage
    #[arg(long = "no-upscale", action = ArgAction::SetFalse, default_value_t = true)]
    pub upscale: bool,

    /// Keep the per-run workspace instead of removing it
    #[arg(long)]
    pub keep_temp: bool,

    /// Preprocessing strategy
    #[arg(long, value_enum, help_heading = "SadTalker options")]
    pub preprocess: Option<PreprocessMode>,

    /// Expression scale factor (higher yields bigger motion)
    #[arg(long, help_heading = "SadTalker options")]
    pub expression_scale: Option<f32>,

    /// Disable still mode for additional head motion
    #[arg(long, help_heading = "SadTalker options")]
    pub no_still: bool,

    /// Face enhancer (e.g. gfpgan)
    #[arg(long, help_heading = "SadTalker options")]
    pub enhancer: Option<String>,

    /// Padding around the detected face
    #[arg(
        long,
        num_args = 4,
        value_names = ["TOP", "BOTTOM", "LEFT", "RIGHT"],
        help_heading = "Wav2Lip options"
    )]
    pub pads: Option<Vec<u32>>,

    /// Allow dynamic face inputs instead of forcing static mode
    #[arg(long, help_heading = "Wav2Lip options")]
    pub no_static: bool,

    /// Disable smoothing of face detections over time
    #[arg(long, help_heading = "Wav2Lip options")]
    pub nosmooth: bool,

    /// Batch size for the lip-sync model
    #[arg(long, help_heading = "Wav2Lip options")]
    pub wav2lip_batch_size: Option<u32>,

    /// Batch size for the face detector
    #[arg(long, help_heading = "Wav2Lip options")]
    pub face_det_batch_size: Option<u32>,

    /// Resize factor applied before inference
    #[arg(long, help_heading = "Wav2Lip options")]
    pub resize_factor: Option<f32>,

    /// Crop rectangle (-1 means "to the edge")
    #[arg(
        long,
        num_args = 4,
        value_names = ["X1", "Y1", "X2", "Y2"],
        allow_negative_numbers = true,
        help_heading = "Wav2Lip options"
    )]
    pub crop: Option<Vec<i64>>,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Directory for cached repositories and checkpoints
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached checkpoints and repositories
    List {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Re-hash cached checkpoints against their recorded digests
    Verify,

    /// Remove all cached engine trees and checkpoints
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run() {
        let cli = Cli::parse_from(["lipsync", "run", "face.png", "speech.wav", "out.mp4"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.image, PathBuf::from("face.png"));
                assert_eq!(args.engine, EngineKind::SadTalker);
                assert!(args.upscale, "upscaling defaults on");
                assert!(!args.keep_temp);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_engine_selection() {
        let cli = Cli::parse_from([
            "lipsync", "run", "face.png", "speech.wav", "out.mp4", "--engine", "wav2lip",
        ]);
        match cli.command {
            Commands::Run(args) => assert_eq!(args.engine, EngineKind::Wav2Lip),
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_no_upscale() {
        let cli = Cli::parse_from([
            "lipsync", "run", "face.png", "speech.wav", "out.mp4", "--no-upscale",
        ]);
        match cli.command {
            Commands::Run(args) => assert!(!args.upscale),
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_pads_tuple() {
        let cli = Cli::parse_from([
            "lipsync", "run", "f.png", "s.wav", "o.mp4", "--pads", "0", "20", "0", "0",
        ]);
        match cli.command {
            Commands::Run(args) => assert_eq!(args.pads, Some(vec![0, 20, 0, 0])),
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_parses_negative_crop() {
        let cli = Cli::parse_from([
            "lipsync", "run", "f.png", "s.wav", "o.mp4", "--crop", "0", "0", "-1", "-1",
        ]);
        match cli.command {
            Commands::Run(args) => assert_eq!(args.crop, Some(vec![0, 0, -1, -1])),
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn cli_rejects_partial_pads() {
        assert!(
            Cli::try_parse_from(["lipsync", "run", "f.png", "s.wav", "o.mp4", "--pads", "0", "20"])
                .is_err()
        );
    }

    #[test]
    fn cli_parses_cache_subcommands() {
        let cli = Cli::parse_from(["lipsync", "cache", "list"]);
        match cli.command {
            Commands::Cache(args) => assert!(matches!(args.action, CacheAction::List { .. })),
            _ => panic!("expected Cache command"),
        }

        let cli = Cli::parse_from(["lipsync", "cache", "clear", "--yes"]);
        match cli.command {
            Commands::Cache(args) => match args.action {
                CacheAction::Clear { yes } => assert!(yes),
                _ => panic!("expected Clear"),
            },
            _ => panic!("expected Cache command"),
        }
    }

    #[test]
    fn cli_parses_status() {
        let cli = Cli::parse_from(["lipsync", "status"]);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn cli_verbose_levels() {
        let cli = Cli::parse_from(["lipsync", "status"]);
        assert_eq!(cli.verbose, 0);

        let cli = Cli::parse_from(["lipsync", "-vv", "status"]);
        assert_eq!(cli.verbose, 2);
    }
}
