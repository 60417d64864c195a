//! lipsync - Lip-synced video generation
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use lipsync::cli::{Cli, Commands};
use lipsync::config::ConfigManager;
use lipsync::error::LipSyncResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.stage() {
                Some(stage) => eprintln!(
                    "{} [{}] {}",
                    style("Error:").red().bold(),
                    style(stage).yellow(),
                    e
                ),
                None => eprintln!("{} {}", style("Error:").red().bold(), e),
            }
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> LipSyncResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("lipsync=warn"),
        1 => EnvFilter::new("lipsync=info"),
        _ => EnvFilter::new("lipsync=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };
    let config = config_manager.load().await?;

    // Dispatch to command
    match cli.command {
        Commands::Run(args) => lipsync::cli::commands::run(args, &config).await,
        Commands::Cache(args) => lipsync::cli::commands::cache(args, &config).await,
        Commands::Status => lipsync::cli::commands::status(&config).await,
        Commands::Config(args) => lipsync::cli::commands::config(args, &config, &config_manager).await,
    }
}
