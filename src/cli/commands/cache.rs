//! Cache command - manage cached engine resources

use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::{LipSyncError, LipSyncResult};
use crate::resource::{CacheEntry, HttpGitFetcher, ResourceCache, VerificationStatus};
use console::style;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> LipSyncResult<()> {
    let root = args
        .cache_dir
        .clone()
        .or_else(|| config.cache.root.clone())
        .unwrap_or_else(ConfigManager::default_cache_root);
    debug!("Cache root: {}", root.display());

    let cache = ResourceCache::new(root, Arc::new(HttpGitFetcher::default()));

    match args.action {
        CacheAction::List { format } => list_entries(&cache, format),
        CacheAction::Verify => verify_entries(&cache),
        CacheAction::Clear { yes } => clear_cache(&cache, yes),
    }
}

/// List cached checkpoints and repositories
fn list_entries(cache: &ResourceCache, format: OutputFormat) -> LipSyncResult<()> {
    let entries = cache.list_entries()?;
    let engines_with_repo: Vec<String> = cache
        .engines()?
        .into_iter()
        .filter(|e| cache.repo_path(e).exists())
        .collect();

    if entries.is_empty() && engines_with_repo.is_empty() {
        println!("Cache is empty: {}", cache.root().display());
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(&entries, &engines_with_repo),
        OutputFormat::Json => print_json(&entries, &engines_with_repo)?,
        OutputFormat::Plain => print_plain(&entries, &engines_with_repo),
    }

    Ok(())
}

fn print_table(entries: &[CacheEntry], repos: &[String]) {
    println!(
        "{:<12} {:<36} {:<12} {:<10} {:<20}",
        "ENGINE", "NAME", "STATUS", "DIGEST", "ACQUIRED"
    );
    println!("{}", "-".repeat(92));

    for engine in repos {
        println!(
            "{:<12} {:<36} {:<12} {:<10} {:<20}",
            engine,
            "repo",
            style("present").green(),
            "-",
            "-"
        );
    }

    for entry in entries {
        let status = match entry.status {
            VerificationStatus::Verified => style("verified").green().to_string(),
            VerificationStatus::Unverified => style("unverified").yellow().to_string(),
            VerificationStatus::Failed => style("failed").red().to_string(),
        };
        let algorithm = entry
            .algorithm
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        let acquired = entry.acquired_at.format("%Y-%m-%d %H:%M").to_string();

        println!(
            "{:<12} {:<36} {:<12} {:<10} {:<20}",
            entry.engine, entry.name, status, algorithm, acquired
        );
    }

    println!();
    println!("Total: {} checkpoint(s)", entries.len());
}

fn print_json(entries: &[CacheEntry], repos: &[String]) -> LipSyncResult<()> {
    #[derive(serde::Serialize)]
    struct CacheJson<'a> {
        repositories: &'a [String],
        checkpoints: &'a [CacheEntry],
    }

    let json = CacheJson {
        repositories: repos,
        checkpoints: entries,
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_plain(entries: &[CacheEntry], repos: &[String]) {
    for engine in repos {
        println!("{engine}/repo");
    }
    for entry in entries {
        println!("{}/checkpoints/{}", entry.engine, entry.name);
    }
}

/// Re-hash every cached checkpoint against its recorded digest
fn verify_entries(cache: &ResourceCache) -> LipSyncResult<()> {
    let entries = cache.list_entries()?;

    if entries.is_empty() {
        println!("No cached checkpoints to verify.");
        return Ok(());
    }

    let mut bad = 0;
    for entry in &entries {
        let ok = cache.recheck_entry(entry)?;
        if ok {
            println!("  {} {}/{}", style("✓").green(), entry.engine, entry.name);
        } else {
            bad += 1;
            println!(
                "  {} {}/{} no longer matches its digest",
                style("✗").red(),
                entry.engine,
                entry.name
            );
        }
    }

    println!();
    if bad == 0 {
        println!("{} {} checkpoint(s) intact", style("✓").green(), entries.len());
        Ok(())
    } else {
        println!(
            "{} {} of {} checkpoint(s) corrupt; run `lipsync cache clear` to re-acquire",
            style("✗").red(),
            bad,
            entries.len()
        );
        Err(LipSyncError::Internal(format!(
            "{bad} cached checkpoint(s) failed verification"
        )))
    }
}

/// Remove every cached engine tree, with confirmation
fn clear_cache(cache: &ResourceCache, skip_confirm: bool) -> LipSyncResult<()> {
    let engines = cache.engines()?;

    if engines.is_empty() {
        println!("Cache is already empty: {}", cache.root().display());
        return Ok(());
    }

    println!("This will remove {} cached engine tree(s):", engines.len());
    for engine in &engines {
        println!("  {} {}", style("•").red(), cache.root().join(engine).display());
    }
    println!();

    if !skip_confirm {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Aborted.");
            return Ok(());
        }
        if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = cache.clear()?;
    println!("{} removed {} engine tree(s)", style("✓").green(), removed);

    Ok(())
}
