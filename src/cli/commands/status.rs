//! Status command - check external prerequisites and cache health

use crate::config::{Config, ConfigManager};
use crate::error::LipSyncResult;
use crate::resource::{HttpGitFetcher, ResourceCache, VerificationStatus};
use console::{style, Emoji};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "[FAIL] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");

/// Execute the status command
pub async fn execute(config: &Config) -> LipSyncResult<()> {
    println!("{}", style("lipsync System Status").bold().cyan());
    println!();

    let mut all_ok = true;

    println!("{}", style("External tools:").bold());
    all_ok &= check_cli("git", "required to clone engine repositories").await;
    all_ok &= check_cli(&config.general.python, "required to run engine inference").await;
    all_ok &= check_cli(&config.upscale.program, "required for the upscale stage").await;

    println!();
    println!("{}", style("Cache:").bold());
    check_cache(config)?;

    println!();
    if all_ok {
        println!("{}", style("All critical checks passed").green().bold());
    } else {
        println!(
            "{}",
            style("Some checks failed - see above for details")
                .yellow()
                .bold()
        );
    }

    Ok(())
}

async fn check_cli(name: &str, purpose: &str) -> bool {
    let available = Command::new(name)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false);

    if available {
        println!("  {} {}", CHECK, style(name).green());
        true
    } else {
        println!(
            "  {} {} - {}",
            CROSS,
            style(format!("{name} not found")).red(),
            purpose
        );
        false
    }
}

fn check_cache(config: &Config) -> LipSyncResult<()> {
    let root = config
        .cache
        .root
        .clone()
        .unwrap_or_else(ConfigManager::default_cache_root);

    if !root.exists() {
        println!(
            "  {} {} (will be created on first run)",
            WARN,
            style(root.display()).dim()
        );
        return Ok(());
    }

    println!("  {} Root: {}", CHECK, root.display());

    let cache = ResourceCache::new(root, Arc::new(HttpGitFetcher::default()));
    let entries = cache.list_entries()?;
    let repos = cache
        .engines()?
        .into_iter()
        .filter(|e| cache.repo_path(e).exists())
        .count();

    let verified = entries
        .iter()
        .filter(|e| e.status == VerificationStatus::Verified)
        .count();
    let broken = entries.len() - verified;

    println!(
        "  {} {} repositorie(s), {} checkpoint(s) verified",
        CHECK, repos, verified
    );
    if broken > 0 {
        println!(
            "  {} {} checkpoint(s) not verified - run: lipsync cache verify",
            WARN, broken
        );
    }

    Ok(())
}
