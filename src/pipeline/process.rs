//! Bounded subprocess execution
//!
//! Both pipeline stages run external tools. Each invocation gets a hard
//! wall-clock budget; on expiry the child is killed and the stage reports
//! `Timeout`. Ctrl-C likewise kills the child and surfaces `Cancelled`,
//! so a cancelled run never leaves an orphaned inference process behind.

use crate::engine::Invocation;
use crate::error::{LipSyncError, LipSyncResult};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a completed subprocess
#[derive(Debug)]
pub struct ProcessOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Last `n` lines of stderr for error messages
    pub fn stderr_tail(&self, n: usize) -> String {
        let lines: Vec<&str> = self.stderr.lines().collect();
        let start = lines.len().saturating_sub(n);
        lines[start..].join("\n")
    }
}

/// Run an invocation to completion within `timeout`
///
/// A nonzero exit is not an error here; callers decide what it means for
/// their stage. Spawn failures, timeouts, and cancellation are errors.
pub async fn run_with_timeout(
    invocation: &Invocation,
    timeout: Duration,
) -> LipSyncResult<ProcessOutput> {
    debug!("Executing: {}", invocation.display());

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &invocation.cwd {
        command.current_dir(cwd);
    }

    let child = command
        .spawn()
        .map_err(|e| LipSyncError::command_failed(invocation.display(), e))?;

    // Dropping the wait future on the other branches drops the child,
    // which kills it (kill_on_drop above).
    tokio::select! {
        output = child.wait_with_output() => {
            let output = output
                .map_err(|e| LipSyncError::command_failed(invocation.display(), e))?;
            Ok(ProcessOutput {
                code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
        _ = tokio::time::sleep(timeout) => {
            Err(LipSyncError::Timeout {
                command: invocation.display(),
                seconds: timeout.as_secs(),
            })
        }
        _ = tokio::signal::ctrl_c() => {
            Err(LipSyncError::Cancelled)
        }
    }
}
