//! Running the external tools.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{UrdError, UrdResult};

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolve a command name or path to an executable.
pub fn binary_path(command: &str) -> UrdResult<PathBuf> {
    which::which(command).map_err(|_| {
        UrdError::CommandFailure(format!(
            "'{command}' not found. Install it or set its path in ~/.config/urd/config.toml"
        ))
    })
}

/// Build a command with stdin closed and both output streams piped.
pub fn command(binary: &Path, args: &[String]) -> Command {
    let mut cmd = Command::new(binary);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Run `command` to completion and collect stdout and stderr separately.
pub async fn run(command_name: &str, args: &[String]) -> UrdResult<Output> {
    let binary = binary_path(command_name)?;
    debug!(binary = %binary.display(), ?args, "running external command");

    let child = command(&binary, args).spawn().map_err(|e| {
        UrdError::CommandFailure(format!("Failed to spawn {}: {}", binary.display(), e))
    })?;

    let output = timeout(COMMAND_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| UrdError::Timeout(COMMAND_TIMEOUT.as_secs()))??;

    debug!(
        status = output.status.code().unwrap_or(-1),
        stdout_bytes = output.stdout.len(),
        stderr_bytes = output.stderr.len(),
        "external command finished"
    );
    Ok(output)
}
