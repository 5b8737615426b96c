//! Handing a reminder file to the user's editor.

use std::env;
use std::path::Path;

use tracing::debug;
use urd_core::{UrdError, UrdResult};

/// `%line%` when no particular line is wanted; editors clamp it to the end.
pub const END_OF_FILE_LINE: u32 = 999_999;

const FALLBACK_EDITOR: &str = "vi";

/// Expand an editor template into a shell command line.
///
/// `$EDITOR` comes from `editor_env`, falling back to vi; other variables are
/// read from the environment and left untouched when unset.
pub fn command_line(template: &str, editor_env: Option<&str>, file: &Path, line: Option<u32>) -> String {
    let expanded = shellexpand::env_with_context_no_errors(template, |var| match var {
        "EDITOR" => Some(
            editor_env
                .filter(|e| !e.trim().is_empty())
                .unwrap_or(FALLBACK_EDITOR)
                .to_string(),
        ),
        other => env::var(other).ok(),
    });

    expanded
        .replace("%line%", &line.unwrap_or(END_OF_FILE_LINE).to_string())
        .replace("%file%", &shell_quote(&file.display().to_string()))
}

fn shell_quote(text: &str) -> String {
    if !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-~+".contains(c))
    {
        return text.to_string();
    }
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Run the editor in the foreground and wait for it to exit.
pub async fn launch(template: &str, file: &Path, line: Option<u32>) -> UrdResult<()> {
    let editor = env::var("EDITOR").ok();
    let command = command_line(template, editor.as_deref(), file, line);
    debug!(%command, "launching editor");

    let status = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(&command)
        .status()
        .await?;

    if status.success() {
        Ok(())
    } else {
        Err(UrdError::CommandFailure(format!(
            "editor exited with {status}: {command}"
        )))
    }
}
