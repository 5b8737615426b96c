//! Error types for urd.

use thiserror::Error;

/// Errors that can occur while loading, writing or watching events.
#[derive(Error, Debug)]
pub enum UrdError {
    /// The reminder tool rejected a reminder file. `file` and `line` are set
    /// when the tool reported a location.
    #[error("{}", format_syntax_error(.file, .line, .message))]
    Syntax {
        file: Option<String>,
        line: Option<u32>,
        message: String,
    },

    #[error("Command failed: {0}")]
    CommandFailure(String),

    #[error("Could not parse output: {0}")]
    ParseFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Command timed out after {0}s")]
    Timeout(u64),

    #[error("File watcher error: {0}")]
    Watch(String),
}

impl UrdError {
    pub fn syntax(file: Option<String>, line: Option<u32>, message: impl Into<String>) -> Self {
        UrdError::Syntax {
            file,
            line,
            message: message.into(),
        }
    }
}

fn format_syntax_error(file: &Option<String>, line: &Option<u32>, message: &str) -> String {
    match (file, line) {
        (Some(file), Some(line)) => format!("Syntax error in {file}:{line}: {message}"),
        (Some(file), None) => format!("Syntax error in {file}: {message}"),
        _ => format!("Syntax error: {message}"),
    }
}

impl From<notify::Error> for UrdError {
    fn from(err: notify::Error) -> Self {
        UrdError::Watch(err.to_string())
    }
}

/// Result type alias for urd operations.
pub type UrdResult<T> = Result<T, UrdError>;
