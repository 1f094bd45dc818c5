use thiserror::Error;

/// Top-level runner errors.
///
/// Only orchestration failures surface here: a script that could not be
/// validated or a browser session that could not be acquired. A script that
/// starts running and then fails at some step is *not* a `RunnerError`;
/// it comes back as an `ExecutionResult` with `success: false`.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Script validation failed: {0}")]
    ScriptInvalid(String),

    #[error("Browser unavailable: {0}")]
    BrowserUnavailable(String),

    #[error("Browser session has no usable page handle")]
    NoActivePage,

    #[error("Script parse failed: {0}")]
    ScriptParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export failed: {0}")]
    ExportFailed(String),
}

pub type Result<T> = std::result::Result<T, RunnerError>;

impl From<anyhow::Error> for RunnerError {
    fn from(err: anyhow::Error) -> Self {
        RunnerError::BrowserUnavailable(err.to_string())
    }
}
