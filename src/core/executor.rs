use async_trait::async_trait;
use thiserror::Error;

use crate::core::RunnerConfig;
use crate::script::ActionStep;

/// How a single action attempt can fail.
///
/// `Failed` is the action's declared failure channel: a human-readable
/// message the classifier can parse, eligible for retry. `Fault` is the
/// moral equivalent of a crash (driver gone, websocket dead); it is
/// classified once and never retried.
#[derive(Error, Debug, Clone)]
pub enum StepError {
    #[error("{0}")]
    Failed(String),

    #[error("driver fault: {0}")]
    Fault(String),
}

impl StepError {
    pub fn message(&self) -> &str {
        match self {
            StepError::Failed(msg) | StepError::Fault(msg) => msg,
        }
    }
}

/// Result of one action attempt. Screenshot steps resolve to the path of
/// the written image, everything else to `None`.
pub type StepResult = std::result::Result<Option<String>, StepError>;

/// Performs one browser action against a live session.
///
/// Implementations must return `StepError::Failed` for ordinary action
/// failures and reserve `StepError::Fault` for genuinely exceptional
/// driver conditions. Timeouts are enforced here, not by the engine.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, step: &ActionStep, timeout_override: Option<u64>) -> StepResult;

    /// Whether the session still holds a usable page handle.
    fn has_page(&self) -> bool;
}

/// Acquires and releases browser sessions for the engine.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    type Session: ActionExecutor;

    async fn initialize(&self, config: &RunnerConfig) -> anyhow::Result<Self::Session>;

    /// Release page, context and browser in that order; individual close
    /// failures must not prevent the remaining closes.
    async fn close(&self, session: Self::Session) -> anyhow::Result<()>;
}
