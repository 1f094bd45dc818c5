pub mod browser;
pub mod core;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod retry;
pub mod script;
pub mod testing;

pub use crate::browser::{ChromeProvider, ChromeSession};
pub use crate::core::{ActionExecutor, BrowserProvider, RunnerConfig, StepError};
pub use crate::engine::ExecutionEngine;
pub use crate::errors::{Result, RunnerError};
pub use crate::logging::{LogLevel, SessionLogger};
pub use crate::retry::{ErrorClassifier, ErrorKind, RetryStrategy, StrategyTable};
pub use crate::script::{ActionKind, ActionStep, AutomationScript, ExecutionResult};
