pub mod config;
pub mod executor;

pub use config::{BrowserConfig, RunnerConfig, Viewport};
pub use executor::{ActionExecutor, BrowserProvider, StepError, StepResult};
