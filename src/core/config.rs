use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::logging::LogLevel;

/// Read-only configuration for one runner instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Caller-side ceiling on retry attempts; combined with the per-kind
    /// ceiling via minimum.
    pub retry_budget: u32,
    /// Pause applied before every step, not just on retry.
    pub action_delay_ms: u64,
    /// Capture a best-effort screenshot when a step fails permanently.
    pub screenshot_on_error: bool,
    /// Entries below this severity never reach any sink.
    pub min_log_level: LogLevel,
    /// Logs, screenshots and exports land under this directory.
    pub output_dir: PathBuf,
    pub verbose: bool,
    /// Per-action timeout enforced by the action executor.
    pub action_timeout_ms: u64,
    /// Rotate the session log once it grows past this size.
    pub max_log_size_bytes: u64,
    /// Rotated files kept per session, newest first.
    pub max_rotated_logs: usize,
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            retry_budget: 3,
            action_delay_ms: 0,
            screenshot_on_error: true,
            min_log_level: LogLevel::Info,
            output_dir: PathBuf::from("automation-output"),
            verbose: false,
            action_timeout_ms: 30_000,
            max_log_size_bytes: 50 * 1024 * 1024,
            max_rotated_logs: 10,
            browser: BrowserConfig::default(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            args: vec![],
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}
