//! Failure classification for retry strategy selection.
//!
//! Raw driver messages are matched against an ordered cascade of keyword
//! groups; the first group that matches decides the error kind and its retry
//! strategy. Order matters because keywords overlap ("timeout" vs
//! "waiting for" vs "not found"), so the cascade is kept as one auditable
//! table rather than scattered conditionals.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::script::ActionStep;

/// The taxonomy of classified failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Timeout,
    ElementNotFound,
    ElementNotVisible,
    ElementNotClickable,
    Navigation,
    Screenshot,
    Validation,
    Browser,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Timeout => "TIMEOUT_ERROR",
            ErrorKind::ElementNotFound => "ELEMENT_NOT_FOUND",
            ErrorKind::ElementNotVisible => "ELEMENT_NOT_VISIBLE",
            ErrorKind::ElementNotClickable => "ELEMENT_NOT_CLICKABLE",
            ErrorKind::Navigation => "NAVIGATION_ERROR",
            ErrorKind::Screenshot => "SCREENSHOT_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Browser => "BROWSER_ERROR",
            ErrorKind::Unknown => "UNKNOWN_ERROR",
        };
        f.write_str(label)
    }
}

/// How the base delay grows across attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    Fixed,
    Linear,
    Exponential,
}

/// Best-effort hook run between a failed attempt and its backoff delay.
/// Hook failures are logged and never escalate.
pub type RecoveryAction =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = std::result::Result<(), String>> + Send>> + Send + Sync>;

/// Retry policy for one error kind.
#[derive(Clone)]
pub struct RetryStrategy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff: BackoffKind,
    pub recovery_actions: Vec<RecoveryAction>,
}

impl RetryStrategy {
    pub fn new(max_attempts: u32, base_delay_ms: u64, backoff: BackoffKind) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            backoff,
            recovery_actions: Vec::new(),
        }
    }

    pub fn with_recovery_action(mut self, action: RecoveryAction) -> Self {
        self.recovery_actions.push(action);
        self
    }
}

impl fmt::Debug for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryStrategy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay_ms", &self.base_delay_ms)
            .field("backoff", &self.backoff)
            .field("recovery_actions", &self.recovery_actions.len())
            .finish()
    }
}

/// Where the failure happened, extracted from the step when relevant.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub step: Option<ActionStep>,
    pub step_number: Option<usize>,
    pub selector: Option<String>,
    pub url: Option<String>,
}

/// A raw failure message resolved into a typed error with retry policy.
/// Created fresh per failure, never mutated.
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub original_message: String,
    pub human_message: String,
    pub retryable: bool,
    pub strategy: RetryStrategy,
    pub context: ErrorContext,
}

/// Immutable kind → strategy mapping, built once and injected wherever retry
/// decisions are made. Replaces per-kind tunables scattered in globals.
#[derive(Debug, Clone)]
pub struct StrategyTable {
    strategies: HashMap<ErrorKind, RetryStrategy>,
}

impl StrategyTable {
    pub fn with_strategy(mut self, kind: ErrorKind, strategy: RetryStrategy) -> Self {
        self.strategies.insert(kind, strategy);
        self
    }

    pub fn strategy_for(&self, kind: ErrorKind) -> RetryStrategy {
        self.strategies
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| RetryStrategy::new(2, 1000, BackoffKind::Fixed))
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        let mut strategies = HashMap::new();
        strategies.insert(
            ErrorKind::Network,
            RetryStrategy::new(5, 2000, BackoffKind::Exponential),
        );
        strategies.insert(
            ErrorKind::Timeout,
            RetryStrategy::new(3, 3000, BackoffKind::Linear),
        );
        strategies.insert(
            ErrorKind::ElementNotFound,
            RetryStrategy::new(4, 1500, BackoffKind::Fixed),
        );
        strategies.insert(
            ErrorKind::ElementNotVisible,
            RetryStrategy::new(3, 1000, BackoffKind::Fixed),
        );
        strategies.insert(
            ErrorKind::ElementNotClickable,
            RetryStrategy::new(3, 1000, BackoffKind::Fixed),
        );
        strategies.insert(
            ErrorKind::Navigation,
            RetryStrategy::new(3, 2000, BackoffKind::Exponential),
        );
        strategies.insert(
            ErrorKind::Screenshot,
            RetryStrategy::new(2, 500, BackoffKind::Fixed),
        );
        strategies.insert(
            ErrorKind::Validation,
            RetryStrategy::new(1, 0, BackoffKind::Fixed),
        );
        strategies.insert(
            ErrorKind::Browser,
            RetryStrategy::new(2, 3000, BackoffKind::Fixed),
        );
        strategies.insert(
            ErrorKind::Unknown,
            RetryStrategy::new(2, 1000, BackoffKind::Fixed),
        );
        Self { strategies }
    }
}

/// Ordered match table. Evaluated top to bottom, first hit wins.
const MATCH_RULES: &[(ErrorKind, &[&str])] = &[
    (
        ErrorKind::Network,
        &["net::err", "network", "connection", "dns", "refused"],
    ),
    (ErrorKind::Timeout, &["timeout", "timed out", "waiting for"]),
    (
        ErrorKind::ElementNotFound,
        &["no element", "not found", "cannot find", "element not found"],
    ),
    (
        ErrorKind::ElementNotVisible,
        &["not visible", "hidden", "not displayed"],
    ),
    (
        ErrorKind::ElementNotClickable,
        &["not clickable", "not interactable", "click intercepted"],
    ),
    (
        ErrorKind::Navigation,
        &["navigation", "page crashed", "goto"],
    ),
    (ErrorKind::Screenshot, &["screenshot"]),
    (ErrorKind::Validation, &["validation", "invalid"]),
    (ErrorKind::Browser, &["browser", "context", "chrome"]),
];

/// Classifies raw failure messages against the injected strategy table.
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    strategies: StrategyTable,
}

impl ErrorClassifier {
    pub fn new(strategies: StrategyTable) -> Self {
        Self { strategies }
    }

    /// Total function: every message yields exactly one classification.
    pub fn classify(
        &self,
        raw_message: &str,
        step: Option<&ActionStep>,
        step_number: Option<usize>,
    ) -> ClassifiedError {
        let lowered = raw_message.to_lowercase();
        let kind = MATCH_RULES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(kind, _)| *kind)
            .unwrap_or(ErrorKind::Unknown);

        let selector = step.and_then(|s| s.selector.clone());
        let url = step.and_then(|s| s.url.clone());
        let human_message = Self::human_message(kind, raw_message, selector.as_deref(), url.as_deref());

        ClassifiedError {
            kind,
            original_message: raw_message.to_string(),
            human_message,
            retryable: kind != ErrorKind::Validation,
            strategy: self.strategies.strategy_for(kind),
            context: ErrorContext {
                step: step.cloned(),
                step_number,
                selector,
                url,
            },
        }
    }

    fn human_message(
        kind: ErrorKind,
        raw: &str,
        selector: Option<&str>,
        url: Option<&str>,
    ) -> String {
        match kind {
            ErrorKind::Network => "Network error while talking to the page".to_string(),
            ErrorKind::Timeout => "Operation timed out waiting for the page".to_string(),
            ErrorKind::ElementNotFound => match selector {
                Some(sel) => format!("Element not found: {}", sel),
                None => "Element not found".to_string(),
            },
            ErrorKind::ElementNotVisible => match selector {
                Some(sel) => format!("Element is not visible: {}", sel),
                None => "Element is not visible".to_string(),
            },
            ErrorKind::ElementNotClickable => match selector {
                Some(sel) => format!("Element could not be clicked: {}", sel),
                None => "Element could not be clicked".to_string(),
            },
            ErrorKind::Navigation => match url {
                Some(url) => format!("Navigation failed for {}", url),
                None => "Navigation failed".to_string(),
            },
            ErrorKind::Screenshot => "Screenshot capture failed".to_string(),
            ErrorKind::Validation => format!("Validation error: {}", raw),
            ErrorKind::Browser => "Browser-level error".to_string(),
            ErrorKind::Unknown => format!("Unexpected error: {}", raw),
        }
    }
}
