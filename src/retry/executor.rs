//! Attempt loop around a single asynchronous browser operation.
//!
//! Declared failures (`StepError::Failed`) are classified and retried up to
//! the tighter of the per-kind ceiling and the caller's global budget.
//! Driver faults (`StepError::Fault`) are classified once and never retried.
//! The min() keeps a generous global retry count from forcing repeats of
//! errors the classifier caps hard, such as validation errors at 1 attempt.

use std::cmp::min;
use std::future::Future;
use std::time::Duration;

use crate::core::StepError;
use crate::logging::{LogCategory, SessionLogger};
use crate::retry::classifier::{
    BackoffKind, ClassifiedError, ErrorClassifier, RetryStrategy,
};
use crate::script::ActionStep;

/// Delay before the next attempt, computed on the current attempt number.
pub fn calculate_retry_delay(strategy: &RetryStrategy, attempt: u32) -> u64 {
    match strategy.backoff {
        BackoffKind::Fixed => strategy.base_delay_ms,
        BackoffKind::Linear => strategy.base_delay_ms * attempt as u64,
        BackoffKind::Exponential => strategy.base_delay_ms * 2u64.pow(attempt.saturating_sub(1)),
    }
}

/// Terminal outcome of an exhausted or non-retryable operation.
#[derive(Debug, Clone)]
pub struct RetryFailure {
    pub message: String,
    pub classification: ClassifiedError,
    pub attempts: u32,
}

impl RetryFailure {
    fn new(classification: ClassifiedError, attempts: u32) -> Self {
        let message = format!(
            "{} ({}, attempted {} times)",
            classification.human_message, classification.kind, attempts
        );
        Self {
            message,
            classification,
            attempts,
        }
    }
}

impl std::fmt::Display for RetryFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Stateless across calls: a pure function of strategy table, budget and
/// attempt count, safe to reuse for every step of a run.
pub struct RetryExecutor<'a> {
    classifier: &'a ErrorClassifier,
    logger: &'a SessionLogger,
    global_budget: u32,
    verbose: bool,
}

impl<'a> RetryExecutor<'a> {
    pub fn new(
        classifier: &'a ErrorClassifier,
        logger: &'a SessionLogger,
        global_budget: u32,
        verbose: bool,
    ) -> Self {
        Self {
            classifier,
            logger,
            global_budget,
            verbose,
        }
    }

    pub async fn execute<T, F, Fut>(
        &self,
        operation: F,
        step: Option<&ActionStep>,
        step_number: Option<usize>,
    ) -> std::result::Result<T, RetryFailure>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, StepError>>,
    {
        let mut attempt: u32 = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 && self.verbose {
                        self.logger.retry_notice(
                            step_number,
                            format!("operation succeeded on attempt {}", attempt),
                        );
                    }
                    return Ok(value);
                }
                Err(StepError::Failed(msg)) => {
                    let classified = self.classifier.classify(&msg, step, step_number);
                    let effective_max = min(classified.strategy.max_attempts, self.global_budget);

                    if !classified.retryable || attempt >= effective_max {
                        return Err(RetryFailure::new(classified, attempt));
                    }

                    self.logger.retry_notice(
                        step_number,
                        format!(
                            "attempt {}/{} failed ({}): {}",
                            attempt, effective_max, classified.kind, classified.human_message
                        ),
                    );

                    self.run_recovery_actions(&classified.strategy).await;

                    let delay_ms = calculate_retry_delay(&classified.strategy, attempt);
                    if delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                    attempt += 1;
                }
                Err(StepError::Fault(msg)) => {
                    // Faults inside the driver are not the operation's own
                    // failure channel; classify for the report and stop.
                    let classified = self.classifier.classify(&msg, step, step_number);
                    self.logger.error(
                        LogCategory::Retry,
                        format!("unexpected fault, not retrying: {}", msg),
                    );
                    return Err(RetryFailure::new(classified, attempt));
                }
            }
        }
    }

    /// Recovery hooks run after classification and before the backoff
    /// delay. Their failures are logged, never escalated.
    async fn run_recovery_actions(&self, strategy: &RetryStrategy) {
        for action in &strategy.recovery_actions {
            if let Err(err) = action().await {
                self.logger
                    .warn(LogCategory::Retry, format!("recovery action failed: {}", err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RunnerConfig;
    use crate::logging::LogLevel;
    use crate::retry::classifier::{ErrorKind, StrategyTable};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn test_logger() -> SessionLogger {
        let config = RunnerConfig {
            min_log_level: LogLevel::Debug,
            output_dir: std::env::temp_dir()
                .join(format!("webrunner-retrytest-{}", uuid::Uuid::new_v4())),
            ..Default::default()
        };
        SessionLogger::new(&config)
    }

    /// Strategy table with the default shape but millisecond-scale delays so
    /// tests do not sleep for real.
    fn fast_table() -> StrategyTable {
        let mut table = StrategyTable::default();
        for kind in [
            ErrorKind::Network,
            ErrorKind::Timeout,
            ErrorKind::ElementNotFound,
            ErrorKind::ElementNotVisible,
            ErrorKind::ElementNotClickable,
            ErrorKind::Navigation,
            ErrorKind::Screenshot,
            ErrorKind::Browser,
            ErrorKind::Unknown,
        ] {
            let mut strategy = table.strategy_for(kind);
            strategy.base_delay_ms = 1;
            table = table.with_strategy(kind, strategy);
        }
        table
    }

    #[test]
    fn test_exponential_delay_progression() {
        let strategy = RetryStrategy::new(5, 1000, BackoffKind::Exponential);
        assert_eq!(calculate_retry_delay(&strategy, 1), 1000);
        assert_eq!(calculate_retry_delay(&strategy, 2), 2000);
        assert_eq!(calculate_retry_delay(&strategy, 3), 4000);
    }

    #[test]
    fn test_linear_delay_progression() {
        let strategy = RetryStrategy::new(5, 1000, BackoffKind::Linear);
        assert_eq!(calculate_retry_delay(&strategy, 1), 1000);
        assert_eq!(calculate_retry_delay(&strategy, 2), 2000);
        assert_eq!(calculate_retry_delay(&strategy, 3), 3000);
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let strategy = RetryStrategy::new(5, 750, BackoffKind::Fixed);
        for attempt in 1..=4 {
            assert_eq!(calculate_retry_delay(&strategy, attempt), 750);
        }
    }

    #[tokio::test]
    async fn test_fail_once_then_succeed_invokes_twice() {
        let classifier = ErrorClassifier::new(fast_table());
        let logger = test_logger();
        let retry = RetryExecutor::new(&classifier, &logger, 5, true);
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = calls.clone();
        let result = retry
            .execute(
                move || {
                    let calls = calls_in.clone();
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(StepError::Failed("element not found".to_string()))
                        } else {
                            Ok(42u32)
                        }
                    }
                },
                None,
                Some(1),
            )
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        logger.cleanup().await;
    }

    #[tokio::test]
    async fn test_global_budget_caps_attempts() {
        let classifier = ErrorClassifier::new(fast_table());
        let logger = test_logger();
        let retry = RetryExecutor::new(&classifier, &logger, 2, false);
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = calls.clone();
        let result: std::result::Result<(), _> = retry
            .execute(
                move || {
                    let calls = calls_in.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(StepError::Failed("timed out waiting for page".to_string()))
                    }
                },
                None,
                None,
            )
            .await;

        // Timeout strategy allows 3 attempts, budget of 2 is tighter.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let failure = result.unwrap_err();
        assert_eq!(failure.classification.kind, ErrorKind::Timeout);
        assert!(failure.message.contains("TIMEOUT_ERROR"));
        assert!(failure.message.contains("attempted 2 times"));
        logger.cleanup().await;
    }

    #[tokio::test]
    async fn test_validation_error_never_retries() {
        let classifier = ErrorClassifier::new(fast_table());
        let logger = test_logger();
        let retry = RetryExecutor::new(&classifier, &logger, 10, false);
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = calls.clone();
        let result: std::result::Result<(), _> = retry
            .execute(
                move || {
                    let calls = calls_in.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(StepError::Failed("invalid selector syntax".to_string()))
                    }
                },
                None,
                None,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let failure = result.unwrap_err();
        assert_eq!(failure.classification.kind, ErrorKind::Validation);
        assert!(failure.message.contains("attempted 1 times"));
        logger.cleanup().await;
    }

    #[tokio::test]
    async fn test_fault_stops_immediately() {
        let classifier = ErrorClassifier::new(fast_table());
        let logger = test_logger();
        let retry = RetryExecutor::new(&classifier, &logger, 5, false);
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = calls.clone();
        let result: std::result::Result<(), _> = retry
            .execute(
                move || {
                    let calls = calls_in.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(StepError::Fault("websocket connection lost".to_string()))
                    }
                },
                None,
                None,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
        logger.cleanup().await;
    }

    #[tokio::test]
    async fn test_recovery_action_failure_does_not_abort_retry() {
        let recovery_calls = Arc::new(AtomicU32::new(0));
        let recovery_in = recovery_calls.clone();
        let strategy = RetryStrategy::new(3, 1, BackoffKind::Fixed).with_recovery_action(Arc::new(
            move || {
                let calls = recovery_in.clone();
                Box::pin(async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("recovery exploded".to_string())
                })
            },
        ));
        let table = fast_table().with_strategy(ErrorKind::Unknown, strategy);
        let classifier = ErrorClassifier::new(table);
        let logger = test_logger();
        let retry = RetryExecutor::new(&classifier, &logger, 5, false);
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = calls.clone();
        let result = retry
            .execute(
                move || {
                    let calls = calls_in.clone();
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(StepError::Failed("mystery breakage".to_string()))
                        } else {
                            Ok(())
                        }
                    }
                },
                None,
                None,
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(recovery_calls.load(Ordering::SeqCst), 1);
        logger.cleanup().await;
    }

    #[tokio::test]
    async fn test_verbose_success_notice_after_retry() {
        let classifier = ErrorClassifier::new(fast_table());
        let logger = test_logger();
        let retry = RetryExecutor::new(&classifier, &logger, 5, true);
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = calls.clone();
        retry
            .execute(
                move || {
                    let calls = calls_in.clone();
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(StepError::Failed("hidden element".to_string()))
                        } else {
                            Ok(())
                        }
                    }
                },
                None,
                Some(2),
            )
            .await
            .unwrap();

        assert!(logger
            .entries()
            .iter()
            .any(|e| e.message.contains("succeeded on attempt 2")));
        logger.cleanup().await;
    }
}
