//! Script orchestration: validate, acquire a browser, run steps through the
//! retry executor, assemble the result, tear everything down.
//!
//! Two failure channels exist deliberately. Validation and browser-init
//! failures are `RunnerError`s: the script never began running. A step
//! failing mid-script is an `Ok(ExecutionResult { success: false, .. })`:
//! the run happened and the result says how far it got.

use std::time::{Duration, Instant};

use chrono::Utc;

use crate::core::{ActionExecutor, BrowserProvider, RunnerConfig};
use crate::errors::{Result, RunnerError};
use crate::logging::{LogCategory, ScreenshotKind, SessionLogger};
use crate::retry::{ErrorClassifier, RetryExecutor, RetryFailure, StrategyTable};
use crate::script::{
    ActionStep, AutomationScript, ErrorAnalysis, ExecutionResult, ScriptValidator, StepLogRecord,
};

pub struct ExecutionEngine<P: BrowserProvider> {
    provider: P,
    config: RunnerConfig,
    classifier: ErrorClassifier,
}

impl<P: BrowserProvider> ExecutionEngine<P> {
    pub fn new(provider: P, config: RunnerConfig) -> Self {
        Self::with_strategies(provider, config, StrategyTable::default())
    }

    pub fn with_strategies(provider: P, config: RunnerConfig, strategies: StrategyTable) -> Self {
        Self {
            provider,
            config,
            classifier: ErrorClassifier::new(strategies),
        }
    }

    /// Runs one script to completion.
    ///
    /// Errors only for orchestration failures (invalid script, no browser).
    /// Once steps start executing, every outcome comes back as an
    /// `ExecutionResult`.
    pub async fn run(&self, script: &AutomationScript) -> Result<ExecutionResult> {
        let logger = SessionLogger::new(&self.config);
        logger.info(
            LogCategory::Session,
            format!("starting script '{}' ({} steps)", script.name, script.steps.len()),
        );

        // Validating: structural errors stop the run before any browser
        // work; warnings only reach the log.
        let report = ScriptValidator::validate(script);
        logger.validation_result(&report);
        if !report.is_valid() {
            logger.cleanup().await;
            return Err(RunnerError::ScriptInvalid(report.errors.join("; ")));
        }

        // BrowserInit: failures here are function-level, the script never
        // began.
        let session = match self.provider.initialize(&self.config).await {
            Ok(session) => session,
            Err(err) => {
                logger.error(LogCategory::Browser, format!("browser init failed: {}", err));
                logger.cleanup().await;
                return Err(RunnerError::BrowserUnavailable(err.to_string()));
            }
        };
        if !session.has_page() {
            logger.error(LogCategory::Browser, "session has no usable page handle");
            if let Err(err) = self.provider.close(session).await {
                logger.warn(LogCategory::Browser, format!("close failed: {}", err));
            }
            logger.cleanup().await;
            return Err(RunnerError::NoActivePage);
        }
        logger.browser_event("browser session ready", None);

        // Running: the inner loop never escapes; teardown always follows.
        let outcome = self.run_steps(script, &session, &logger).await;

        if let Err(err) = self.provider.close(session).await {
            logger.warn(LogCategory::Browser, format!("browser close failed: {}", err));
        }
        logger.cleanup().await;

        Ok(outcome)
    }

    async fn run_steps<S: ActionExecutor>(
        &self,
        script: &AutomationScript,
        session: &S,
        logger: &SessionLogger,
    ) -> ExecutionResult {
        let started = Instant::now();
        let total_steps = script.steps.len();
        let mut steps_executed = 0usize;
        let mut screenshots: Vec<String> = Vec::new();
        let mut step_logs: Vec<StepLogRecord> = Vec::new();

        let retry = RetryExecutor::new(
            &self.classifier,
            logger,
            self.config.retry_budget,
            self.config.verbose,
        );

        for (index, step) in script.steps.iter().enumerate() {
            let step_number = index + 1;

            // Uniform pacing between actions, not only on retry.
            if self.config.action_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.action_delay_ms)).await;
            }

            let step_started = Instant::now();
            let attempt_result = retry
                .execute(
                    || session.execute(step, step.timeout.or(Some(self.config.action_timeout_ms))),
                    Some(step),
                    Some(step_number),
                )
                .await;
            let duration_ms = step_started.elapsed().as_millis() as u64;

            match attempt_result {
                Ok(screenshot_path) => {
                    steps_executed += 1;
                    if let Some(path) = screenshot_path {
                        logger
                            .register_screenshot(&path, Some(step_number), ScreenshotKind::Success)
                            .await;
                        screenshots.push(path);
                    }
                    logger.step(
                        step_number,
                        format!("{} succeeded", step.display_name()),
                        true,
                        duration_ms,
                    );
                    step_logs.push(StepLogRecord {
                        step_number,
                        action: step.action,
                        description: step.display_name(),
                        success: true,
                        duration_ms,
                        error: None,
                    });
                }
                Err(failure) => {
                    logger.step(
                        step_number,
                        format!("{} failed: {}", step.display_name(), failure.message),
                        false,
                        duration_ms,
                    );
                    step_logs.push(StepLogRecord {
                        step_number,
                        action: step.action,
                        description: step.display_name(),
                        success: false,
                        duration_ms,
                        error: Some(failure.message.clone()),
                    });

                    if step.optional {
                        logger.warn(
                            LogCategory::Step,
                            format!("step {} is optional, continuing", step_number),
                        );
                        continue;
                    }

                    if self.config.screenshot_on_error {
                        if let Some(path) = self
                            .capture_error_screenshot(session, logger, step_number)
                            .await
                        {
                            screenshots.push(path);
                        }
                    }

                    return ExecutionResult {
                        success: false,
                        steps_executed,
                        total_steps,
                        execution_time_ms: started.elapsed().as_millis() as u64,
                        screenshots,
                        error: Some(failure.message.clone()),
                        logs: step_logs,
                        error_analysis: Some(Self::analyze(&failure)),
                        session_id: logger.session_id().to_string(),
                        log_file_path: logger.log_file_path().display().to_string(),
                    };
                }
            }
        }

        logger.info(
            LogCategory::Session,
            format!("script '{}' completed, {} steps", script.name, steps_executed),
        );

        ExecutionResult {
            success: true,
            steps_executed,
            total_steps,
            execution_time_ms: started.elapsed().as_millis() as u64,
            screenshots,
            error: None,
            logs: step_logs,
            error_analysis: None,
            session_id: logger.session_id().to_string(),
            log_file_path: logger.log_file_path().display().to_string(),
        }
    }

    /// One best-effort capture after a permanent step failure. Its own
    /// failure is logged and never escalates.
    async fn capture_error_screenshot<S: ActionExecutor>(
        &self,
        session: &S,
        logger: &SessionLogger,
        step_number: usize,
    ) -> Option<String> {
        let filename = format!(
            "error-step-{}-{}.png",
            step_number,
            Utc::now().format("%Y%m%d%H%M%S")
        );
        let mut capture = ActionStep::screenshot();
        capture.value = Some(
            logger
                .screenshots_dir()
                .join(filename)
                .display()
                .to_string(),
        );

        match session.execute(&capture, None).await {
            Ok(Some(path)) => {
                logger
                    .register_screenshot(&path, Some(step_number), ScreenshotKind::Error)
                    .await;
                Some(path)
            }
            Ok(None) => None,
            Err(err) => {
                logger.warn(
                    LogCategory::Screenshot,
                    format!("error screenshot failed: {}", err.message()),
                );
                None
            }
        }
    }

    fn analyze(failure: &RetryFailure) -> ErrorAnalysis {
        ErrorAnalysis {
            kind: failure.classification.kind.to_string(),
            message: failure.classification.human_message.clone(),
            retryable: failure.classification.retryable,
            attempts: failure.attempts,
            selector: failure.classification.context.selector.clone(),
            url: failure.classification.context.url.clone(),
        }
    }
}
