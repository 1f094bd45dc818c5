//! Mock collaborators for exercising the engine and retry loop without a
//! real browser.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::core::{ActionExecutor, BrowserProvider, RunnerConfig, StepError, StepResult};
use crate::script::ActionStep;

/// One pre-scripted reply for a `MockSession::execute` call.
pub struct ScriptedOutcome(StepResult);

impl ScriptedOutcome {
    pub fn ok() -> Self {
        Self(Ok(None))
    }

    pub fn screenshot(path: impl Into<String>) -> Self {
        Self(Ok(Some(path.into())))
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self(Err(StepError::Failed(message.into())))
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self(Err(StepError::Fault(message.into())))
    }
}

/// Action executor that replays scripted outcomes in order. Once the script
/// runs out it either keeps succeeding (`always_ok`) or fails loudly so a
/// test with a miscounted script is caught.
pub struct MockSession {
    outcomes: Mutex<VecDeque<StepResult>>,
    fallback_ok: bool,
    has_page: bool,
    calls: Arc<AtomicU32>,
}

impl MockSession {
    pub fn always_ok() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            fallback_ok: true,
            has_page: true,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn scripted(outcomes: Vec<ScriptedOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().map(|o| o.0).collect()),
            fallback_ok: false,
            has_page: true,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn without_page() -> Self {
        let mut session = Self::always_ok();
        session.has_page = false;
        session
    }

    pub fn call_count(&self) -> Arc<AtomicU32> {
        self.calls.clone()
    }
}

#[async_trait]
impl ActionExecutor for MockSession {
    async fn execute(&self, _step: &ActionStep, _timeout_override: Option<u64>) -> StepResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.outcomes.lock().expect("outcomes lock").pop_front();
        match next {
            Some(result) => result,
            None if self.fallback_ok => Ok(None),
            None => Err(StepError::Fault("mock session ran out of outcomes".to_string())),
        }
    }

    fn has_page(&self) -> bool {
        self.has_page
    }
}

/// Browser provider that hands out one prepared session, counting
/// initialize/close calls so tests can assert the engine's lifecycle.
pub struct MockBrowserProvider {
    session: Mutex<Option<MockSession>>,
    fail_with: Option<String>,
    init_calls: Arc<AtomicU32>,
    close_calls: Arc<AtomicU32>,
}

impl MockBrowserProvider {
    pub fn succeeding(session: MockSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
            fail_with: None,
            init_calls: Arc::new(AtomicU32::new(0)),
            close_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            session: Mutex::new(None),
            fail_with: Some(message.into()),
            init_calls: Arc::new(AtomicU32::new(0)),
            close_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn init_calls(&self) -> Arc<AtomicU32> {
        self.init_calls.clone()
    }

    pub fn close_calls(&self) -> Arc<AtomicU32> {
        self.close_calls.clone()
    }
}

#[async_trait]
impl BrowserProvider for MockBrowserProvider {
    type Session = MockSession;

    async fn initialize(&self, _config: &RunnerConfig) -> anyhow::Result<Self::Session> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{}", message);
        }
        self.session
            .lock()
            .expect("session lock")
            .take()
            .ok_or_else(|| anyhow::anyhow!("mock provider has no session left"))
    }

    async fn close(&self, _session: Self::Session) -> anyhow::Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
