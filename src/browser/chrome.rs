//! Chrome-backed implementation of the collaborator traits.
//!
//! Driver error text is passed through verbatim in `StepError::Failed` so the
//! classifier can match on it. Only a missing tab handle is reported as a
//! `Fault`, since no action can recover from it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::core::{ActionExecutor, BrowserProvider, RunnerConfig, StepError, StepResult};
use crate::script::{ActionKind, ActionStep};

pub struct ChromeSession {
    // Browser must outlive the tab; kept even though only the tab is used.
    _browser: Browser,
    tab: Option<Arc<Tab>>,
    screenshots_dir: PathBuf,
}

impl ChromeSession {
    fn tab(&self) -> Result<&Arc<Tab>, StepError> {
        self.tab
            .as_ref()
            .ok_or_else(|| StepError::Fault("no active tab".to_string()))
    }

    fn screenshot_path(&self, step: &ActionStep) -> PathBuf {
        match &step.value {
            Some(explicit) => PathBuf::from(explicit),
            None => self.screenshots_dir.join(format!(
                "screenshot-{}.png",
                Utc::now().format("%Y%m%d%H%M%S%3f")
            )),
        }
    }

    fn element_timeout(timeout_override: Option<u64>) -> Duration {
        Duration::from_millis(timeout_override.unwrap_or(30_000))
    }

    /// JS that resolves the target node, scoped into an iframe's content
    /// document when the step has a frame selector.
    fn scoped_lookup(step: &ActionStep, selector: &str) -> String {
        let selector = selector.replace('\'', "\\'");
        match &step.frame {
            Some(frame) => {
                let frame = frame.replace('\'', "\\'");
                format!(
                    "document.querySelector('{}').contentDocument.querySelector('{}')",
                    frame, selector
                )
            }
            None => format!("document.querySelector('{}')", selector),
        }
    }

    fn eval(&self, script: &str) -> Result<serde_json::Value, StepError> {
        let tab = self.tab()?;
        let result = tab
            .evaluate(script, false)
            .map_err(|e| StepError::Failed(e.to_string()))?;
        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    fn selector_of(step: &ActionStep) -> Result<&str, StepError> {
        step.selector
            .as_deref()
            .ok_or_else(|| StepError::Failed(format!("invalid step: {} has no selector", step.action)))
    }

    fn value_of(step: &ActionStep) -> Result<&str, StepError> {
        step.value
            .as_deref()
            .ok_or_else(|| StepError::Failed(format!("invalid step: {} has no value", step.action)))
    }

    fn navigate(&self, step: &ActionStep) -> Result<(), StepError> {
        let url = step
            .url
            .as_deref()
            .ok_or_else(|| StepError::Failed("invalid step: navigate has no url".to_string()))?;
        let tab = self.tab()?;
        tab.navigate_to(url)
            .map_err(|e| StepError::Failed(e.to_string()))?;
        tab.wait_until_navigated()
            .map_err(|e| StepError::Failed(e.to_string()))?;
        Ok(())
    }

    fn click(&self, step: &ActionStep, timeout: Duration) -> Result<(), StepError> {
        let selector = Self::selector_of(step)?;
        if step.frame.is_some() {
            let script = format!("{}.click()", Self::scoped_lookup(step, selector));
            self.eval(&script)?;
            return Ok(());
        }
        let tab = self.tab()?;
        tab.wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| StepError::Failed(e.to_string()))?
            .click()
            .map_err(|e| StepError::Failed(e.to_string()))?;
        Ok(())
    }

    fn type_text(&self, step: &ActionStep, timeout: Duration) -> Result<(), StepError> {
        let selector = Self::selector_of(step)?;
        let value = Self::value_of(step)?;
        if step.frame.is_some() {
            let script = format!(
                "(function() {{ const el = {}; el.value = '{}'; el.dispatchEvent(new Event('input', {{bubbles: true}})); }})()",
                Self::scoped_lookup(step, selector),
                value.replace('\'', "\\'")
            );
            self.eval(&script)?;
            return Ok(());
        }
        let tab = self.tab()?;
        tab.wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| StepError::Failed(e.to_string()))?
            .click()
            .map_err(|e| StepError::Failed(e.to_string()))?;
        tab.type_str(value)
            .map_err(|e| StepError::Failed(e.to_string()))?;
        Ok(())
    }

    async fn screenshot(&self, path: PathBuf) -> Result<String, StepError> {
        let tab = self.tab()?;
        let bytes = tab
            .capture_screenshot(
                headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption::Png,
                None,
                None,
                true,
            )
            .map_err(|e| StepError::Failed(format!("screenshot failed: {}", e)))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StepError::Failed(format!("screenshot write failed: {}", e)))?;
        Ok(path.display().to_string())
    }

    fn scroll(&self, step: &ActionStep) -> Result<(), StepError> {
        let script = match &step.selector {
            Some(selector) => format!(
                "{}.scrollIntoView({{block: 'center'}})",
                Self::scoped_lookup(step, selector)
            ),
            None => {
                let amount = step
                    .value
                    .as_deref()
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(600);
                format!("window.scrollBy(0, {})", amount)
            }
        };
        self.eval(&script)?;
        Ok(())
    }

    fn select(&self, step: &ActionStep) -> Result<(), StepError> {
        let selector = Self::selector_of(step)?;
        let value = Self::value_of(step)?;
        let script = format!(
            "(function() {{ const el = {}; el.value = '{}'; el.dispatchEvent(new Event('change', {{bubbles: true}})); return el.value; }})()",
            Self::scoped_lookup(step, selector),
            value.replace('\'', "\\'")
        );
        let applied = self.eval(&script)?;
        if applied.as_str() != Some(value) {
            return Err(StepError::Failed(format!(
                "select failed: no option with value '{}' in {}",
                value, selector
            )));
        }
        Ok(())
    }

    fn hover(&self, step: &ActionStep, timeout: Duration) -> Result<(), StepError> {
        let selector = Self::selector_of(step)?;
        if step.frame.is_some() {
            let script = format!(
                "{}.dispatchEvent(new MouseEvent('mouseover', {{bubbles: true}}))",
                Self::scoped_lookup(step, selector)
            );
            self.eval(&script)?;
            return Ok(());
        }
        let tab = self.tab()?;
        tab.wait_for_element_with_custom_timeout(selector, timeout)
            .map_err(|e| StepError::Failed(e.to_string()))?
            .move_mouse_over()
            .map_err(|e| StepError::Failed(e.to_string()))?;
        Ok(())
    }

    fn press(&self, step: &ActionStep) -> Result<(), StepError> {
        let key = Self::value_of(step)?;
        let tab = self.tab()?;
        tab.press_key(key)
            .map_err(|e| StepError::Failed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ActionExecutor for ChromeSession {
    async fn execute(&self, step: &ActionStep, timeout_override: Option<u64>) -> StepResult {
        let timeout = Self::element_timeout(timeout_override);
        match step.action {
            ActionKind::Navigate => self.navigate(step).map(|_| None),
            ActionKind::Click => self.click(step, timeout).map(|_| None),
            ActionKind::Type => self.type_text(step, timeout).map(|_| None),
            ActionKind::Wait => {
                let millis = step.timeout.unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(None)
            }
            ActionKind::Screenshot => {
                let path = self.screenshot_path(step);
                self.screenshot(path).await.map(Some)
            }
            ActionKind::Scroll => self.scroll(step).map(|_| None),
            ActionKind::Select => self.select(step).map(|_| None),
            ActionKind::Hover => self.hover(step, timeout).map(|_| None),
            ActionKind::Press => self.press(step).map(|_| None),
        }
    }

    fn has_page(&self) -> bool {
        self.tab.is_some()
    }
}

pub struct ChromeProvider;

impl ChromeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ChromeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserProvider for ChromeProvider {
    type Session = ChromeSession;

    async fn initialize(&self, config: &RunnerConfig) -> anyhow::Result<Self::Session> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.browser.viewport.width, config.browser.viewport.height
        );
        let user_agent_arg = config
            .browser
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            std::ffi::OsStr::new("--no-sandbox"),
            std::ffi::OsStr::new("--disable-dev-shm-usage"),
            std::ffi::OsStr::new(&window_size_arg),
        ];
        if let Some(ref ua) = user_agent_arg {
            args.push(std::ffi::OsStr::new(ua));
        }
        for arg in &config.browser.args {
            args.push(std::ffi::OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.browser.headless)
            .args(args)
            .build()
            .map_err(|e| anyhow::anyhow!("launch options: {}", e))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| anyhow::anyhow!("browser launch failed: {}", e))?;
        let tab = browser
            .new_tab()
            .map_err(|e| anyhow::anyhow!("tab creation failed: {}", e))?;

        let screenshots_dir = config.output_dir.join("screenshots");
        if let Err(err) = std::fs::create_dir_all(&screenshots_dir) {
            tracing::warn!("could not create {}: {}", screenshots_dir.display(), err);
        }

        Ok(ChromeSession {
            _browser: browser,
            tab: Some(tab),
            screenshots_dir,
        })
    }

    async fn close(&self, mut session: Self::Session) -> anyhow::Result<()> {
        // Page first, then the browser process on drop. A failing tab close
        // must not keep the browser alive.
        if let Some(tab) = session.tab.take() {
            if let Err(err) = tab.close(true) {
                tracing::warn!("tab close failed: {}", err);
            }
        }
        drop(session);
        Ok(())
    }
}
