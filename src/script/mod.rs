pub mod validate;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub use validate::{ScriptValidator, ValidationReport};

/// The kinds of browser actions a script step can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Navigate,
    Click,
    Type,
    Wait,
    Screenshot,
    Scroll,
    Select,
    Hover,
    Press,
}

impl ActionKind {
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Click => "click",
            ActionKind::Type => "type",
            ActionKind::Wait => "wait",
            ActionKind::Screenshot => "screenshot",
            ActionKind::Scroll => "scroll",
            ActionKind::Select => "select",
            ActionKind::Hover => "hover",
            ActionKind::Press => "press",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One declarative browser instruction.
///
/// Which fields are required depends on the kind (navigate needs `url`,
/// type needs `selector` + `value`, ...). The validator enforces this before
/// the engine ever sees the step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStep {
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Failures of an optional step are logged but never abort the script.
    #[serde(default)]
    pub optional: bool,
    /// Scope the action to an iframe matched by this selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
}

impl ActionStep {
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            selector: None,
            value: None,
            url: None,
            timeout: None,
            description: None,
            optional: false,
            frame: None,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        let mut step = Self::new(ActionKind::Navigate);
        step.url = Some(url.into());
        step
    }

    pub fn click(selector: impl Into<String>) -> Self {
        let mut step = Self::new(ActionKind::Click);
        step.selector = Some(selector.into());
        step
    }

    pub fn type_text(selector: impl Into<String>, value: impl Into<String>) -> Self {
        let mut step = Self::new(ActionKind::Type);
        step.selector = Some(selector.into());
        step.value = Some(value.into());
        step
    }

    pub fn wait(millis: u64) -> Self {
        let mut step = Self::new(ActionKind::Wait);
        step.timeout = Some(millis);
        step
    }

    pub fn screenshot() -> Self {
        Self::new(ActionKind::Screenshot)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(timeout_ms);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Short human label for log lines: description if present, else the kind.
    pub fn display_name(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| self.action.label().to_string())
    }
}

/// An ordered, immutable sequence of steps with script-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationScript {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub steps: Vec<ActionStep>,
}

impl AutomationScript {
    pub fn new(name: impl Into<String>, steps: Vec<ActionStep>) -> Self {
        Self {
            name: name.into(),
            description: None,
            base_url: None,
            steps,
        }
    }

    pub fn from_json(json: &str) -> crate::errors::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> crate::errors::Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        Self::from_json(&raw)
    }
}

/// Per-step record kept in the final result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepLogRecord {
    pub step_number: usize,
    pub action: ActionKind,
    pub description: String,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Analysis of the error that ended a failed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAnalysis {
    pub kind: String,
    pub message: String,
    pub retryable: bool,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The outcome of one script run. Produced once, immutable.
///
/// `success: false` here means the script ran and failed at some step; a run
/// that could not start at all is a `RunnerError` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub steps_executed: usize,
    pub total_steps: usize,
    pub execution_time_ms: u64,
    pub screenshots: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub logs: Vec<StepLogRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_analysis: Option<ErrorAnalysis>,
    pub session_id: String,
    pub log_file_path: String,
}

impl ExecutionResult {
    /// Step number of the failure that ended the run, if any. Read from the
    /// step records rather than `steps_executed`, since optional-step
    /// failures do not advance that counter.
    pub fn failed_step_number(&self) -> Option<usize> {
        self.logs.iter().rev().find(|r| !r.success).map(|r| r.step_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_json_roundtrip_defaults() {
        let json = r#"{"action":"navigate","url":"https://example.com"}"#;
        let step: ActionStep = serde_json::from_str(json).unwrap();
        assert_eq!(step.action, ActionKind::Navigate);
        assert_eq!(step.url.as_deref(), Some("https://example.com"));
        assert!(!step.optional);
        assert!(step.selector.is_none());
    }

    #[test]
    fn test_script_from_json() {
        let json = r##"{
            "name": "login flow",
            "baseUrl": "https://example.com",
            "steps": [
                {"action": "navigate", "url": "https://example.com/login"},
                {"action": "type", "selector": "#user", "value": "alice"},
                {"action": "click", "selector": "#submit", "optional": true}
            ]
        }"##;
        let script = AutomationScript::from_json(json).unwrap();
        assert_eq!(script.name, "login flow");
        assert_eq!(script.steps.len(), 3);
        assert!(script.steps[2].optional);
    }

    #[test]
    fn test_failed_step_number_skips_optional_failures() {
        let record = |step_number: usize, success: bool| StepLogRecord {
            step_number,
            action: ActionKind::Click,
            description: format!("step {}", step_number),
            success,
            duration_ms: 1,
            error: (!success).then(|| "element not found".to_string()),
        };
        let result = ExecutionResult {
            success: false,
            // Step 2 was an optional failure, so only steps 1 and 3 counted.
            steps_executed: 2,
            total_steps: 5,
            execution_time_ms: 10,
            screenshots: Vec::new(),
            error: Some("element not found".to_string()),
            logs: vec![record(1, true), record(2, false), record(3, true), record(4, false)],
            error_analysis: None,
            session_id: "s".to_string(),
            log_file_path: String::new(),
        };
        assert_eq!(result.failed_step_number(), Some(4));

        let mut passed = result.clone();
        passed.success = true;
        passed.logs.retain(|r| r.success);
        assert_eq!(passed.failed_step_number(), None);
    }

    #[test]
    fn test_display_name_prefers_description() {
        let step = ActionStep::click("#go").with_description("press go");
        assert_eq!(step.display_name(), "press go");
        assert_eq!(ActionStep::wait(100).display_name(), "wait");
    }
}
