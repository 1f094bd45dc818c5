use url::Url;

use super::{ActionKind, ActionStep, AutomationScript};

/// Outcome of structural script validation.
///
/// Errors are fatal: the engine refuses to run the script and never opens a
/// browser. Warnings are advisory and only show up in the session log.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct ScriptValidator;

impl ScriptValidator {
    pub fn validate(script: &AutomationScript) -> ValidationReport {
        let mut report = ValidationReport::default();

        if script.name.trim().is_empty() {
            report.errors.push("script name must not be empty".to_string());
        }

        if script.steps.is_empty() {
            report.errors.push("script has no steps".to_string());
        }

        if let Some(base_url) = &script.base_url {
            if Url::parse(base_url).is_err() {
                report
                    .warnings
                    .push(format!("baseUrl is not a parseable URL: {}", base_url));
            }
        }

        for (i, step) in script.steps.iter().enumerate() {
            Self::validate_step(step, i + 1, &mut report);
        }

        report
    }

    fn validate_step(step: &ActionStep, step_number: usize, report: &mut ValidationReport) {
        let require_selector = |report: &mut ValidationReport| {
            if step.selector.as_deref().map_or(true, |s| s.trim().is_empty()) {
                report.errors.push(format!(
                    "step {}: {} requires a selector",
                    step_number, step.action
                ));
            }
        };

        match step.action {
            ActionKind::Navigate => match step.url.as_deref() {
                None => report
                    .errors
                    .push(format!("step {}: navigate requires a url", step_number)),
                Some(url) => {
                    if Url::parse(url).is_err() {
                        report
                            .errors
                            .push(format!("step {}: navigate url is invalid: {}", step_number, url));
                    }
                }
            },
            ActionKind::Click | ActionKind::Hover => require_selector(report),
            ActionKind::Type | ActionKind::Select => {
                require_selector(report);
                if step.value.is_none() {
                    report.errors.push(format!(
                        "step {}: {} requires a value",
                        step_number, step.action
                    ));
                }
            }
            ActionKind::Press => {
                if step.value.as_deref().map_or(true, |v| v.is_empty()) {
                    report
                        .errors
                        .push(format!("step {}: press requires a key name in value", step_number));
                }
            }
            ActionKind::Wait => match step.timeout {
                None => report
                    .errors
                    .push(format!("step {}: wait requires a timeout", step_number)),
                Some(0) => report
                    .warnings
                    .push(format!("step {}: wait timeout of 0ms has no effect", step_number)),
                Some(t) if t > 60_000 => report.warnings.push(format!(
                    "step {}: wait of {}ms is unusually long",
                    step_number, t
                )),
                Some(_) => {}
            },
            ActionKind::Screenshot | ActionKind::Scroll => {}
        }

        if step.description.is_none() {
            report.warnings.push(format!(
                "step {}: no description, logs will show the raw action kind",
                step_number
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_script_passes() {
        let script = AutomationScript::new(
            "ok",
            vec![
                ActionStep::navigate("https://example.com").with_description("open"),
                ActionStep::click("#go").with_description("go"),
            ],
        );
        let report = ScriptValidator::validate(&script);
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_empty_name_and_steps_are_errors() {
        let script = AutomationScript::new("  ", vec![]);
        let report = ScriptValidator::validate(&script);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_navigate_without_url_is_error() {
        let script = AutomationScript::new("s", vec![ActionStep::new(ActionKind::Navigate)]);
        let report = ScriptValidator::validate(&script);
        assert!(report.errors.iter().any(|e| e.contains("requires a url")));
    }

    #[test]
    fn test_navigate_with_garbage_url_is_error() {
        let script = AutomationScript::new("s", vec![ActionStep::navigate("not a url")]);
        let report = ScriptValidator::validate(&script);
        assert!(!report.is_valid());
    }

    #[test]
    fn test_type_requires_selector_and_value() {
        let mut step = ActionStep::new(ActionKind::Type);
        step.selector = Some("#input".to_string());
        let script = AutomationScript::new("s", vec![step]);
        let report = ScriptValidator::validate(&script);
        assert!(report.errors.iter().any(|e| e.contains("requires a value")));
    }

    #[test]
    fn test_missing_description_is_only_a_warning() {
        let script = AutomationScript::new("s", vec![ActionStep::click("#x")]);
        let report = ScriptValidator::validate(&script);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.contains("no description")));
    }
}
