use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command};
use tracing::{error, info};

use webrunner::{AutomationScript, ChromeProvider, ExecutionEngine, RunnerConfig};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("webrunner")
        .about("Runs a declarative browser automation script")
        .arg(Arg::new("script").required(true).help("Path to the script JSON file"))
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .default_value("automation-output")
                .help("Directory for logs, screenshots and exports"),
        )
        .arg(
            Arg::new("headed")
                .long("headed")
                .action(ArgAction::SetTrue)
                .help("Run with a visible browser window"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log retry attempts and recoveries"),
        )
        .get_matches();

    let script_path = matches.get_one::<String>("script").expect("required arg");
    let script = match AutomationScript::from_file(script_path).await {
        Ok(script) => script,
        Err(err) => {
            error!("could not load script {}: {}", script_path, err);
            return ExitCode::FAILURE;
        }
    };

    let mut config = RunnerConfig::default();
    config.output_dir = PathBuf::from(matches.get_one::<String>("output-dir").expect("default"));
    config.browser.headless = !matches.get_flag("headed");
    config.verbose = matches.get_flag("verbose");

    info!("running script '{}' ({} steps)", script.name, script.steps.len());
    let engine = ExecutionEngine::new(ChromeProvider::new(), config);

    match engine.run(&script).await {
        Ok(result) if result.success => {
            info!(
                "completed {} steps in {}ms, log: {}",
                result.steps_executed, result.execution_time_ms, result.log_file_path
            );
            ExitCode::SUCCESS
        }
        Ok(result) => {
            match result.failed_step_number() {
                Some(step) => error!(
                    "failed at step {}/{}: {}",
                    step,
                    result.total_steps,
                    result.error.as_deref().unwrap_or("unknown error")
                ),
                None => error!(
                    "failed: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("could not run script: {}", err);
            ExitCode::FAILURE
        }
    }
}
