//! Per-session structured logging.
//!
//! One `SessionLogger` lives for the duration of one script run. Admitted
//! entries are buffered in memory, mirrored to the console through `tracing`,
//! and appended to a per-session log file by a single writer task. The
//! writer consumes a channel, so file appends are fire-and-forget for the
//! caller but still land in emit order; a crash mid-session can lose the
//! tail of the file, never reorder it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::RunnerConfig;
use crate::errors::{Result, RunnerError};
use crate::script::validate::ValidationReport;

/// Severity of a log entry. Entries below the configured minimum are
/// dropped before any sink sees them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn label(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            LogLevel::Debug => "🔍",
            LogLevel::Info => "ℹ️",
            LogLevel::Warn => "⚠️",
            LogLevel::Error => "❌",
        }
    }
}

/// What part of the run an entry belongs to. Step and browser entries make
/// up the execution timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    Session,
    Step,
    Browser,
    Validation,
    Retry,
    Screenshot,
    System,
}

impl LogCategory {
    pub fn label(&self) -> &'static str {
        match self {
            LogCategory::Session => "session",
            LogCategory::Step => "step",
            LogCategory::Browser => "browser",
            LogCategory::Validation => "validation",
            LogCategory::Retry => "retry",
            LogCategory::Screenshot => "screenshot",
            LogCategory::System => "system",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: LogCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_number: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotKind {
    Success,
    Error,
    Debug,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenshotInfo {
    pub filename: String,
    pub path: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_number: Option<usize>,
    pub kind: ScreenshotKind,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub total_entries: usize,
    pub debug_count: usize,
    pub info_count: usize,
    pub warn_count: usize,
    pub error_count: usize,
    pub screenshots: Vec<ScreenshotInfo>,
    pub duration_ms: u64,
    pub log_file_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

enum WriterMsg {
    Line(String),
    Shutdown,
}

pub struct SessionLogger {
    session_id: String,
    output_dir: PathBuf,
    screenshots_dir: PathBuf,
    log_file_path: PathBuf,
    min_level: LogLevel,
    entries: Mutex<Vec<LogEntry>>,
    screenshots: Mutex<Vec<ScreenshotInfo>>,
    writer_tx: mpsc::UnboundedSender<WriterMsg>,
    writer_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SessionLogger {
    /// Builds the logger for one session. Must be called inside a tokio
    /// runtime; the file writer runs as a spawned task.
    pub fn new(config: &RunnerConfig) -> Self {
        let session_id = generate_session_id();
        let output_dir = config.output_dir.clone();
        let screenshots_dir = output_dir.join("screenshots");
        let log_file_path = output_dir.join(format!("execution-{}.log", session_id));

        // Best effort: a missing output directory degrades to console-only
        // logging instead of failing the run.
        for dir in [&output_dir, &screenshots_dir] {
            if let Err(err) = std::fs::create_dir_all(dir) {
                tracing::warn!("could not create {}: {}", dir.display(), err);
            }
        }

        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        let writer_handle = tokio::spawn(file_writer(
            log_file_path.clone(),
            writer_rx,
            config.max_log_size_bytes,
            config.max_rotated_logs,
        ));

        Self {
            session_id,
            output_dir,
            screenshots_dir,
            log_file_path,
            min_level: config.min_log_level,
            entries: Mutex::new(Vec::new()),
            screenshots: Mutex::new(Vec::new()),
            writer_tx,
            writer_handle: Mutex::new(Some(writer_handle)),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log_file_path(&self) -> &Path {
        &self.log_file_path
    }

    pub fn screenshots_dir(&self) -> &Path {
        &self.screenshots_dir
    }

    pub fn debug(&self, category: LogCategory, message: impl Into<String>) {
        self.emit(LogLevel::Debug, category, message.into(), None, None, None, None);
    }

    pub fn info(&self, category: LogCategory, message: impl Into<String>) {
        self.emit(LogLevel::Info, category, message.into(), None, None, None, None);
    }

    pub fn warn(&self, category: LogCategory, message: impl Into<String>) {
        self.emit(LogLevel::Warn, category, message.into(), None, None, None, None);
    }

    pub fn error(&self, category: LogCategory, message: impl Into<String>) {
        self.emit(LogLevel::Error, category, message.into(), None, None, None, None);
    }

    /// Step entry with outcome and elapsed time.
    pub fn step(
        &self,
        step_number: usize,
        message: impl Into<String>,
        success: bool,
        duration_ms: u64,
    ) {
        let level = if success { LogLevel::Info } else { LogLevel::Error };
        self.emit(
            level,
            LogCategory::Step,
            message.into(),
            None,
            Some(step_number),
            Some(duration_ms),
            None,
        );
    }

    pub fn browser_event(&self, message: impl Into<String>, payload: Option<Value>) {
        self.emit(
            LogLevel::Info,
            LogCategory::Browser,
            message.into(),
            payload,
            None,
            None,
            None,
        );
    }

    pub fn retry_notice(&self, step_number: Option<usize>, message: impl Into<String>) {
        self.emit(
            LogLevel::Warn,
            LogCategory::Retry,
            message.into(),
            None,
            step_number,
            None,
            None,
        );
    }

    pub fn validation_result(&self, report: &ValidationReport) {
        for error in &report.errors {
            self.error(LogCategory::Validation, format!("validation error: {}", error));
        }
        for warning in &report.warnings {
            self.warn(LogCategory::Validation, format!("validation warning: {}", warning));
        }
        if report.is_valid() {
            self.info(
                LogCategory::Validation,
                format!("script valid ({} warnings)", report.warnings.len()),
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &self,
        level: LogLevel,
        category: LogCategory,
        message: String,
        payload: Option<Value>,
        step_number: Option<usize>,
        duration_ms: Option<u64>,
        screenshot: Option<String>,
    ) {
        if level < self.min_level {
            return;
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            category,
            message,
            payload,
            step_number,
            duration_ms,
            screenshot,
        };

        self.console_mirror(&entry);

        let line = format_file_line(&entry);
        // A closed writer only costs us the file sink; never propagate.
        if self.writer_tx.send(WriterMsg::Line(line)).is_err() {
            tracing::warn!("session log writer is gone, entry kept in memory only");
        }

        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }

    fn console_mirror(&self, entry: &LogEntry) {
        let text = format!("{} [{}] {}", entry.level.icon(), entry.category.label(), entry.message);
        match entry.level {
            LogLevel::Debug => tracing::debug!("{}", text),
            LogLevel::Info => tracing::info!("{}", text),
            LogLevel::Warn => tracing::warn!("{}", text),
            LogLevel::Error => tracing::error!("{}", text),
        }
    }

    /// Records a screenshot file the session produced and logs it.
    pub async fn register_screenshot(
        &self,
        path: impl AsRef<Path>,
        step_number: Option<usize>,
        kind: ScreenshotKind,
    ) {
        let path = path.as_ref();
        let size_bytes = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let info = ScreenshotInfo {
            filename: filename.clone(),
            path: path.display().to_string(),
            timestamp: Utc::now(),
            step_number,
            kind,
            size_bytes,
        };

        if let Ok(mut screenshots) = self.screenshots.lock() {
            screenshots.push(info);
        }

        self.emit(
            LogLevel::Info,
            LogCategory::Screenshot,
            format!("captured {} ({} bytes)", filename, size_bytes),
            None,
            step_number,
            None,
            Some(path.display().to_string()),
        );
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn screenshots(&self) -> Vec<ScreenshotInfo> {
        self.screenshots.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Chronological subsequence of step and browser entries.
    pub fn timeline(&self) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| matches!(e.category, LogCategory::Step | LogCategory::Browser))
            .collect()
    }

    pub fn summary(&self) -> SessionSummary {
        let entries = self.entries();
        let duration_ms = match (entries.first(), entries.last()) {
            (Some(first), Some(last)) if entries.len() > 1 => (last.timestamp - first.timestamp)
                .num_milliseconds()
                .max(0) as u64,
            _ => 0,
        };
        let count = |level: LogLevel| entries.iter().filter(|e| e.level == level).count();

        SessionSummary {
            session_id: self.session_id.clone(),
            total_entries: entries.len(),
            debug_count: count(LogLevel::Debug),
            info_count: count(LogLevel::Info),
            warn_count: count(LogLevel::Warn),
            error_count: count(LogLevel::Error),
            screenshots: self.screenshots(),
            duration_ms,
            log_file_path: self.log_file_path.display().to_string(),
        }
    }

    /// Writes the session's log data to
    /// `{outputDir}/execution-{sessionId}-export.{json|csv}`.
    pub async fn export(&self, format: ExportFormat) -> Result<PathBuf> {
        let (ext, contents) = match format {
            ExportFormat::Json => {
                let doc = serde_json::json!({
                    "sessionId": self.session_id,
                    "summary": self.summary(),
                    "entries": self.entries(),
                    "timeline": self.timeline(),
                });
                let body = serde_json::to_string_pretty(&doc)
                    .map_err(|e| RunnerError::ExportFailed(e.to_string()))?;
                ("json", body)
            }
            ExportFormat::Csv => ("csv", render_csv(&self.entries())),
        };

        let path = self
            .output_dir
            .join(format!("execution-{}-export.{}", self.session_id, ext));
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| RunnerError::ExportFailed(e.to_string()))?;
        self.info(
            LogCategory::System,
            format!("exported session log to {}", path.display()),
        );
        Ok(path)
    }

    /// Logical finalize: appends one summary entry and drains the file
    /// writer so the log file is complete on disk. Emitting after cleanup
    /// still works but only reaches the console and the memory buffer.
    pub async fn cleanup(&self) {
        let summary = self.summary();
        let payload = serde_json::to_value(&summary).ok();
        self.emit(
            LogLevel::Info,
            LogCategory::Session,
            format!(
                "session completed: {} entries logged, {} screenshots",
                summary.total_entries,
                summary.screenshots.len()
            ),
            payload,
            None,
            None,
            None,
        );

        let _ = self.writer_tx.send(WriterMsg::Shutdown);
        let handle = self.writer_handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

fn generate_session_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%d-%H%M%S"), &suffix[..8])
}

fn format_file_line(entry: &LogEntry) -> String {
    let mut line = format!(
        "[{}] [{:<5}] [{}]",
        entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        entry.level.label(),
        entry.category.label(),
    );
    if let Some(step) = entry.step_number {
        line.push_str(&format!(" [step {}]", step));
    }
    line.push(' ');
    line.push_str(&entry.message);
    if let Some(duration) = entry.duration_ms {
        line.push_str(&format!(" ({}ms)", duration));
    }
    if let Some(payload) = &entry.payload {
        line.push_str(" | ");
        line.push_str(&payload.to_string());
    }
    line.push('\n');
    line
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn render_csv(entries: &[LogEntry]) -> String {
    let mut out = String::from("\"timestamp\",\"severity\",\"category\",\"step\",\"message\",\"duration\"\n");
    for entry in entries {
        let row = [
            entry.timestamp.to_rfc3339(),
            entry.level.label().to_string(),
            entry.category.label().to_string(),
            entry.step_number.map(|s| s.to_string()).unwrap_or_default(),
            entry.message.clone(),
            entry.duration_ms.map(|d| d.to_string()).unwrap_or_default(),
        ];
        let row: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Single-consumer file sink. Appends lines in channel order, rotating the
/// file (rename, then recreate) once it passes `max_size` and pruning old
/// rotations beyond `max_rotated`. All file errors degrade to console
/// warnings so logging can never take the run down.
async fn file_writer(
    path: PathBuf,
    mut rx: mpsc::UnboundedReceiver<WriterMsg>,
    max_size: u64,
    max_rotated: usize,
) {
    let mut file = open_append(&path).await;

    while let Some(msg) = rx.recv().await {
        match msg {
            WriterMsg::Line(line) => {
                if let Some(f) = file.as_mut() {
                    if let Err(err) = f.write_all(line.as_bytes()).await {
                        tracing::warn!("session log write failed: {}", err);
                        continue;
                    }
                    let _ = f.flush().await;

                    let size = f.metadata().await.map(|m| m.len()).unwrap_or(0);
                    if size > max_size {
                        file = rotate(&path, max_rotated).await;
                    }
                }
            }
            WriterMsg::Shutdown => break,
        }
    }

    if let Some(mut f) = file {
        let _ = f.flush().await;
    }
}

async fn open_append(path: &Path) -> Option<tokio::fs::File> {
    match tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
    {
        Ok(f) => Some(f),
        Err(err) => {
            tracing::warn!("could not open session log {}: {}", path.display(), err);
            None
        }
    }
}

async fn rotate(path: &Path, max_rotated: usize) -> Option<tokio::fs::File> {
    let rotated = rotated_name(path);
    if let Err(err) = tokio::fs::rename(path, &rotated).await {
        tracing::warn!("log rotation failed: {}", err);
        // Keep appending to the oversized file rather than losing entries.
        return open_append(path).await;
    }
    prune_rotated(path, max_rotated).await;
    open_append(path).await
}

fn rotated_name(path: &Path) -> PathBuf {
    // Timestamps alone can collide under rapid rotation, and a rename onto an
    // existing rotation would silently overwrite it. The sequence number keeps
    // every rotated name unique.
    static ROTATION_SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = ROTATION_SEQ.fetch_add(1, Ordering::Relaxed);
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    let rotated = format!(
        "{}-{}-{:04}.log",
        stem,
        Utc::now().format("%Y%m%d%H%M%S%3f"),
        seq
    );
    path.with_file_name(rotated)
}

async fn prune_rotated(path: &Path, max_rotated: usize) {
    let Some(dir) = path.parent() else { return };
    let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
        return;
    };
    let prefix = format!("{}-", stem);

    let Ok(mut read_dir) = tokio::fs::read_dir(dir).await else { return };
    let mut rotated = Vec::new();
    while let Ok(Some(entry)) = read_dir.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(&prefix) && name.ends_with(".log") {
            let modified = entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok());
            rotated.push((entry.path(), modified));
        }
    }

    // Newest kept, oldest removed once past the retention count.
    rotated.sort_by(|a, b| b.1.cmp(&a.1));
    for (old, _) in rotated.into_iter().skip(max_rotated) {
        let _ = tokio::fs::remove_file(old).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RunnerConfig;

    fn test_config(min_level: LogLevel) -> RunnerConfig {
        let dir = std::env::temp_dir().join(format!("webrunner-logtest-{}", Uuid::new_v4()));
        RunnerConfig {
            min_log_level: min_level,
            output_dir: dir,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_min_severity_drops_debug_everywhere() {
        let logger = SessionLogger::new(&test_config(LogLevel::Info));
        logger.debug(LogCategory::System, "dropped");
        logger.info(LogCategory::System, "kept info");
        logger.warn(LogCategory::System, "kept warn");
        logger.error(LogCategory::System, "kept error");
        logger.cleanup().await;

        let entries = logger.entries();
        // 3 explicit entries plus the cleanup summary entry.
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(|e| e.level >= LogLevel::Info));

        let file = tokio::fs::read_to_string(logger.log_file_path()).await.unwrap();
        assert!(!file.contains("dropped"));
        assert!(file.contains("kept info"));
        assert!(file.contains("kept error"));
    }

    #[tokio::test]
    async fn test_file_preserves_append_order() {
        let logger = SessionLogger::new(&test_config(LogLevel::Debug));
        for i in 0..20 {
            logger.info(LogCategory::System, format!("entry-{:02}", i));
        }
        logger.cleanup().await;

        let file = tokio::fs::read_to_string(logger.log_file_path()).await.unwrap();
        let positions: Vec<usize> = (0..20)
            .map(|i| file.find(&format!("entry-{:02}", i)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_rotation_recreates_file_and_prunes() {
        let mut config = test_config(LogLevel::Debug);
        config.max_log_size_bytes = 200;
        config.max_rotated_logs = 2;
        let logger = SessionLogger::new(&config);

        for i in 0..200 {
            logger.info(LogCategory::System, format!("filler entry number {:03}", i));
        }
        logger.cleanup().await;

        // The current file was recreated after the last rotation, so it holds
        // at most one entry past the size cap.
        let current = tokio::fs::metadata(logger.log_file_path()).await.unwrap();
        assert!(current.len() < 500);

        let stem = logger
            .log_file_path()
            .file_stem()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        let prefix = format!("{}-", stem);
        let dir = logger.log_file_path().parent().unwrap();

        let mut rotated = Vec::new();
        let mut read_dir = tokio::fs::read_dir(dir).await.unwrap();
        while let Some(entry) = read_dir.next_entry().await.unwrap() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && name.ends_with(".log") {
                rotated.push(entry.path());
            }
        }
        // 200 tiny-cap entries force dozens of rotations, each with a distinct
        // name, but retention keeps only the configured count.
        assert_eq!(rotated.len(), 2);

        // The final cleanup entry survives somewhere in the retained files.
        let mut combined = tokio::fs::read_to_string(logger.log_file_path())
            .await
            .unwrap();
        for path in &rotated {
            combined.push_str(&tokio::fs::read_to_string(path).await.unwrap());
        }
        assert!(combined.contains("session completed"));
    }

    #[test]
    fn test_rotated_names_never_collide() {
        let path = Path::new("/tmp/execution-abc.log");
        let a = rotated_name(path);
        let b = rotated_name(path);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_summary_counts_and_duration() {
        let logger = SessionLogger::new(&test_config(LogLevel::Debug));
        let empty = logger.summary();
        assert_eq!(empty.duration_ms, 0);
        assert_eq!(empty.total_entries, 0);

        logger.info(LogCategory::System, "one");
        logger.warn(LogCategory::System, "two");
        logger.error(LogCategory::Step, "three");
        let summary = logger.summary();
        assert_eq!(summary.total_entries, 3);
        assert_eq!(summary.info_count, 1);
        assert_eq!(summary.warn_count, 1);
        assert_eq!(summary.error_count, 1);
        logger.cleanup().await;
    }

    #[tokio::test]
    async fn test_timeline_filters_to_step_and_browser() {
        let logger = SessionLogger::new(&test_config(LogLevel::Debug));
        logger.info(LogCategory::System, "system");
        logger.step(1, "step one", true, 12);
        logger.browser_event("browser started", None);
        logger.info(LogCategory::Session, "session");

        let timeline = logger.timeline();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].category, LogCategory::Step);
        assert_eq!(timeline[1].category, LogCategory::Browser);
        logger.cleanup().await;
    }

    #[tokio::test]
    async fn test_csv_export_escapes_quotes_six_fields() {
        let logger = SessionLogger::new(&test_config(LogLevel::Debug));
        logger.step(2, r#"clicked "submit" button"#, true, 40);
        let path = logger.export(ExportFormat::Csv).await.unwrap();
        logger.cleanup().await;

        let csv = tokio::fs::read_to_string(path).await.unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert_eq!(header.matches("\",\"").count(), 5);

        let row = lines.next().unwrap();
        assert!(row.contains(r#"clicked ""submit"" button"#));
        assert!(row.starts_with('"') && row.ends_with('"'));
        assert_eq!(row.matches("\",\"").count(), 5);
    }

    #[tokio::test]
    async fn test_json_export_shape() {
        let logger = SessionLogger::new(&test_config(LogLevel::Debug));
        logger.step(1, "only step", true, 5);
        let path = logger.export(ExportFormat::Json).await.unwrap();
        logger.cleanup().await;

        let raw = tokio::fs::read_to_string(path).await.unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(doc["sessionId"], logger.session_id());
        assert!(doc["summary"]["totalEntries"].as_u64().unwrap() >= 1);
        assert!(doc["entries"].is_array());
        assert_eq!(doc["timeline"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_screenshot_tracks_size() {
        let config = test_config(LogLevel::Debug);
        let logger = SessionLogger::new(&config);
        let shot = logger.screenshots_dir().join("shot-1.png");
        tokio::fs::write(&shot, b"12345").await.unwrap();

        logger.register_screenshot(&shot, Some(1), ScreenshotKind::Success).await;
        logger.cleanup().await;

        let shots = logger.screenshots();
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].size_bytes, 5);
        assert_eq!(shots[0].filename, "shot-1.png");
        assert_eq!(shots[0].kind, ScreenshotKind::Success);
        assert_eq!(logger.summary().screenshots.len(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_appends_final_summary_entry() {
        let logger = SessionLogger::new(&test_config(LogLevel::Info));
        logger.info(LogCategory::System, "work");
        logger.cleanup().await;

        let entries = logger.entries();
        let last = entries.last().unwrap();
        assert_eq!(last.category, LogCategory::Session);
        assert!(last.message.contains("session completed"));

        let file = tokio::fs::read_to_string(logger.log_file_path()).await.unwrap();
        assert!(file.contains("session completed"));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
    }
}
