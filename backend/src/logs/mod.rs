//! Job-scoped logging and progress reporting.
//!
//! A [`JobLog`] belongs to one job. Every entry is printed to stdout,
//! broadcast to in-process subscribers, and, when a log file is attached
//! (batch mode), appended to it as a timestamped CSV row.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

/// Timestamp format of persistent log rows.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Log level for display
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Local time the entry was created
    pub timestamp: String,
    /// Optional indentation level (for nested logs)
    #[serde(default)]
    pub indent: u8,
}

impl LogEntry {
    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            indent: 0,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Log handle owned by one job.
#[derive(Debug, Clone)]
pub struct JobLog {
    sender: broadcast::Sender<LogEntry>,
    file: Option<PathBuf>,
    echo: bool,
}

impl JobLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            sender,
            file: None,
            echo: true,
        }
    }

    /// A log that only broadcasts (nothing on stdout).
    pub fn silent() -> Self {
        Self {
            echo: false,
            ..Self::new()
        }
    }

    /// Attach a persistent log file, writing its `DATETIME,MESSAGE` header.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["DATETIME", "MESSAGE"])?;
        writer.flush()?;
        self.file = Some(path);
        Ok(self)
    }

    /// Path of the persistent log, if any.
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Record an entry.
    pub fn log(&self, entry: LogEntry) {
        if self.echo {
            let prefix = match entry.level {
                LogLevel::Info => "   ",
                LogLevel::Success => "   ✓",
                LogLevel::Warning => "   ⚠️",
                LogLevel::Error => "   ❌",
            };
            let indent = "   ".repeat(entry.indent as usize);
            println!("{}{} {}", indent, prefix, entry.message);
        }

        if let Some(path) = &self.file {
            if let Err(e) = append_row(path, &entry) {
                eprintln!("   ⚠️ Cannot write log file {}: {}", path.display(), e);
            }
        }

        // Ignore if no receivers
        let _ = self.sender.send(entry);
    }

    /// Subscribe to entries logged from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }

    pub fn info(&self, msg: impl Into<String>) {
        self.log(LogEntry::info(msg));
    }

    pub fn success(&self, msg: impl Into<String>) {
        self.log(LogEntry::success(msg));
    }

    pub fn warning(&self, msg: impl Into<String>) {
        self.log(LogEntry::warning(msg));
    }

    pub fn error(&self, msg: impl Into<String>) {
        self.log(LogEntry::error(msg));
    }

    pub fn info_indent(&self, msg: impl Into<String>, indent: u8) {
        self.log(LogEntry::info(msg).with_indent(indent));
    }
}

impl Default for JobLog {
    fn default() -> Self {
        Self::new()
    }
}

fn append_row(path: &Path, entry: &LogEntry) -> Result<(), csv::Error> {
    let file = OpenOptions::new().append(true).open(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record([entry.timestamp.as_str(), entry.message.as_str()])?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Progress
// =============================================================================

/// Receives coarse row progress. Never affects control flow.
pub trait ProgressSink {
    fn update(&mut self, position: usize, total: usize, label: &str);
}

/// Discards progress.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _position: usize, _total: usize, _label: &str) {}
}

/// Reports progress through a [`JobLog`] every 10%.
#[derive(Debug)]
pub struct LogProgress<'a> {
    log: &'a JobLog,
    last_decile: Option<usize>,
}

impl<'a> LogProgress<'a> {
    pub fn new(log: &'a JobLog) -> Self {
        Self {
            log,
            last_decile: None,
        }
    }
}

impl ProgressSink for LogProgress<'_> {
    fn update(&mut self, position: usize, total: usize, label: &str) {
        if total == 0 {
            return;
        }
        let decile = position * 10 / total;
        if self.last_decile != Some(decile) {
            self.last_decile = Some(decile);
            self.log
                .info_indent(format!("{} row {} of {} ...", label, position, total), 1);
        }
    }
}
