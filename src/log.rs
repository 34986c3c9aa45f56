//! Leveled, timestamped run log.
//!
//! The migration engine only talks to a [`LogSink`]; how lines are shown is
//! up to the sink. [`ConsoleLog`] writes to stderr, [`MemoryLog`] keeps lines
//! for inspection.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Local};
use colored::Colorize;
use serde::Serialize;
use serde_json::json;

use crate::output::Format;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    fn prefix(self) -> String {
        match self {
            Self::Info => "info".blue().to_string(),
            Self::Success => " ok ".green().to_string(),
            Self::Warn => "warn".yellow().to_string(),
            Self::Error => " ERR".red().bold().to_string(),
        }
    }
}

pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    fn success(&self, message: &str) {
        self.log(Level::Success, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Writes each line to stderr as it happens.
pub struct ConsoleLog {
    format: Format,
}

impl ConsoleLog {
    pub fn new(format: Format) -> Self {
        Self { format }
    }
}

impl LogSink for ConsoleLog {
    fn log(&self, level: Level, message: &str) {
        let now = Local::now();
        match self.format {
            Format::Json => eprintln!(
                "{}",
                json!({
                    "time": now.to_rfc3339(),
                    "level": level.as_str(),
                    "message": message,
                })
            ),
            Format::Pretty => eprintln!(
                "{} {}  {}",
                now.format("%H:%M:%S").to_string().dimmed(),
                level.prefix(),
                message
            ),
            Format::Minimal => eprintln!("{} {}", level.as_str(), message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogLine {
    pub time: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

/// Keeps every line in memory.
#[derive(Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<LogLine>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Messages logged at `level`, oldest first.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| l.level == level)
            .map(|l| l.message)
            .collect()
    }
}

impl LogSink for MemoryLog {
    fn log(&self, level: Level, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(LogLine {
                time: Local::now(),
                level,
                message: message.to_string(),
            });
        }
    }
}

/// Forwards to an inner sink while tallying warnings and errors.
pub struct CountingLog<'a> {
    inner: &'a dyn LogSink,
    warnings: AtomicUsize,
    errors: AtomicUsize,
}

impl<'a> CountingLog<'a> {
    pub fn new(inner: &'a dyn LogSink) -> Self {
        Self {
            inner,
            warnings: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        }
    }

    pub fn warnings(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}

impl LogSink for CountingLog<'_> {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Warn => {
                self.warnings.fetch_add(1, Ordering::Relaxed);
            }
            Level::Error => {
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        self.inner.log(level, message);
    }
}
