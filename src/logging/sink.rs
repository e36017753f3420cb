use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity of a recorded line, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown severity `{0}`")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

/// The logging capability handed to anything that needs to report.
///
/// Implementations must be callable from any thread; a task body records
/// from its own thread while the caller may be reading the same sink.
pub trait LogSink: Send + Sync {
    fn record(&self, severity: Severity, component: &str, message: &str);
}

/// One line captured by a sink that keeps what it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub severity: Severity,
    pub component: String,
    pub message: String,
    pub thread: Option<String>,
    pub at: DateTime<Utc>,
}

impl LogRecord {
    /// Builds a record stamped with the current thread's name and time.
    pub fn now(severity: Severity, component: &str, message: &str) -> Self {
        Self {
            severity,
            component: component.to_string(),
            message: message.to_string(),
            thread: std::thread::current().name().map(str::to_string),
            at: Utc::now(),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:>5} [{}] {}: {}",
            self.at.format("%H:%M:%S%.3f"),
            self.severity.as_str().to_ascii_uppercase(),
            self.thread.as_deref().unwrap_or("unnamed"),
            self.component,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_severity_case_insensitively() {
        assert_eq!("INFO".parse::<Severity>(), Ok(Severity::Info));
        assert_eq!(" Warning ".parse::<Severity>(), Ok(Severity::Warn));
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn display_includes_severity_and_component() {
        let record = LogRecord::now(Severity::Info, "thread_creation", "Thread is Running");
        let line = record.to_string();
        assert!(line.contains("INFO"));
        assert!(line.contains("thread_creation: Thread is Running"));
    }

    #[test]
    fn record_serializes_severity_lowercase() {
        let record = LogRecord::now(Severity::Error, "task_runner", "boom");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["severity"], "error");
        assert_eq!(json["component"], "task_runner");
    }
}
