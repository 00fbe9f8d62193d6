//! Log entries and where they are written

use super::{LogLevel, ParseLogSettingError};
use crate::middleware::AUDIT_TARGET;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io::{self, Write};
use std::str::FromStr;

/// Where logs are written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
}

impl FromStr for LogOutput {
    type Err = ParseLogSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            _ => Err(ParseLogSettingError {
                kind: "output",
                value: s.to_string(),
            }),
        }
    }
}

impl LogOutput {
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        match self {
            LogOutput::Stdout => writeln!(io::stdout().lock(), "{}", line),
            LogOutput::Stderr => writeln!(io::stderr().lock(), "{}", line),
        }
    }

    pub fn flush(&self) -> io::Result<()> {
        match self {
            LogOutput::Stdout => io::stdout().flush(),
            LogOutput::Stderr => io::stderr().flush(),
        }
    }
}

/// A structured log entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Target (usually module path)
    pub target: String,
    pub correlation_id: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
    pub location: Option<LogLocation>,
}

/// Source code location for a log entry
#[derive(Debug, Clone)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: String, target: String) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message,
            target,
            correlation_id: None,
            fields: HashMap::new(),
            location: None,
        }
    }

    /// Build an entry from a `log::Record`
    ///
    /// Records on the audit target carrying a JSON object become a field set
    /// with message `audit` and the object's `requestId` as correlation id.
    pub fn from_log_record(record: &log::Record, context_fields: &HashMap<String, String>) -> Self {
        let mut entry = Self::new(
            record.level().into(),
            record.args().to_string(),
            record.target().to_string(),
        );

        if let (Some(file), Some(line)) = (record.file(), record.line()) {
            entry.location = Some(LogLocation {
                file: file.to_string(),
                line,
            });
        }

        for (key, value) in context_fields {
            entry.fields.insert(key.clone(), serde_json::Value::String(value.clone()));
        }

        if entry.target == AUDIT_TARGET {
            entry.lift_audit_payload();
        }

        entry
    }

    fn lift_audit_payload(&mut self) {
        let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(&self.message) else {
            return;
        };
        self.correlation_id = fields.get("requestId").and_then(|v| v.as_str()).map(String::from);
        self.fields.extend(fields);
        self.message = "audit".to_string();
    }

    pub fn with_field(mut self, key: &str, value: serde_json::Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn with_correlation_id(mut self, id: String) -> Self {
        self.correlation_id = Some(id);
        self
    }
}
