//! Log line formats

use super::destinations::LogEntry;
use super::ParseLogSettingError;
use std::str::FromStr;

/// How log lines are rendered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// `{"timestamp":"...","level":"INFO","message":"...","target":"..."}`
    Json,

    /// `2024-01-15 10:30:00.000 INFO  [rampart_core::guard] Guard denied key=value`
    Human,

    /// `timestamp=... level=INFO target=... message="..." key=value`
    Logfmt,
}

impl FromStr for LogFormat {
    type Err = ParseLogSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "human" | "text" => Ok(LogFormat::Human),
            "logfmt" => Ok(LogFormat::Logfmt),
            _ => Err(ParseLogSettingError {
                kind: "format",
                value: s.to_string(),
            }),
        }
    }
}

impl LogFormat {
    pub fn format_entry(&self, entry: &LogEntry) -> String {
        match self {
            LogFormat::Json => format_json(entry),
            LogFormat::Human => format_human(entry),
            LogFormat::Logfmt => format_logfmt(entry),
        }
    }
}

fn level_name(entry: &LogEntry) -> String {
    format!("{:?}", entry.level).to_uppercase()
}

/// Sorted so output is stable
fn sorted_fields(entry: &LogEntry) -> Vec<(&String, &serde_json::Value)> {
    let mut fields: Vec<_> = entry.fields.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));
    fields
}

fn format_json(entry: &LogEntry) -> String {
    use serde_json::Value;

    let mut json = serde_json::Map::new();
    let timestamp = entry.timestamp.to_rfc3339();
    json.insert("timestamp".to_string(), Value::String(timestamp));
    json.insert("level".to_string(), Value::String(level_name(entry)));
    json.insert("message".to_string(), Value::String(entry.message.clone()));
    json.insert("target".to_string(), Value::String(entry.target.clone()));

    if let Some(correlation_id) = &entry.correlation_id {
        let correlation_id = Value::String(correlation_id.clone());
        json.insert("correlation_id".to_string(), correlation_id);
    }

    if let Some(location) = &entry.location {
        json.insert("file".to_string(), Value::String(location.file.clone()));
        json.insert("line".to_string(), Value::from(location.line));
    }

    for (key, value) in &entry.fields {
        json.insert(key.clone(), value.clone());
    }

    serde_json::to_string(&json).unwrap_or_else(|_| "Failed to serialize log entry".to_string())
}

fn format_human(entry: &LogEntry) -> String {
    let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
    let mut message = format!(
        "{} {:5} [{}] {}",
        timestamp,
        level_name(entry),
        entry.target,
        entry.message
    );

    if let Some(correlation_id) = &entry.correlation_id {
        message.push_str(&format!(" correlation_id={}", correlation_id));
    }

    for (key, value) in sorted_fields(entry) {
        let value_str = match value {
            serde_json::Value::String(s) => s.clone(),
            _ => value.to_string(),
        };
        message.push_str(&format!(" {}={}", key, value_str));
    }

    if let Some(location) = &entry.location {
        message.push_str(&format!(" ({}:{})", location.file, location.line));
    }

    message
}

fn format_logfmt(entry: &LogEntry) -> String {
    let quote = |s: &str| format!("\"{}\"", s.replace('"', "\\\""));

    let mut parts = vec![
        format!("timestamp={}", entry.timestamp.to_rfc3339()),
        format!("level={}", level_name(entry)),
        format!("target={}", entry.target),
        format!("message={}", quote(&entry.message)),
    ];

    if let Some(correlation_id) = &entry.correlation_id {
        parts.push(format!("correlation_id={}", correlation_id));
    }

    for (key, value) in sorted_fields(entry) {
        let value_str = match value {
            serde_json::Value::String(s) => quote(s),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => quote(&value.to_string()),
        };
        parts.push(format!("{}={}", key, value_str));
    }

    parts.join(" ")
}
