//! Structured logging on top of the `log` facade
//!
//! Install the process-wide logger once at startup, then use the standard
//! macros everywhere:
//!
//! ```rust,no_run
//! use rampart_core::config::LoggingConfig;
//!
//! let config = LoggingConfig::default().with_context_field("service", "billing");
//! rampart_core::logging::init_logging(&config).unwrap();
//!
//! log::info!("Pipeline ready");
//! ```
//!
//! Audit entries written on the `rampart::audit` target are JSON objects; the
//! logger lifts their keys into structured fields and uses `requestId` as the
//! entry's correlation id.

pub mod destinations;
pub mod formatter;

pub use destinations::{LogEntry, LogOutput};
pub use formatter::LogFormat;

use crate::config::LoggingConfig;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Once;

static INIT: Once = Once::new();

/// Unrecognized level, format or output name
#[derive(thiserror::Error, Debug)]
#[error("unrecognized log {kind} '{value}'")]
pub struct ParseLogSettingError {
    pub kind: &'static str,
    pub value: String,
}

/// Log levels in order of severity
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = ParseLogSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(ParseLogSettingError {
                kind: "level",
                value: s.to_string(),
            }),
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Trace => LogLevel::Trace,
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Initialize the process-wide logger
///
/// Settings are validated on every call; only the first successful call
/// installs the logger.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let logger = RampartLogger::new(config)?;
    INIT.call_once(move || {
        let max_level = log::LevelFilter::from(logger.level);
        if log::set_boxed_logger(Box::new(logger)).is_ok() {
            log::set_max_level(max_level);
        }
    });
    Ok(())
}

/// `log::Log` implementation writing formatted entries to one output
struct RampartLogger {
    level: LogLevel,
    format: LogFormat,
    output: LogOutput,
    context_fields: HashMap<String, String>,
}

impl RampartLogger {
    fn new(config: &LoggingConfig) -> anyhow::Result<Self> {
        Ok(Self {
            level: config.log_level()?,
            format: config.log_format()?,
            output: config.log_output()?,
            context_fields: config.context_fields.clone(),
        })
    }

    fn render(&self, record: &log::Record) -> String {
        let entry = LogEntry::from_log_record(record, &self.context_fields);
        self.format.format_entry(&entry)
    }
}

impl log::Log for RampartLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        LogLevel::from(metadata.level()) <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = self.render(record);
        let _ = self.output.write_line(&line);
    }

    fn flush(&self) {
        let _ = self.output.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn test_level_parsing() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        let err = "loud".parse::<LogLevel>().unwrap_err();
        assert_eq!(err.to_string(), "unrecognized log level 'loud'");
    }

    #[test]
    fn test_logger_filters_by_level() {
        let config = LoggingConfig {
            level: "warn".into(),
            ..LoggingConfig::default()
        };
        let logger = RampartLogger::new(&config).unwrap();

        let info = log::Metadata::builder().level(log::Level::Info).target("x").build();
        let error = log::Metadata::builder().level(log::Level::Error).target("x").build();
        assert!(!logger.enabled(&info));
        assert!(logger.enabled(&error));
    }

    #[test]
    fn test_logger_renders_context_fields() {
        let config = LoggingConfig {
            format: "json".into(),
            ..LoggingConfig::default()
        }
        .with_context_field("service", "billing");
        let logger = RampartLogger::new(&config).unwrap();

        let line = logger.render(
            &log::Record::builder()
                .args(format_args!("Pipeline ready"))
                .level(log::Level::Info)
                .target("rampart_core::app")
                .build(),
        );
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["message"], "Pipeline ready");
        assert_eq!(parsed["service"], "billing");
    }

    #[test]
    fn test_init_rejects_bad_settings() {
        let config = LoggingConfig {
            output: "syslog".into(),
            ..LoggingConfig::default()
        };
        assert!(init_logging(&config).is_err());
        assert!(init_logging(&LoggingConfig::default()).is_ok());
        assert!(init_logging(&LoggingConfig::default()).is_ok());
    }
}
