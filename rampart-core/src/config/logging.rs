//! Logging configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;

use crate::logging::{LogFormat, LogLevel, LogOutput};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// error, warn, info, debug or trace
    /// Env: RAMPART_LOG_LEVEL
    /// Default: "info"
    pub level: String,

    /// json, human or logfmt
    /// Env: RAMPART_LOG_FORMAT
    /// Default: "human"
    pub format: String,

    /// stdout or stderr
    /// Env: RAMPART_LOG_OUTPUT
    /// Default: "stdout"
    pub output: String,

    /// Fields added to every entry
    pub context_fields: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "human".to_string(),
            output: "stdout".to_string(),
            context_fields: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    pub fn log_level(&self) -> Result<LogLevel> {
        self.level.parse().with_context(|| format!("Invalid log level: {}", self.level))
    }

    pub fn log_format(&self) -> Result<LogFormat> {
        self.format.parse().with_context(|| format!("Invalid log format: {}", self.format))
    }

    pub fn log_output(&self) -> Result<LogOutput> {
        self.output.parse().with_context(|| format!("Invalid log output: {}", self.output))
    }

    pub fn with_context_field(mut self, key: &str, value: &str) -> Self {
        self.context_fields.insert(key.to_string(), value.to_string());
        self
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(level) = env::var("RAMPART_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("RAMPART_LOG_FORMAT") {
            self.format = format;
        }
        if let Ok(output) = env::var("RAMPART_LOG_OUTPUT") {
            self.output = output;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.log_level()?;
        self.log_format()?;
        self.log_output()?;
        Ok(())
    }
}
