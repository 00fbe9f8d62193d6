//! Configuration for the Rampart security pipeline
//!
//! # Configuration Hierarchy
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** (builder methods on the sections)
//! 2. **Environment Variables** (`RAMPART_*`)
//! 3. **Config File** (`rampart.toml`)
//! 4. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use rampart_core::config::RampartConfig;
//!
//! let config = RampartConfig::load()?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod audit;
pub mod csrf;
pub mod headers;
pub mod logging;
pub mod rate_limit;
pub mod sessions;
pub mod token;

pub use audit::AuditConfig;
pub use csrf::CsrfConfig;
pub use headers::{CorsConfig, CspConfig};
pub use logging::LoggingConfig;
pub use rate_limit::RateLimitConfig;
pub use sessions::SessionsConfig;
pub use token::TokenConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "rampart.toml";

/// Complete Rampart configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RampartConfig {
    pub token: TokenConfig,
    pub sessions: SessionsConfig,
    pub rate_limit: RateLimitConfig,
    pub csrf: CsrfConfig,
    pub cors: CorsConfig,
    pub csp: CspConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

impl RampartConfig {
    /// Load `rampart.toml` (if present) over the defaults, then the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        Ok(config)
    }

    /// Parse a TOML file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.token.merge(other.token);
        self.sessions.merge(other.sessions);
        self.rate_limit.merge(other.rate_limit);
        self.csrf.merge(other.csrf);
        self.cors.merge(other.cors);
        self.csp.merge(other.csp);
        self.audit.merge(other.audit);
        self.logging.merge(other.logging);
    }

    pub fn apply_env_vars(&mut self) {
        self.token.apply_env_vars();
        self.sessions.apply_env_vars();
        self.rate_limit.apply_env_vars();
        self.csrf.apply_env_vars();
        self.cors.apply_env_vars();
        self.csp.apply_env_vars();
        self.audit.apply_env_vars();
        self.logging.apply_env_vars();
    }

    pub fn validate(&self) -> Result<()> {
        self.token.validate()?;
        self.sessions.validate()?;
        self.rate_limit.validate()?;
        self.csrf.validate()?;
        self.cors.validate()?;
        self.csp.validate()?;
        self.audit.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Split a comma separated env value, dropping blanks
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}
