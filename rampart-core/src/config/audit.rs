//! Audit configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Register the `audit` middleware
    /// Env: RAMPART_AUDIT_ENABLED
    /// Default: true
    pub enabled: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AuditConfig {
    pub fn merge(&mut self, other: Self) {
        self.enabled = other.enabled;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(enabled) = env::var("RAMPART_AUDIT_ENABLED") {
            self.enabled = enabled.parse().unwrap_or(true);
        }
    }

    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}
