//! Token authentication configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Authenticate bearer credentials as signed tokens
    /// Env: RAMPART_TOKEN_ENABLED
    /// Default: false (bearer credentials are session ids)
    pub enabled: bool,

    /// HMAC-SHA256 shared secret
    /// Env: RAMPART_TOKEN_SECRET
    /// Default: empty
    pub secret: String,
}

impl TokenConfig {
    pub fn merge(&mut self, other: Self) {
        self.enabled = other.enabled;
        self.secret = other.secret;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(enabled) = env::var("RAMPART_TOKEN_ENABLED") {
            self.enabled = enabled.parse().unwrap_or(self.enabled);
        }

        if let Ok(secret) = env::var("RAMPART_TOKEN_SECRET") {
            self.secret = secret;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.secret.is_empty() {
            bail!("Invalid token secret: must not be empty when token auth is enabled");
        }
        Ok(())
    }
}
