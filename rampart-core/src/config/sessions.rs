//! Session table configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Longest accepted session lifetime (one year)
pub const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Session lifetime in seconds
    /// Env: RAMPART_SESSION_TTL
    /// Default: 3600 (1 hour)
    pub ttl_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl SessionsConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn merge(&mut self, other: Self) {
        self.ttl_secs = other.ttl_secs;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(ttl) = env::var("RAMPART_SESSION_TTL") {
            if let Ok(t) = ttl.parse() {
                self.ttl_secs = t;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ttl_secs == 0 {
            bail!("Invalid session ttl_secs: must be greater than 0");
        }
        if self.ttl_secs > MAX_TTL_SECS {
            bail!("Invalid session ttl_secs: must be at most {}", MAX_TTL_SECS);
        }
        Ok(())
    }
}
