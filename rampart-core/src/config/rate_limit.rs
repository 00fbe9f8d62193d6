//! Rate limiter configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Longest accepted window (one year)
pub const MAX_WINDOW_MS: u64 = 365 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window length in milliseconds
    /// Env: RAMPART_RATE_LIMIT_WINDOW_MS
    /// Default: 60000
    pub window_ms: u64,

    /// Base request budget per window
    /// Env: RAMPART_RATE_LIMIT_BASE_LIMIT
    /// Default: 100
    pub base_limit: u64,

    /// Multiplier for both the active-window cap and the lockout
    /// Env: RAMPART_RATE_LIMIT_PENALTY
    /// Default: 2
    pub penalty_multiplier: u64,

    /// Maximum number of tracked keys
    /// Env: RAMPART_RATE_LIMIT_MAX_BUCKETS
    /// Default: 100000
    pub max_buckets: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_ms: 60_000,
            base_limit: 100,
            penalty_multiplier: 2,
            max_buckets: 100_000,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn merge(&mut self, other: Self) {
        self.window_ms = other.window_ms;
        self.base_limit = other.base_limit;
        self.penalty_multiplier = other.penalty_multiplier;
        self.max_buckets = other.max_buckets;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(window) = env::var("RAMPART_RATE_LIMIT_WINDOW_MS") {
            if let Ok(w) = window.parse() {
                self.window_ms = w;
            }
        }

        if let Ok(limit) = env::var("RAMPART_RATE_LIMIT_BASE_LIMIT") {
            if let Ok(l) = limit.parse() {
                self.base_limit = l;
            }
        }

        if let Ok(penalty) = env::var("RAMPART_RATE_LIMIT_PENALTY") {
            if let Ok(p) = penalty.parse() {
                self.penalty_multiplier = p;
            }
        }

        if let Ok(max) = env::var("RAMPART_RATE_LIMIT_MAX_BUCKETS") {
            if let Ok(m) = max.parse() {
                self.max_buckets = m;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_ms == 0 {
            bail!("Invalid rate_limit window_ms: must be greater than 0");
        }
        if self.window_ms > MAX_WINDOW_MS {
            bail!("Invalid rate_limit window_ms: must be at most {}", MAX_WINDOW_MS);
        }
        if self.base_limit == 0 {
            bail!("Invalid rate_limit base_limit: must be greater than 0");
        }
        if self.penalty_multiplier == 0 {
            bail!("Invalid rate_limit penalty_multiplier: must be at least 1");
        }
        if u32::try_from(self.penalty_multiplier).is_err() {
            bail!("Invalid rate_limit penalty_multiplier: must fit in 32 bits");
        }
        if self.max_buckets == 0 {
            bail!("Invalid rate_limit max_buckets: must be greater than 0");
        }
        Ok(())
    }
}
