//! CSRF configuration

use crate::middleware::{DEFAULT_COOKIE_NAME, DEFAULT_HEADER_NAME};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Env: RAMPART_CSRF_HEADER
    /// Default: "x-csrf-token"
    pub header_name: String,

    /// Env: RAMPART_CSRF_COOKIE
    /// Default: "csrf_token"
    pub cookie_name: String,

    /// Methods that skip the check (comma separated in env)
    /// Env: RAMPART_CSRF_EXEMPT_METHODS
    /// Default: none
    pub exempt_methods: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            header_name: DEFAULT_HEADER_NAME.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            exempt_methods: Vec::new(),
        }
    }
}

impl CsrfConfig {
    pub fn merge(&mut self, other: Self) {
        self.header_name = other.header_name;
        self.cookie_name = other.cookie_name;
        self.exempt_methods = other.exempt_methods;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(header) = env::var("RAMPART_CSRF_HEADER") {
            self.header_name = header;
        }

        if let Ok(cookie) = env::var("RAMPART_CSRF_COOKIE") {
            self.cookie_name = cookie;
        }

        if let Ok(methods) = env::var("RAMPART_CSRF_EXEMPT_METHODS") {
            self.exempt_methods = super::split_list(&methods);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.header_name.trim().is_empty() {
            bail!("Invalid csrf header_name: must not be empty");
        }
        if self.cookie_name.trim().is_empty() {
            bail!("Invalid csrf cookie_name: must not be empty");
        }
        Ok(())
    }
}
