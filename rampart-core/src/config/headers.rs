//! CORS and CSP configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins, `*` for any
    /// Env: RAMPART_CORS_ORIGINS (comma separated)
    /// Default: ["*"]
    pub allowed_origins: Vec<String>,

    /// Default: GET, POST, PUT, PATCH, DELETE, OPTIONS
    pub allowed_methods: Vec<String>,

    /// Default: content-type, authorization, x-csrf-token
    pub allowed_headers: Vec<String>,

    /// Env: RAMPART_CORS_CREDENTIALS
    /// Default: false
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds
    pub max_age_secs: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["content-type", "authorization", "x-csrf-token"]
                .map(String::from)
                .to_vec(),
            allow_credentials: false,
            max_age_secs: None,
        }
    }
}

impl CorsConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(origins) = env::var("RAMPART_CORS_ORIGINS") {
            self.allowed_origins = super::split_list(&origins);
        }

        if let Ok(credentials) = env::var("RAMPART_CORS_CREDENTIALS") {
            self.allow_credentials = credentials.parse().unwrap_or(self.allow_credentials);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.allowed_origins.is_empty() {
            bail!("Invalid cors allowed_origins: list at least one origin or \"*\"");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CspConfig {
    /// Env: RAMPART_CSP_POLICY
    /// Default: "default-src 'self'"
    pub policy: String,

    /// Env: RAMPART_CSP_REPORT_ONLY
    /// Default: false
    pub report_only: bool,

    pub report_uri: Option<String>,
}

impl Default for CspConfig {
    fn default() -> Self {
        Self {
            policy: "default-src 'self'".to_string(),
            report_only: false,
            report_uri: None,
        }
    }
}

impl CspConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(policy) = env::var("RAMPART_CSP_POLICY") {
            self.policy = policy;
        }

        if let Ok(report_only) = env::var("RAMPART_CSP_REPORT_ONLY") {
            self.report_only = report_only.parse().unwrap_or(self.report_only);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.policy.trim().is_empty() {
            bail!("Invalid csp policy: must not be empty");
        }
        Ok(())
    }
}
