//! Security middleware chain
//!
//! Middlewares are chain-of-responsibility filters wrapped around the handler
//! call. Each receives the [`SecurityContext`] and a [`Next`] continuation;
//! calling `next.run(ctx)` proceeds, returning without calling it blocks the
//! request, and returning an error aborts it.
//!
//! ## Built-in middlewares
//! - [`InputSanitizer`]: strips script blocks and control characters
//! - [`CsrfProtector`]: double-submit cookie check
//! - [`RateLimiter`]: fixed window with adaptive penalty
//! - [`CorsMiddleware`] / [`CspMiddleware`]: response header injection
//! - [`AuditLogger`]: one structured entry per request

mod audit;
mod chain;
pub mod cookie;
mod csrf;
mod headers;
mod rate_limit;
mod sanitizer;

pub use audit::{
    AuditEntry, AuditLogger, AuditSink, AuditStatus, LogAuditSink, MemoryAuditSink, AUDIT_TARGET,
};
pub use chain::{ChainResult, Flow, Next, SecurityChain};
pub use csrf::{CsrfProtector, DEFAULT_COOKIE_NAME, DEFAULT_HEADER_NAME};
pub use headers::{CorsMiddleware, CspMiddleware};
pub use rate_limit::{RateDecision, RateLimitStore, RateLimiter, LIMIT_HEADER, REMAINING_HEADER};
pub use sanitizer::{sanitize_str, sanitize_value, InputSanitizer};

use crate::error::SecurityResult;
use crate::headers::Headers;
use crate::principal::Principal;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Metadata bag carried alongside the request
#[derive(Debug, Clone, Default)]
pub struct SecurityMetadata {
    /// Request cookies by name
    pub cookies: HashMap<String, String>,

    /// Headers accumulated for the eventual response
    pub response_headers: BTreeMap<String, String>,

    /// Free-form entries added by middlewares or the adapter
    pub extra: HashMap<String, serde_json::Value>,
}

/// Request state seen by the middleware chain
#[derive(Debug, Clone)]
pub struct SecurityContext {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub client_addr: Option<String>,
    pub headers: Headers,
    pub body: serde_json::Value,
    pub principal: Option<Principal>,
    pub timestamp: DateTime<Utc>,
    pub metadata: SecurityMetadata,
}

impl SecurityContext {
    /// Create a context with a fresh request id and an empty body
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method: method.into(),
            path: path.into(),
            client_addr: None,
            headers: Headers::new(),
            body: serde_json::Value::Null,
            principal: None,
            timestamp: Utc::now(),
            metadata: SecurityMetadata::default(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_client_addr(mut self, addr: impl Into<String>) -> Self {
        self.client_addr = Some(addr.into());
        self
    }

    /// Add a request header; a `Cookie` header also fills the cookie metadata
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.as_ref().eq_ignore_ascii_case("cookie") {
            self.metadata.cookies.extend(cookie::parse_cookie_header(&value));
        }
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.metadata.cookies.get(name).map(String::as_str)
    }

    /// Queue a header for the response
    pub fn set_response_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.metadata.response_headers.insert(name.into(), value.into());
    }

    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.metadata.response_headers.get(name).map(String::as_str)
    }
}

/// Chain-of-responsibility filter around the handler call
#[async_trait]
pub trait SecurityMiddleware: Send + Sync {
    /// Name used in the blocked reason and in logs
    fn name(&self) -> &str;

    /// Inspect or mutate the context, then call `next.run(ctx)` to proceed
    async fn handle(&self, ctx: &mut SecurityContext, next: Next<'_>) -> SecurityResult<()>;
}

/// Terminal step of the chain
#[async_trait]
pub trait FinalHandler: Send + Sync {
    async fn call(&self, ctx: &mut SecurityContext) -> SecurityResult<()>;
}

#[async_trait]
impl<F> FinalHandler for F
where
    F: Fn(&mut SecurityContext) -> SecurityResult<()> + Send + Sync,
{
    async fn call(&self, ctx: &mut SecurityContext) -> SecurityResult<()> {
        (self)(ctx)
    }
}
