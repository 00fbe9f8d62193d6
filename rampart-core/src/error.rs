//! Hard-failure channel of the pipeline
//!
//! Soft denials (a guard returning `false`, a middleware that never calls its
//! continuation) are values, not errors. Everything in [`SecurityError`]
//! aborts the request and propagates to the caller.

/// Pipeline result type
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Errors raised by guards, middlewares and the pipeline itself
#[derive(thiserror::Error, Debug)]
pub enum SecurityError {
    #[error("CSRF token missing: {0}")]
    CsrfTokenMissing(&'static str),
    #[error("CSRF token mismatch")]
    CsrfTokenMismatch,
    #[error("Origin not allowed: {0}")]
    OriginNotAllowed(String),
    #[error("Rate limit exceeded for {key}, retry after {retry_after_ms}ms")]
    RateLimitExceeded { key: String, retry_after_ms: u64 },
    #[error("No middleware registered under '{0}'")]
    UnresolvedMiddleware(String),
    #[error("Token issuing failed: {0}")]
    TokenIssue(String),
    #[error("Handler failed: {0}")]
    Handler(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SecurityError {
    /// HTTP status an adapter should answer with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            SecurityError::CsrfTokenMissing(_)
            | SecurityError::CsrfTokenMismatch
            | SecurityError::OriginNotAllowed(_) => 403,
            SecurityError::RateLimitExceeded { .. } => 429,
            SecurityError::UnresolvedMiddleware(_)
            | SecurityError::TokenIssue(_)
            | SecurityError::Handler(_)
            | SecurityError::Config(_)
            | SecurityError::Anyhow(_) => 500,
        }
    }

    /// Short snake_case code, stable across message wording changes
    pub fn code(&self) -> &'static str {
        match self {
            SecurityError::CsrfTokenMissing(_) => "csrf_token_missing",
            SecurityError::CsrfTokenMismatch => "csrf_token_mismatch",
            SecurityError::OriginNotAllowed(_) => "origin_not_allowed",
            SecurityError::RateLimitExceeded { .. } => "rate_limited",
            SecurityError::UnresolvedMiddleware(_) => "unresolved_middleware",
            SecurityError::TokenIssue(_) => "token_issue",
            SecurityError::Handler(_) => "handler_failed",
            SecurityError::Config(_) => "config_error",
            SecurityError::Anyhow(_) => "internal_error",
        }
    }
}
