//! CORS and CSP response header middlewares
//!
//! Both only add entries to the context's response headers. CORS also
//! rejects requests whose `Origin` is not allowed.

use super::{Next, SecurityContext, SecurityMiddleware};
use crate::error::{SecurityError, SecurityResult};
use async_trait::async_trait;

const WILDCARD: &str = "*";

/// Cross-origin resource sharing
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    allowed_origins: Vec<String>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    allow_credentials: bool,
    max_age_secs: Option<u64>,
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new(vec![WILDCARD.to_string()])
    }
}

impl CorsMiddleware {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self {
            allowed_origins,
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

    pub fn with_methods(mut self, methods: Vec<String>) -> Self {
        self.allowed_methods = methods;
        self
    }

    pub fn with_headers(mut self, headers: Vec<String>) -> Self {
        self.allowed_headers = headers;
        self
    }

    pub fn with_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    pub fn with_max_age(mut self, secs: u64) -> Self {
        self.max_age_secs = Some(secs);
        self
    }

    fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == WILDCARD)
    }

    /// `true` for the wildcard or a listed origin
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.allows_any() || self.allowed_origins.iter().any(|o| o == origin)
    }
}

#[async_trait]
impl SecurityMiddleware for CorsMiddleware {
    fn name(&self) -> &str {
        "CorsMiddleware"
    }

    async fn handle(&self, ctx: &mut SecurityContext, next: Next<'_>) -> SecurityResult<()> {
        let origin = ctx.header("origin").map(str::to_string);

        match origin {
            Some(origin) if !self.is_allowed(&origin) => {
                log::warn!("Rejected origin {} for {} {}", origin, ctx.method, ctx.path);
                return Err(SecurityError::OriginNotAllowed(origin));
            }
            Some(origin) if !self.allows_any() || self.allow_credentials => {
                ctx.set_response_header("access-control-allow-origin", origin);
                ctx.set_response_header("vary", "Origin");
            }
            _ if self.allows_any() => {
                ctx.set_response_header("access-control-allow-origin", WILDCARD);
            }
            _ => {}
        }

        let methods = self.allowed_methods.join(", ");
        ctx.set_response_header("access-control-allow-methods", methods);
        let headers = self.allowed_headers.join(", ");
        ctx.set_response_header("access-control-allow-headers", headers);
        if self.allow_credentials {
            ctx.set_response_header("access-control-allow-credentials", "true");
        }
        if let Some(max_age) = self.max_age_secs {
            ctx.set_response_header("access-control-max-age", max_age.to_string());
        }

        next.run(ctx).await?;
        Ok(())
    }
}

/// Content security policy
#[derive(Debug, Clone)]
pub struct CspMiddleware {
    policy: String,
    report_only: bool,
    report_uri: Option<String>,
}

impl Default for CspMiddleware {
    fn default() -> Self {
        Self::new("default-src 'self'")
    }
}

impl CspMiddleware {
    pub fn new(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            report_only: false,
            report_uri: None,
        }
    }

    /// Emit `content-security-policy-report-only` instead of enforcing
    pub fn report_only(mut self, report_only: bool) -> Self {
        self.report_only = report_only;
        self
    }

    pub fn with_report_uri(mut self, uri: impl Into<String>) -> Self {
        self.report_uri = Some(uri.into());
        self
    }

    pub fn header_name(&self) -> &'static str {
        if self.report_only {
            "content-security-policy-report-only"
        } else {
            "content-security-policy"
        }
    }

    pub fn header_value(&self) -> String {
        let policy = self.policy.trim().trim_end_matches(';');
        match &self.report_uri {
            Some(uri) => format!("{}; report-uri {}", policy, uri),
            None => policy.to_string(),
        }
    }
}

#[async_trait]
impl SecurityMiddleware for CspMiddleware {
    fn name(&self) -> &str {
        "CspMiddleware"
    }

    async fn handle(&self, ctx: &mut SecurityContext, next: Next<'_>) -> SecurityResult<()> {
        ctx.set_response_header(self.header_name(), self.header_value());
        next.run(ctx).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{ChainResult, SecurityChain};
    use std::sync::Arc;

    async fn run<M: SecurityMiddleware + 'static>(
        middleware: M,
        ctx: &mut SecurityContext,
    ) -> SecurityResult<ChainResult> {
        let chain: Vec<Arc<dyn SecurityMiddleware>> = vec![Arc::new(middleware)];
        let handler = |_ctx: &mut SecurityContext| -> SecurityResult<()> { Ok(()) };
        SecurityChain::run(&chain, ctx, &handler).await
    }

    #[tokio::test]
    async fn test_wildcard_without_origin() {
        let mut ctx = SecurityContext::new("GET", "/");
        run(CorsMiddleware::default(), &mut ctx).await.unwrap();
        assert_eq!(
            ctx.response_header("access-control-allow-origin"),
            Some("*")
        );
        assert!(ctx.response_header("access-control-allow-methods").unwrap().contains("POST"));
    }

    #[tokio::test]
    async fn test_listed_origin_is_echoed() {
        let cors = CorsMiddleware::new(vec!["https://app.example".into()]).with_max_age(600);
        let mut ctx = SecurityContext::new("GET", "/").with_header("Origin", "https://app.example");
        let result = run(cors, &mut ctx).await.unwrap();

        assert!(!result.blocked);
        assert_eq!(
            ctx.response_header("access-control-allow-origin"),
            Some("https://app.example")
        );
        assert_eq!(ctx.response_header("vary"), Some("Origin"));
        assert_eq!(ctx.response_header("access-control-max-age"), Some("600"));
    }

    #[tokio::test]
    async fn test_unlisted_origin_raises() {
        let cors = CorsMiddleware::new(vec!["https://app.example".into()]);
        let mut ctx =
            SecurityContext::new("GET", "/").with_header("origin", "https://evil.example");
        let err = run(cors, &mut ctx).await.unwrap_err();
        assert!(matches!(err, SecurityError::OriginNotAllowed(o) if o == "https://evil.example"));
        assert!(ctx.metadata.response_headers.is_empty());
    }

    #[tokio::test]
    async fn test_csp_enforcing_and_report_only() {
        let mut ctx = SecurityContext::new("GET", "/");
        run(CspMiddleware::default(), &mut ctx).await.unwrap();
        assert_eq!(
            ctx.response_header("content-security-policy"),
            Some("default-src 'self'")
        );

        let csp = CspMiddleware::new("default-src 'self'; img-src *;")
            .report_only(true)
            .with_report_uri("/csp-report");
        let mut ctx = SecurityContext::new("GET", "/");
        run(csp, &mut ctx).await.unwrap();
        assert_eq!(ctx.response_header("content-security-policy"), None);
        assert_eq!(
            ctx.response_header("content-security-policy-report-only"),
            Some("default-src 'self'; img-src *; report-uri /csp-report")
        );
    }
}
