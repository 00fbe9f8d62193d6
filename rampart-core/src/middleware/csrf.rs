//! CSRF double-submit cookie check

use super::cookie::CookieConfig;
use super::{Next, SecurityContext, SecurityMiddleware};
use crate::error::{SecurityError, SecurityResult};
use async_trait::async_trait;
use uuid::Uuid;

pub const DEFAULT_HEADER_NAME: &str = "x-csrf-token";
pub const DEFAULT_COOKIE_NAME: &str = "csrf_token";

/// Requires the header token to equal the cookie token
///
/// Missing tokens and mismatches are hard errors. Methods listed as exempt
/// (none by default) skip the check.
#[derive(Debug, Clone)]
pub struct CsrfProtector {
    header_name: String,
    cookie_name: String,
    exempt_methods: Vec<String>,
}

impl Default for CsrfProtector {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_NAME, DEFAULT_COOKIE_NAME)
    }
}

impl CsrfProtector {
    pub fn new(header_name: impl Into<String>, cookie_name: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into().to_ascii_lowercase(),
            cookie_name: cookie_name.into(),
            exempt_methods: Vec::new(),
        }
    }

    pub fn with_exempt_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exempt_methods =
            methods.into_iter().map(|m| m.as_ref().to_ascii_uppercase()).collect();
        self
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Fresh token and the matching `Set-Cookie` value
    pub fn generate_token(&self) -> (String, String) {
        let token = Uuid::new_v4().simple().to_string();
        let cookie = CookieConfig::readable(self.cookie_name.clone()).build_set_cookie(&token);
        (token, cookie)
    }

    /// Compare the two tokens carried by `ctx`
    ///
    /// An empty header or cookie value counts as missing.
    pub fn verify(&self, ctx: &SecurityContext) -> SecurityResult<()> {
        let header = ctx
            .header(&self.header_name)
            .filter(|t| !t.is_empty())
            .ok_or(SecurityError::CsrfTokenMissing("header"))?;
        let cookie = ctx
            .cookie(&self.cookie_name)
            .filter(|t| !t.is_empty())
            .ok_or(SecurityError::CsrfTokenMissing("cookie"))?;
        if header != cookie {
            return Err(SecurityError::CsrfTokenMismatch);
        }
        Ok(())
    }

    fn is_exempt(&self, method: &str) -> bool {
        self.exempt_methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}

#[async_trait]
impl SecurityMiddleware for CsrfProtector {
    fn name(&self) -> &str {
        "CsrfProtector"
    }

    async fn handle(&self, ctx: &mut SecurityContext, next: Next<'_>) -> SecurityResult<()> {
        if self.is_exempt(&ctx.method) {
            log::debug!("CSRF check skipped for {} {}", ctx.method, ctx.path);
        } else if let Err(e) = self.verify(ctx) {
            log::warn!("CSRF check failed for request {}: {}", ctx.request_id, e);
            return Err(e);
        }
        next.run(ctx).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{InputSanitizer, SecurityChain};
    use std::sync::Arc;

    async fn run(protector: CsrfProtector, ctx: SecurityContext) -> SecurityResult<bool> {
        let chain: Vec<Arc<dyn SecurityMiddleware>> = vec![Arc::new(protector)];
        let mut ctx = ctx;
        let handler = |_ctx: &mut SecurityContext| -> SecurityResult<()> { Ok(()) };
        SecurityChain::run(&chain, &mut ctx, &handler).await.map(|r| !r.blocked)
    }

    #[tokio::test]
    async fn test_matching_tokens_proceed() {
        let ctx = SecurityContext::new("POST", "/transfer")
            .with_header("X-CSRF-Token", "abc")
            .with_cookie("csrf_token", "abc");
        assert!(run(CsrfProtector::default(), ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_mismatch_raises() {
        let ctx = SecurityContext::new("POST", "/transfer")
            .with_header("x-csrf-token", "abc")
            .with_cookie("csrf_token", "xyz");
        let err = run(CsrfProtector::default(), ctx).await.unwrap_err();
        assert!(matches!(err, SecurityError::CsrfTokenMismatch));
    }

    #[tokio::test]
    async fn test_missing_cookie_raises() {
        let ctx = SecurityContext::new("POST", "/transfer").with_header("x-csrf-token", "abc");
        let err = run(CsrfProtector::default(), ctx).await.unwrap_err();
        assert!(matches!(err, SecurityError::CsrfTokenMissing("cookie")));
    }

    #[tokio::test]
    async fn test_missing_header_raises() {
        let ctx = SecurityContext::new("POST", "/transfer").with_header("cookie", "csrf_token=abc");
        let err = run(CsrfProtector::default(), ctx).await.unwrap_err();
        assert!(matches!(err, SecurityError::CsrfTokenMissing("header")));
    }

    #[tokio::test]
    async fn test_empty_tokens_count_as_missing() {
        let ctx = SecurityContext::new("POST", "/transfer")
            .with_header("x-csrf-token", "")
            .with_header("cookie", "csrf_token=");
        let err = run(CsrfProtector::default(), ctx).await.unwrap_err();
        assert!(matches!(err, SecurityError::CsrfTokenMissing("header")));

        let ctx = SecurityContext::new("POST", "/transfer")
            .with_header("x-csrf-token", "abc")
            .with_header("cookie", "csrf_token=");
        let err = run(CsrfProtector::default(), ctx).await.unwrap_err();
        assert!(matches!(err, SecurityError::CsrfTokenMissing("cookie")));
    }

    #[tokio::test]
    async fn test_whitespace_header_after_sanitizer_is_missing() {
        let chain: Vec<Arc<dyn SecurityMiddleware>> =
            vec![Arc::new(InputSanitizer::new()), Arc::new(CsrfProtector::default())];
        let mut ctx = SecurityContext::new("POST", "/transfer")
            .with_header("x-csrf-token", "   ")
            .with_cookie("csrf_token", "");
        let handler = |_ctx: &mut SecurityContext| -> SecurityResult<()> { Ok(()) };

        let err = SecurityChain::run(&chain, &mut ctx, &handler).await.unwrap_err();
        assert!(matches!(err, SecurityError::CsrfTokenMissing("header")));
    }

    #[tokio::test]
    async fn test_custom_names_and_exempt_methods() {
        let protector = CsrfProtector::new("X-XSRF", "xsrf").with_exempt_methods(["get", "HEAD"]);

        let safe = SecurityContext::new("GET", "/page");
        assert!(run(protector.clone(), safe).await.unwrap());

        let post = SecurityContext::new("POST", "/page")
            .with_header("x-xsrf", "t1")
            .with_header("cookie", "xsrf=t1");
        assert!(run(protector, post).await.unwrap());
    }

    #[test]
    fn test_generate_token_sets_readable_cookie() {
        let protector = CsrfProtector::default();
        let (token, cookie) = protector.generate_token();
        assert_eq!(token.len(), 32);
        assert!(cookie.starts_with(&format!("csrf_token={}", token)));
        assert!(!cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
    }
}
