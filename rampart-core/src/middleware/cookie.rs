//! Cookie parsing and `Set-Cookie` building
//!
//! Used to fill the context's cookie metadata from the `Cookie` request header
//! and to issue the CSRF double-submit cookie.

use std::collections::HashMap;

/// SameSite cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSitePolicy {
    /// Strict - cookie only sent to same site
    Strict,

    /// Lax - cookie sent on top-level navigation
    Lax,

    /// None - cookie sent on all requests (requires Secure)
    None,
}

/// Cookie attributes
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Cookie name
    pub name: String,

    /// Cookie path
    pub path: String,

    /// Secure flag (HTTPS only)
    pub secure: bool,

    /// HttpOnly flag (no JavaScript access)
    pub http_only: bool,

    /// SameSite policy
    pub same_site: SameSitePolicy,

    /// Max age in seconds
    pub max_age: Option<i64>,
}

impl CookieConfig {
    /// Attributes for a cookie the page script must be able to read back
    pub fn readable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: "/".to_string(),
            secure: true,
            http_only: false,
            same_site: SameSitePolicy::Strict,
            max_age: None,
        }
    }

    /// Build a Set-Cookie header value
    pub fn build_set_cookie(&self, value: &str) -> String {
        let mut parts = vec![format!("{}={}", self.name, value)];

        parts.push(format!("Path={}", self.path));

        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={}", max_age));
        }

        if self.secure {
            parts.push("Secure".to_string());
        }

        if self.http_only {
            parts.push("HttpOnly".to_string());
        }

        let same_site = match self.same_site {
            SameSitePolicy::Strict => "Strict",
            SameSitePolicy::Lax => "Lax",
            SameSitePolicy::None => "None",
        };
        parts.push(format!("SameSite={}", same_site));

        parts.join("; ")
    }
}

/// Split a `Cookie` header into name/value pairs
///
/// Later duplicates win; fragments without `=` are skipped.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}
