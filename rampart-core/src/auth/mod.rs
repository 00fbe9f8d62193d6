//! Authentication strategies
//!
//! Each strategy verifies one kind of credential and produces a [`Principal`]:
//!
//! - [`TokenStrategy`]: HMAC-SHA256 signed `header.payload.signature` tokens
//! - [`SessionStrategy`]: opaque session ids backed by an in-memory table
//! - [`ExternalCodeStrategy`]: placeholder for an external identity exchange
//!
//! A failed verification is never an error: strategies return `None` and the
//! guard that consulted them turns that into a soft denial.

mod external;
mod session;
mod token;

pub use external::ExternalCodeStrategy;
pub use session::SessionStrategy;
pub use token::{TokenStrategy, TOKEN_HEADER};

use crate::headers::Headers;
use crate::principal::Principal;

/// Authentication strategy trait
///
/// Implement this trait to plug a new credential type into the guards.
pub trait AuthStrategy: Send + Sync {
    /// Verify a credential and return the identity it proves
    fn authenticate(&self, credential: &str) -> Option<Principal>;

    /// Strategy name for logging and identification
    fn name(&self) -> &str;
}

/// Extract a bearer credential from the `Authorization` header
pub fn extract_bearer(headers: &Headers) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        let headers = Headers::new().with("Authorization", "Bearer abc.def.ghi");
        assert_eq!(extract_bearer(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_bearer_rejects_other_schemes() {
        assert_eq!(extract_bearer(&Headers::new()), None);
        assert_eq!(
            extract_bearer(&Headers::new().with("authorization", "Basic dXNlcg==")),
            None
        );
        assert_eq!(
            extract_bearer(&Headers::new().with("authorization", "Bearer   ")),
            None
        );
    }
}
