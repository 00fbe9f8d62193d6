//! Signed bearer tokens
//!
//! Wire format: `base64url(header) "." base64url(payload) "." base64url(signature)`
//! where the signature is HMAC-SHA256 over `"<header>.<payload>"` with the shared
//! secret. The payload is the JSON form of a [`Principal`]; no expiry check is
//! made beyond what the payload itself carries.

use super::AuthStrategy;
use crate::error::SecurityError;
use crate::principal::Principal;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Fixed token header
pub const TOKEN_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// HMAC-SHA256 token strategy
#[derive(Clone)]
pub struct TokenStrategy {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStrategy").field("secret", &"<redacted>").finish()
    }
}

impl TokenStrategy {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign a principal into a token
    pub fn issue(&self, principal: &Principal) -> Result<String, SecurityError> {
        let payload = serde_json::to_vec(principal)
            .map_err(|e| SecurityError::TokenIssue(e.to_string()))?;

        let header_b64 = URL_SAFE_NO_PAD.encode(TOKEN_HEADER.as_bytes());
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);

        let mut mac = self.mac().map_err(SecurityError::TokenIssue)?;
        mac.update(format!("{}.{}", header_b64, payload_b64).as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{}.{}.{}", header_b64, payload_b64, signature))
    }

    /// Verify a token and decode its principal
    ///
    /// Returns `None` on any malformation, bad signature or undecodable payload.
    pub fn verify(&self, token: &str) -> Option<Principal> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            log::debug!("Token rejected: expected 3 non-empty segments");
            return None;
        }

        if !self.verify_signature(parts[0], parts[1], parts[2]) {
            log::debug!("Token rejected: signature mismatch");
            return None;
        }

        let payload = URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
        match serde_json::from_slice::<Principal>(&payload) {
            Ok(principal) => Some(principal),
            Err(e) => {
                log::debug!("Token rejected: payload is not a principal ({})", e);
                None
            }
        }
    }

    fn mac(&self) -> Result<HmacSha256, String> {
        HmacSha256::new_from_slice(&self.secret).map_err(|e| e.to_string())
    }

    /// Constant-time signature check over `"<header>.<payload>"`
    fn verify_signature(&self, header: &str, payload: &str, signature: &str) -> bool {
        let Ok(signature_bytes) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(format!("{}.{}", header, payload).as_bytes());
        mac.verify_slice(&signature_bytes).is_ok()
    }
}

impl AuthStrategy for TokenStrategy {
    fn authenticate(&self, credential: &str) -> Option<Principal> {
        self.verify(credential)
    }

    fn name(&self) -> &str {
        "token"
    }
}
