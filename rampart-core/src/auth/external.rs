//! External authorization-code strategy
//!
//! Stand-in for an exchange with an external identity provider: any non-empty
//! code is accepted and mapped to a minimal principal. Replace with a real
//! exchange by implementing [`AuthStrategy`] for a provider client.

use super::AuthStrategy;
use crate::principal::Principal;

/// Accepts any non-empty external code
#[derive(Debug, Clone)]
pub struct ExternalCodeStrategy {
    default_role: String,
}

impl Default for ExternalCodeStrategy {
    fn default() -> Self {
        Self {
            default_role: "user".to_string(),
        }
    }
}

impl ExternalCodeStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Role given to every principal produced by this strategy
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }
}

impl AuthStrategy for ExternalCodeStrategy {
    fn authenticate(&self, credential: &str) -> Option<Principal> {
        if credential.is_empty() {
            return None;
        }
        Some(Principal::new(credential, [self.default_role.as_str()]))
    }

    fn name(&self) -> &str {
        "external"
    }
}
