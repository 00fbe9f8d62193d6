//! Guard phase
//!
//! Guards are request-scoped predicates evaluated strictly in declaration
//! order before a handler runs. A guard may attach the resolved
//! [`Principal`] to the [`RequestContext`] so that later guards reuse it.
//!
//! Built-in guards:
//! - [`AuthenticationGuard`]: bearer credential -> principal
//! - [`RoleGuard`]: any-match on configured roles
//! - [`PolicyGuard`]: every configured policy must pass, unknown names deny

mod authentication;
mod chain;
mod policy;
mod role;

pub use authentication::AuthenticationGuard;
pub use chain::{evaluate_guards, DenialReason, GuardDenial, GuardOutcome};
pub use policy::PolicyGuard;
pub use role::RoleGuard;

use crate::auth::{extract_bearer, AuthStrategy};
use crate::container::InstanceResolver;
use crate::error::SecurityResult;
use crate::headers::Headers;
use crate::principal::Principal;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-route guard options carried by a guard enhancer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardOptions {
    /// Roles accepted by [`RoleGuard`] (any-match)
    #[serde(default)]
    pub roles: Vec<String>,

    /// Policies required by [`PolicyGuard`] (all must pass, in order)
    #[serde(default)]
    pub policies: Vec<String>,
}

impl GuardOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_policies<I, S>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policies = policies.into_iter().map(Into::into).collect();
        self
    }
}

/// Mutable state shared by the guards of one request
pub struct RequestContext {
    headers: Headers,
    principal: Option<Principal>,
    resolver: Arc<dyn InstanceResolver>,
}

impl RequestContext {
    pub fn new(headers: Headers, resolver: Arc<dyn InstanceResolver>) -> Self {
        Self {
            headers,
            principal: None,
            resolver,
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Attach a resolved principal
    ///
    /// A principal, once attached, is kept for the rest of the request: a
    /// second call leaves the first one in place and returns `false`.
    pub fn attach_principal(&mut self, principal: Principal) -> bool {
        if self.principal.is_some() {
            return false;
        }
        self.principal = Some(principal);
        true
    }

    /// Handle on the instance-resolution collaborator
    pub fn resolver(&self) -> &Arc<dyn InstanceResolver> {
        &self.resolver
    }

    pub(crate) fn into_principal(self) -> Option<Principal> {
        self.principal
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("headers", &self.headers)
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

/// Request-scoped predicate deciding whether processing may continue
#[async_trait]
pub trait Guard: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// `Ok(false)` is a soft denial; `Err` aborts the whole request
    async fn can_activate(
        &self,
        ctx: &mut RequestContext,
        options: Option<&GuardOptions>,
    ) -> SecurityResult<bool>;
}

/// Return the attached principal, authenticating the bearer credential first
/// when none is attached yet
pub fn resolve_principal<'c>(
    ctx: &'c mut RequestContext,
    strategy: &dyn AuthStrategy,
) -> Option<&'c Principal> {
    if ctx.principal.is_none() {
        let authenticated = extract_bearer(&ctx.headers).and_then(|t| strategy.authenticate(t));
        match authenticated {
            Some(principal) => {
                log::debug!(
                    "Principal {} authenticated via {}",
                    principal.id,
                    strategy.name()
                );
                ctx.attach_principal(principal);
            }
            None => log::debug!("No principal resolved via {}", strategy.name()),
        }
    }
    ctx.principal.as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStrategy;
    use crate::container::ComponentRegistry;

    fn context(headers: Headers) -> RequestContext {
        RequestContext::new(headers, Arc::new(ComponentRegistry::new()))
    }

    #[test]
    fn test_attached_principal_is_never_replaced() {
        let mut ctx = context(Headers::new());
        assert!(ctx.attach_principal(Principal::new("first", ["user"])));
        assert!(!ctx.attach_principal(Principal::new("second", ["admin"])));
        assert_eq!(ctx.principal().map(|p| p.id.as_str()), Some("first"));
    }

    #[test]
    fn test_resolve_principal_authenticates_once() {
        let tokens = TokenStrategy::new("secret");
        let token = tokens.issue(&Principal::new("alice", ["user"])).unwrap();
        let mut ctx = context(Headers::new().with("Authorization", format!("Bearer {}", token)));

        let resolved = resolve_principal(&mut ctx, &tokens).map(|p| p.id.clone());
        assert_eq!(resolved, Some("alice".into()));
        // A second strategy with another secret cannot override the attached principal
        let other = TokenStrategy::new("other");
        let resolved = resolve_principal(&mut ctx, &other).map(|p| p.id.clone());
        assert_eq!(resolved, Some("alice".into()));
    }

    #[test]
    fn test_resolve_principal_without_credential() {
        let tokens = TokenStrategy::new("secret");
        let mut ctx = context(Headers::new());
        assert!(resolve_principal(&mut ctx, &tokens).is_none());
        assert!(ctx.principal().is_none());
    }

    #[test]
    fn test_guard_options_deserialize_with_defaults() {
        let options: GuardOptions = serde_json::from_str(r#"{"roles":["admin"]}"#).unwrap();
        assert_eq!(options, GuardOptions::new().with_roles(["admin"]));
        assert!(options.policies.is_empty());
    }
}
