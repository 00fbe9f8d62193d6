//! Named-policy guard

use super::{resolve_principal, Guard, GuardOptions, RequestContext};
use crate::auth::AuthStrategy;
use crate::error::SecurityResult;
use crate::policy::PolicyRegistry;
use async_trait::async_trait;
use std::sync::Arc;

/// Evaluates the configured policies in order; all must pass
///
/// Authenticates lazily when no principal is attached yet. A policy name
/// missing from the registry denies (fail-closed).
#[derive(Clone)]
pub struct PolicyGuard {
    registry: Arc<PolicyRegistry>,
    strategy: Arc<dyn AuthStrategy>,
}

impl PolicyGuard {
    pub fn new(registry: Arc<PolicyRegistry>, strategy: Arc<dyn AuthStrategy>) -> Self {
        Self { registry, strategy }
    }
}

#[async_trait]
impl Guard for PolicyGuard {
    fn name(&self) -> &str {
        "policies"
    }

    async fn can_activate(
        &self,
        ctx: &mut RequestContext,
        options: Option<&GuardOptions>,
    ) -> SecurityResult<bool> {
        if resolve_principal(ctx, self.strategy.as_ref()).is_none() {
            return Ok(false);
        }

        let ctx: &RequestContext = ctx;
        let Some(principal) = ctx.principal() else {
            return Ok(false);
        };

        for name in options.map(|o| o.policies.as_slice()).unwrap_or_default() {
            let Some(policy) = self.registry.get(name) else {
                log::warn!("Policy guard: policy '{}' is not registered, denying", name);
                return Ok(false);
            };
            if !policy.evaluate(principal, Some(ctx)).await {
                log::debug!("Policy guard: '{}' rejected {}", name, principal.id);
                return Ok(false);
            }
        }
        Ok(true)
    }
}
