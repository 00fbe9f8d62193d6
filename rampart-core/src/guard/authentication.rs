//! Bearer-credential authentication guard

use super::{resolve_principal, Guard, GuardOptions, RequestContext};
use crate::auth::AuthStrategy;
use crate::error::SecurityResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Authenticates the `Authorization: Bearer` credential and attaches the principal
///
/// Missing or invalid credentials deny softly; this guard never errors.
#[derive(Clone)]
pub struct AuthenticationGuard {
    strategy: Arc<dyn AuthStrategy>,
}

impl AuthenticationGuard {
    pub fn new(strategy: Arc<dyn AuthStrategy>) -> Self {
        Self { strategy }
    }
}

#[async_trait]
impl Guard for AuthenticationGuard {
    fn name(&self) -> &str {
        "authentication"
    }

    async fn can_activate(
        &self,
        ctx: &mut RequestContext,
        _options: Option<&GuardOptions>,
    ) -> SecurityResult<bool> {
        Ok(resolve_principal(ctx, self.strategy.as_ref()).is_some())
    }
}
