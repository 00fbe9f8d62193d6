//! Role guard

use super::{Guard, GuardOptions, RequestContext};
use crate::error::SecurityResult;
use async_trait::async_trait;

/// Allows when the attached principal has at least one configured role
///
/// Relies on a principal attached by an earlier guard. With no roles
/// configured, any attached principal is allowed.
#[derive(Debug, Clone, Default)]
pub struct RoleGuard;

impl RoleGuard {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Guard for RoleGuard {
    fn name(&self) -> &str {
        "roles"
    }

    async fn can_activate(
        &self,
        ctx: &mut RequestContext,
        options: Option<&GuardOptions>,
    ) -> SecurityResult<bool> {
        let Some(principal) = ctx.principal() else {
            log::debug!("Role guard: no principal attached");
            return Ok(false);
        };

        let required = options.map(|o| o.roles.as_slice()).unwrap_or_default();
        if required.is_empty() {
            return Ok(true);
        }

        let allowed = principal.has_any_role(required);
        if !allowed {
            log::debug!("Role guard: {} has none of {:?}", principal.id, required);
        }
        Ok(allowed)
    }
}
