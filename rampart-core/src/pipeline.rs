//! Guard chain followed by the middleware chain around one handler call

use crate::container::InstanceResolver;
use crate::enhancer::{middleware_ids, Enhancer, RouteTable};
use crate::error::{SecurityError, SecurityResult};
use crate::guard::{evaluate_guards, GuardDenial, GuardOutcome, RequestContext};
use crate::middleware::{FinalHandler, SecurityChain, SecurityContext, SecurityMiddleware};
use std::sync::Arc;

/// Observable result of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Guards allowed, every middleware proceeded, handler ran
    Completed,
    /// A guard denied; nothing else ran
    Denied(GuardDenial),
    /// A middleware did not proceed; the handler did not run
    Blocked { reason: String },
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed)
    }
}

#[derive(Clone)]
pub struct SecurityPipeline {
    resolver: Arc<dyn InstanceResolver>,
}

impl std::fmt::Debug for SecurityPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityPipeline").finish_non_exhaustive()
    }
}

impl SecurityPipeline {
    pub fn new(resolver: Arc<dyn InstanceResolver>) -> Self {
        Self { resolver }
    }

    /// Run the guards and middlewares declared by `enhancers`, then `handler`
    ///
    /// Guards start from an empty principal slot and only see what they
    /// authenticate themselves; a principal already set on `request` is
    /// replaced by the one the guards attach before the middlewares run. A
    /// middleware id with no registered instance is a hard error raised
    /// before any middleware executes.
    pub async fn execute(
        &self,
        enhancers: &[Enhancer],
        request: &mut SecurityContext,
        handler: &dyn FinalHandler,
    ) -> SecurityResult<PipelineOutcome> {
        let mut guard_ctx = RequestContext::new(request.headers.clone(), self.resolver.clone());

        if let GuardOutcome::Denied(denial) = evaluate_guards(enhancers, &mut guard_ctx).await? {
            log::debug!(
                "Request {} to {} {} denied by guard '{}'",
                request.request_id,
                request.method,
                request.path,
                denial.guard_id
            );
            return Ok(PipelineOutcome::Denied(denial));
        }

        if let Some(principal) = guard_ctx.into_principal() {
            request.principal = Some(principal);
        }

        let middlewares = self.resolve_middlewares(enhancers)?;
        let result = SecurityChain::run(&middlewares, request, handler).await?;

        Ok(match result.reason {
            Some(reason) if result.blocked => PipelineOutcome::Blocked { reason },
            _ => PipelineOutcome::Completed,
        })
    }

    /// Look up the enhancers registered for `controller`/`method` and execute them
    pub async fn execute_route(
        &self,
        routes: &RouteTable,
        controller: &str,
        method: &str,
        request: &mut SecurityContext,
        handler: &dyn FinalHandler,
    ) -> SecurityResult<PipelineOutcome> {
        self.execute(routes.enhancers(controller, method), request, handler).await
    }

    fn resolve_middlewares(
        &self,
        enhancers: &[Enhancer],
    ) -> SecurityResult<Vec<Arc<dyn SecurityMiddleware>>> {
        middleware_ids(enhancers)
            .into_iter()
            .map(|id| {
                self.resolver.resolve_middleware(id).ok_or_else(|| {
                    log::warn!("Middleware '{}' is not registered, failing closed", id);
                    SecurityError::UnresolvedMiddleware(id.to_string())
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStrategy;
    use crate::container::ComponentRegistry;
    use crate::guard::{AuthenticationGuard, DenialReason, GuardOptions, RoleGuard};
    use crate::middleware::{CsrfProtector, InputSanitizer};
    use crate::principal::Principal;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pipeline() -> (SecurityPipeline, TokenStrategy) {
        let tokens = TokenStrategy::new("pipeline-secret");
        let registry = ComponentRegistry::new();
        registry.register_guard("auth", AuthenticationGuard::new(Arc::new(tokens.clone())));
        registry.register_guard("roles", RoleGuard::new());
        registry.register_middleware("sanitizer", InputSanitizer::new());
        registry.register_middleware("csrf", CsrfProtector::default());
        (SecurityPipeline::new(Arc::new(registry)), tokens)
    }

    fn admin_route() -> Vec<Enhancer> {
        vec![
            Enhancer::guard("auth", None),
            Enhancer::guard("roles", Some(GuardOptions::new().with_roles(["admin"]))),
            Enhancer::security(["sanitizer"]),
        ]
    }

    #[tokio::test]
    async fn test_allowed_request_sees_principal_and_clean_body() {
        let (pipeline, tokens) = pipeline();
        let token = tokens.issue(&Principal::new("u1", ["admin"])).unwrap();
        let mut request = SecurityContext::new("POST", "/admin")
            .with_header("authorization", format!("Bearer {}", token))
            .with_body(json!({ "note": "<script>x</script> hi " }));

        let handler = |ctx: &mut SecurityContext| -> SecurityResult<()> {
            assert_eq!(ctx.principal.as_ref().map(|p| p.id.as_str()), Some("u1"));
            assert_eq!(ctx.body["note"], "hi");
            Ok(())
        };

        let outcome = pipeline.execute(&admin_route(), &mut request, &handler).await.unwrap();
        assert_eq!(outcome, PipelineOutcome::Completed);
    }

    #[tokio::test]
    async fn test_role_denial_skips_middlewares_and_handler() {
        let (pipeline, tokens) = pipeline();
        let token = tokens.issue(&Principal::new("u2", ["viewer"])).unwrap();
        let mut request = SecurityContext::new("POST", "/admin")
            .with_header("authorization", format!("Bearer {}", token))
            .with_body(json!({ "note": "<script>x</script>" }));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handler = move |_ctx: &mut SecurityContext| -> SecurityResult<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        let outcome = pipeline.execute(&admin_route(), &mut request, &handler).await.unwrap();
        let denial = match outcome {
            PipelineOutcome::Denied(denial) => denial,
            other => panic!("expected a denial, got {:?}", other),
        };
        assert_eq!(denial.guard_id, "roles");
        assert_eq!(denial.reason, DenialReason::Rejected);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(request.body["note"], "<script>x</script>");
    }

    #[tokio::test]
    async fn test_unresolved_middleware_is_hard_error() {
        let (pipeline, _) = pipeline();
        let mut request = SecurityContext::new("GET", "/");
        let handler = |_ctx: &mut SecurityContext| -> SecurityResult<()> { Ok(()) };

        let enhancers = vec![Enhancer::security(["sanitizer", "missing"])];
        let err = pipeline.execute(&enhancers, &mut request, &handler).await.unwrap_err();
        assert!(matches!(err, SecurityError::UnresolvedMiddleware(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_execute_route_uses_table() {
        let (pipeline, _) = pipeline();
        let mut routes = RouteTable::new();
        routes.register("Orders", "create", Enhancer::security(["csrf"]));

        let handler = |_ctx: &mut SecurityContext| -> SecurityResult<()> { Ok(()) };

        let mut request = SecurityContext::new("POST", "/orders");
        let err = pipeline
            .execute_route(&routes, "Orders", "create", &mut request, &handler)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);

        let mut request = SecurityContext::new("GET", "/orders");
        let outcome = pipeline
            .execute_route(&routes, "Orders", "list", &mut request, &handler)
            .await
            .unwrap();
        assert!(outcome.is_completed());
    }

    #[tokio::test]
    async fn test_request_principal_does_not_bypass_auth() {
        let (pipeline, _) = pipeline();
        let mut request = SecurityContext::new("GET", "/admin")
            .with_header("authorization", "Bearer forged.not.valid")
            .with_principal(Principal::new("root", ["admin"]));
        let handler = |_ctx: &mut SecurityContext| -> SecurityResult<()> { Ok(()) };

        let enhancers = vec![Enhancer::guard("auth", None)];
        let outcome = pipeline.execute(&enhancers, &mut request, &handler).await.unwrap();
        match outcome {
            PipelineOutcome::Denied(denial) => {
                assert_eq!(denial.guard_id, "auth");
                assert_eq!(denial.reason, DenialReason::Rejected);
            }
            other => panic!("expected a denial, got {:?}", other),
        }

        let mut request =
            SecurityContext::new("GET", "/admin").with_principal(Principal::new("svc", ["admin"]));
        let outcome = pipeline.execute(&admin_route(), &mut request, &handler).await.unwrap();
        assert!(matches!(outcome, PipelineOutcome::Denied(ref d) if d.guard_id == "auth"));
    }
}
