//! Sequential guard-chain evaluation

use super::{GuardOptions, RequestContext};
use crate::enhancer::Enhancer;
use crate::error::SecurityResult;

/// Why a guard chain stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// The guard evaluated to `false`
    Rejected,
    /// No guard is registered under the enhancer's identifier
    Unresolved,
}

/// Soft-denial signal identifying the blocking guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardDenial {
    pub guard_id: String,
    pub options: Option<GuardOptions>,
    pub reason: DenialReason,
}

/// Result of evaluating every guard enhancer of a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allowed,
    Denied(GuardDenial),
}

impl GuardOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardOutcome::Allowed)
    }
}

/// Evaluate the guard enhancers in declaration order
///
/// Guards run one after the other, never concurrently, since later guards
/// read the principal attached by earlier ones. The first `false` stops the
/// chain. Guard errors are not caught.
pub async fn evaluate_guards(
    enhancers: &[Enhancer],
    ctx: &mut RequestContext,
) -> SecurityResult<GuardOutcome> {
    let resolver = ctx.resolver().clone();

    for enhancer in enhancers {
        let Enhancer::Guard { guard_id, options } = enhancer else {
            continue;
        };

        let Some(guard) = resolver.resolve_guard(guard_id) else {
            log::warn!("Guard '{}' is not registered, denying", guard_id);
            return Ok(GuardOutcome::Denied(GuardDenial {
                guard_id: guard_id.clone(),
                options: options.clone(),
                reason: DenialReason::Unresolved,
            }));
        };

        if !guard.can_activate(ctx, options.as_ref()).await? {
            log::warn!("Request denied by guard '{}' ({})", guard_id, guard.name());
            return Ok(GuardOutcome::Denied(GuardDenial {
                guard_id: guard_id.clone(),
                options: options.clone(),
                reason: DenialReason::Rejected,
            }));
        }
    }

    Ok(GuardOutcome::Allowed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ComponentRegistry;
    use crate::error::SecurityError;
    use crate::guard::Guard;
    use crate::headers::Headers;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Records its id in a shared log and answers a fixed verdict
    struct Recording {
        id: &'static str,
        verdict: Result<bool, &'static str>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Guard for Recording {
        fn name(&self) -> &str {
            self.id
        }

        async fn can_activate(
            &self,
            _ctx: &mut RequestContext,
            _options: Option<&GuardOptions>,
        ) -> SecurityResult<bool> {
            self.log.lock().unwrap().push(self.id);
            self.verdict.map_err(|msg| SecurityError::Handler(msg.to_string()))
        }
    }

    fn registry(
        verdicts: &[(&'static str, Result<bool, &'static str>)],
    ) -> (Arc<ComponentRegistry>, Arc<Mutex<Vec<&'static str>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ComponentRegistry::new();
        for (id, verdict) in verdicts {
            let guard = Recording {
                id: *id,
                verdict: *verdict,
                log: log.clone(),
            };
            registry.register_guard(*id, guard);
        }
        (Arc::new(registry), log)
    }

    fn guard(id: &str) -> Enhancer {
        Enhancer::guard(id, None)
    }

    #[tokio::test]
    async fn test_first_denial_stops_the_chain() {
        let (registry, log) = registry(&[("a", Ok(true)), ("b", Ok(false)), ("c", Ok(true))]);
        let mut ctx = RequestContext::new(Headers::new(), registry);

        let enhancers = [guard("a"), guard("b"), guard("c")];
        let outcome = evaluate_guards(&enhancers, &mut ctx).await.unwrap();

        assert_eq!(
            outcome,
            GuardOutcome::Denied(GuardDenial {
                guard_id: "b".into(),
                options: None,
                reason: DenialReason::Rejected
            })
        );
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_all_allow() {
        let (registry, log) = registry(&[("a", Ok(true)), ("b", Ok(true))]);
        let mut ctx = RequestContext::new(Headers::new(), registry);

        let enhancers = [guard("a"), Enhancer::security(["audit"]), guard("b")];
        assert!(evaluate_guards(&enhancers, &mut ctx).await.unwrap().is_allowed());
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_unresolved_guard_fails_closed() {
        let (registry, _) = registry(&[]);
        let mut ctx = RequestContext::new(Headers::new(), registry);

        match evaluate_guards(&[guard("ghost")], &mut ctx).await.unwrap() {
            GuardOutcome::Denied(denial) => assert_eq!(denial.reason, DenialReason::Unresolved),
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_guard_error_propagates() {
        let (registry, log) = registry(&[("boom", Err("exploded")), ("after", Ok(true))]);
        let mut ctx = RequestContext::new(Headers::new(), registry);

        let result = evaluate_guards(&[guard("boom"), guard("after")], &mut ctx).await;
        assert!(matches!(result, Err(SecurityError::Handler(_))));
        assert_eq!(*log.lock().unwrap(), vec!["boom"]);
    }

    #[tokio::test]
    async fn test_denial_carries_options() {
        let (registry, _) = registry(&[("roles", Ok(false))]);
        let mut ctx = RequestContext::new(Headers::new(), registry);
        let options = GuardOptions::new().with_roles(["admin"]);

        let enhancers = [Enhancer::guard("roles", Some(options.clone()))];
        let outcome = evaluate_guards(&enhancers, &mut ctx).await.unwrap();
        match outcome {
            GuardOutcome::Denied(denial) => assert_eq!(denial.options, Some(options)),
            other => panic!("expected denial, got {:?}", other),
        }
    }
}
