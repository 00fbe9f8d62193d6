use crate::features::world::{SecurityWorld, CONTROLLER, METHOD};
use cucumber::{given, then, when};
use rampart_core::guard::DenialReason;
use rampart_core::policy::DeclaredPolicy;
use rampart_core::prelude::*;

fn list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

#[given(expr = "the route requires authentication")]
async fn route_requires_auth(world: &mut SecurityWorld) {
    world.app.route(CONTROLLER, METHOD, Enhancer::guard("auth", None));
}

#[given(expr = "the route requires one of the roles {string}")]
async fn route_requires_roles(world: &mut SecurityWorld, roles: String) {
    let options = GuardOptions::new().with_roles(list(&roles));
    world.app.route(CONTROLLER, METHOD, Enhancer::guard("roles", Some(options)));
}

#[given(expr = "the route requires the policies {string}")]
async fn route_requires_policies(world: &mut SecurityWorld, policies: String) {
    let options = GuardOptions::new().with_policies(list(&policies));
    let guard = Enhancer::guard("policies", Some(options));
    world.app.route(CONTROLLER, METHOD, guard);
}

#[given(expr = "the route uses the guard {string}")]
async fn route_uses_guard(world: &mut SecurityWorld, guard_id: String) {
    world.app.route(CONTROLLER, METHOD, Enhancer::guard(guard_id, None));
}

#[given(expr = "the route uses the middlewares {string}")]
async fn route_uses_middlewares(world: &mut SecurityWorld, ids: String) {
    world.app.route(CONTROLLER, METHOD, Enhancer::security(list(&ids)));
}

#[given(expr = "the policy {string} is granted to principals declaring it")]
async fn declared_policy(world: &mut SecurityWorld, name: String) {
    world.app.policies().register(DeclaredPolicy::new(name));
}

#[given(expr = "the policy {string} always fails")]
async fn failing_policy(world: &mut SecurityWorld, name: String) {
    world.app.policies().register(PolicyFn::new(name, |_principal, _ctx| false));
}

#[given(expr = "a request carrying a token for {string} with roles {string}")]
async fn request_with_token(world: &mut SecurityWorld, id: String, roles: String) {
    let token = world.tokens().issue(&Principal::new(id, list(&roles))).expect("token issued");
    world.request.headers.insert("authorization", format!("Bearer {}", token));
}

#[given(expr = "a request carrying a token for {string} declaring the policy {string}")]
async fn request_with_policy_token(world: &mut SecurityWorld, id: String, policy: String) {
    let principal = Principal::new(id, ["user"]).with_policy(policy);
    let token = world.tokens().issue(&principal).expect("token issued");
    world.request.headers.insert("authorization", format!("Bearer {}", token));
}

#[given(expr = "a request carrying a tampered token for {string}")]
async fn request_with_tampered_token(world: &mut SecurityWorld, id: String) {
    let token = world.tokens().issue(&Principal::new(id, ["admin"])).expect("token issued");
    let forged = world.tokens().issue(&Principal::new("mallory", ["admin"])).expect("token issued");

    // Payload of a different identity under the original signature
    let original: Vec<&str> = token.split('.').collect();
    let forged_payload = forged.split('.').nth(1).unwrap_or_default();
    let tampered = format!("{}.{}.{}", original[0], forged_payload, original[2]);
    world.request.headers.insert("authorization", format!("Bearer {}", tampered));
}

#[given(expr = "a request without credentials")]
async fn request_without_credentials(world: &mut SecurityWorld) {
    world.request.headers.remove("authorization");
}

#[when(expr = "the request is handled")]
async fn request_handled(world: &mut SecurityWorld) {
    world.handle_request().await;
}

#[then(expr = "the handler runs")]
async fn handler_runs(world: &mut SecurityWorld) {
    match world.outcome.as_ref() {
        Some(Ok(PipelineOutcome::Completed)) => {}
        other => panic!("expected a completed pipeline, got {:?}", other),
    }
    assert!(world.handler_ran());
}

#[then(expr = "the request is denied by the guard {string}")]
async fn denied_by(world: &mut SecurityWorld, guard_id: String) {
    match world.outcome.as_ref() {
        Some(Ok(PipelineOutcome::Denied(denial))) => {
            assert_eq!(denial.guard_id, guard_id);
            assert_eq!(denial.reason, DenialReason::Rejected);
        }
        other => panic!("expected a guard denial, got {:?}", other),
    }
    assert!(!world.handler_ran());
}

#[then(expr = "the request is denied because the guard {string} is unknown")]
async fn denied_unresolved(world: &mut SecurityWorld, guard_id: String) {
    match world.outcome.as_ref() {
        Some(Ok(PipelineOutcome::Denied(denial))) => {
            assert_eq!(denial.guard_id, guard_id);
            assert_eq!(denial.reason, DenialReason::Unresolved);
        }
        other => panic!("expected an unresolved guard denial, got {:?}", other),
    }
    assert!(!world.handler_ran());
}

#[then(expr = "the request fails with status {int} and code {string}")]
async fn request_fails(world: &mut SecurityWorld, status: u16, code: String) {
    match world.outcome.as_ref() {
        Some(Err(err)) => {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.code(), code);
        }
        other => panic!("expected a hard failure, got {:?}", other),
    }
    assert!(!world.handler_ran());
}

#[then(expr = "the handler sees the principal {string}")]
async fn handler_sees_principal(world: &mut SecurityWorld, id: String) {
    assert_eq!(
        world.request.principal.as_ref().map(|p| p.id.as_str()),
        Some(id.as_str())
    );
}
