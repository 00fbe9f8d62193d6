use crate::features::world::SecurityWorld;
use async_trait::async_trait;
use cucumber::{given, then, when};
use rampart_core::middleware::{sanitize_str, CsrfProtector, Next, SecurityChain};
use rampart_core::prelude::*;
use std::sync::{Arc, Mutex};

/// Records its name, then proceeds or stops
struct Step {
    name: String,
    proceed: bool,
    trace: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl SecurityMiddleware for Step {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, ctx: &mut SecurityContext, next: Next<'_>) -> SecurityResult<()> {
        self.trace.lock().unwrap().push(self.name.clone());
        if self.proceed {
            next.run(ctx).await?;
        }
        Ok(())
    }
}

#[given(expr = "a middleware chain {string}")]
async fn middleware_chain(world: &mut SecurityWorld, layout: String) {
    world.chain = layout
        .split(',')
        .map(str::trim)
        .map(|entry| {
            let (name, action) = entry.split_once(':').expect("entries look like name:action");
            Arc::new(Step {
                name: name.to_string(),
                proceed: action == "pass",
                trace: world.trace.clone(),
            }) as Arc<dyn SecurityMiddleware>
        })
        .collect();
}

#[given(expr = "the CSRF protector with default settings")]
async fn csrf_chain(world: &mut SecurityWorld) {
    world.chain = vec![Arc::new(CsrfProtector::default())];
}

#[given(expr = "the request header {string} is {string}")]
async fn request_header(world: &mut SecurityWorld, name: String, value: String) {
    let request = std::mem::replace(&mut world.request, SecurityContext::new("POST", "/"));
    world.request = request.with_header(name, value);
}

#[given(expr = "the request cookie {string} is {string}")]
async fn request_cookie(world: &mut SecurityWorld, name: String, value: String) {
    world.request.metadata.cookies.insert(name, value);
}

#[when(expr = "the chain runs")]
async fn chain_runs(world: &mut SecurityWorld) {
    let trace = world.trace.clone();
    let handler = move |_ctx: &mut SecurityContext| -> SecurityResult<()> {
        trace.lock().unwrap().push("handler".to_string());
        Ok(())
    };
    let result = SecurityChain::run(&world.chain, &mut world.request, &handler).await;
    world.chain_result = Some(result);
}

#[then(expr = "the chain is blocked with reason {string}")]
async fn chain_blocked(world: &mut SecurityWorld, reason: String) {
    match world.chain_result.as_ref() {
        Some(Ok(result)) => {
            assert!(result.blocked);
            assert_eq!(result.reason.as_deref(), Some(reason.as_str()));
        }
        other => panic!("expected a blocked chain, got {:?}", other),
    }
}

#[then(expr = "the chain completes")]
async fn chain_completes(world: &mut SecurityWorld) {
    match world.chain_result.as_ref() {
        Some(Ok(result)) => assert!(!result.blocked),
        other => panic!("expected a completed chain, got {:?}", other),
    }
}

#[then(expr = "the chain fails with code {string}")]
async fn chain_fails(world: &mut SecurityWorld, code: String) {
    match world.chain_result.as_ref() {
        Some(Err(err)) => assert_eq!(err.code(), code),
        other => panic!("expected a failed chain, got {:?}", other),
    }
}

#[then(expr = "the executed steps are {string}")]
async fn executed_steps(world: &mut SecurityWorld, expected: String) {
    let expected: Vec<String> = expected.split(',').map(|s| s.trim().to_string()).collect();
    assert_eq!(*world.trace.lock().unwrap(), expected);
}

#[when(expr = "the text {string} is sanitized")]
async fn text_sanitized(world: &mut SecurityWorld, text: String) {
    world.sanitized = Some(sanitize_str(&text));
}

#[then(expr = "the sanitized text is {string}")]
async fn sanitized_text(world: &mut SecurityWorld, expected: String) {
    assert_eq!(world.sanitized.as_deref(), Some(expected.as_str()));
}
