use crate::features::world::SecurityWorld;
use cucumber::{given, then, when};
use rampart_core::middleware::{RateDecision, RateLimitStore};
use std::time::Duration;

#[given(expr = "a rate limiter with a {int} ms window, base limit {int} and penalty {int}")]
async fn rate_limiter(world: &mut SecurityWorld, window_ms: u64, base: u64, penalty: u64) {
    let window = Duration::from_millis(window_ms);
    world.store = Some(RateLimitStore::new(window, base, penalty));
}

#[when(expr = "{int} requests from {string} arrive at once")]
async fn requests_arrive(world: &mut SecurityWorld, count: usize, key: String) {
    let store = world.store.as_ref().expect("rate limiter configured");
    for _ in 0..count {
        world.decisions.push(store.check_at(&key, world.clock));
    }
}

#[when(expr = "{int} ms pass")]
async fn time_passes(world: &mut SecurityWorld, ms: u64) {
    world.advance(ms);
}

#[then(expr = "request {int} is allowed")]
async fn request_allowed(world: &mut SecurityWorld, n: usize) {
    assert!(
        world.decisions[n - 1].is_allowed(),
        "decisions: {:?}",
        world.decisions
    );
}

#[then(expr = "request {int} is denied with a {int} ms lockout")]
async fn request_denied(world: &mut SecurityWorld, n: usize, lockout_ms: u64) {
    assert_eq!(
        world.decisions[n - 1],
        RateDecision::Denied {
            retry_after: Duration::from_millis(lockout_ms),
        }
    );
}

#[then(expr = "{string} has a count of {int}")]
async fn bucket_count(world: &mut SecurityWorld, key: String, count: u64) {
    let store = world.store.as_ref().expect("rate limiter configured");
    assert_eq!(store.count(&key), Some(count));
}
