//! Adaptive rate limiter
//!
//! Fixed window per key with a penalty: while a window is active the cap is
//! `base_limit * penalty_multiplier`, and a denial pushes the window expiry
//! out to `now + window * penalty_multiplier` without touching the count.

use super::{Next, SecurityContext, SecurityMiddleware};
use crate::error::{SecurityError, SecurityResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Upper bound for windows and lockouts
pub const MAX_SPAN: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u64,
    expiry: Instant,
}

/// Result of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { limit: u64, remaining: u64 },
    Denied { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Shared per-key bucket table
///
/// Holds at most `max_buckets` keys. Making room purges expired buckets
/// first, then drops the one closest to expiry.
#[derive(Debug)]
pub struct RateLimitStore {
    buckets: Mutex<HashMap<String, Bucket>>,
    window: Duration,
    base_limit: u64,
    penalty_multiplier: u64,
    max_buckets: usize,
}

impl RateLimitStore {
    pub fn new(window: Duration, base_limit: u64, penalty_multiplier: u64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            window: window.min(MAX_SPAN),
            base_limit,
            penalty_multiplier,
            max_buckets: 100_000,
        }
    }

    pub fn with_max_buckets(mut self, max_buckets: usize) -> Self {
        self.max_buckets = max_buckets.max(1);
        self
    }

    /// Cap applied while a window is active
    pub fn effective_limit(&self) -> u64 {
        self.base_limit.saturating_mul(self.penalty_multiplier)
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Count one request for `key` at `now`
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let limit = self.effective_limit();
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        match buckets.get_mut(key) {
            Some(bucket) if bucket.expiry > now => {
                if bucket.count >= limit {
                    let lockout = self.lockout();
                    bucket.expiry = deadline(now, lockout);
                    return RateDecision::Denied {
                        retry_after: lockout,
                    };
                }
                bucket.count += 1;
                RateDecision::Allowed {
                    limit,
                    remaining: limit.saturating_sub(bucket.count),
                }
            }
            Some(bucket) => {
                *bucket = Bucket {
                    count: 1,
                    expiry: deadline(now, self.window),
                };
                RateDecision::Allowed {
                    limit,
                    remaining: limit.saturating_sub(1),
                }
            }
            None => {
                if buckets.len() >= self.max_buckets {
                    Self::make_room(&mut buckets, self.max_buckets, now);
                }
                let bucket = Bucket {
                    count: 1,
                    expiry: deadline(now, self.window),
                };
                buckets.insert(key.to_string(), bucket);
                RateDecision::Allowed {
                    limit,
                    remaining: limit.saturating_sub(1),
                }
            }
        }
    }

    fn lockout(&self) -> Duration {
        let multiplier = u32::try_from(self.penalty_multiplier).unwrap_or(u32::MAX);
        self.window.saturating_mul(multiplier).min(MAX_SPAN)
    }

    fn make_room(buckets: &mut HashMap<String, Bucket>, max: usize, now: Instant) {
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.expiry > now);
        while buckets.len() >= max {
            let soonest = buckets
                .iter()
                .min_by_key(|(_, bucket)| bucket.expiry)
                .map(|(key, _)| key.clone());
            match soonest {
                Some(key) => {
                    buckets.remove(&key);
                }
                None => break,
            }
        }
        let evicted = before - buckets.len();
        log::debug!("Rate limit store evicted {} buckets", evicted);
    }

    /// Current count for `key`, if tracked
    pub fn count(&self, key: &str) -> Option<u64> {
        let buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        buckets.get(key).map(|b| b.count)
    }

    pub fn len(&self) -> usize {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn deadline(now: Instant, span: Duration) -> Instant {
    now.checked_add(span).unwrap_or(now)
}

/// Rate limiting middleware over a shared [`RateLimitStore`]
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<RateLimitStore>,
}

impl RateLimiter {
    pub fn new(store: Arc<RateLimitStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RateLimitStore> {
        &self.store
    }

    /// Client address, then the first forwarded-for hop, then the request id
    pub fn resolve_key(ctx: &SecurityContext) -> String {
        if let Some(addr) = ctx.client_addr.as_deref().filter(|a| !a.is_empty()) {
            return addr.to_string();
        }
        ctx.header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| ctx.request_id.clone())
    }
}

#[async_trait]
impl SecurityMiddleware for RateLimiter {
    fn name(&self) -> &str {
        "RateLimiter"
    }

    async fn handle(&self, ctx: &mut SecurityContext, next: Next<'_>) -> SecurityResult<()> {
        let key = Self::resolve_key(ctx);
        match self.store.check(&key) {
            RateDecision::Allowed { limit, remaining } => {
                ctx.set_response_header(LIMIT_HEADER, limit.to_string());
                ctx.set_response_header(REMAINING_HEADER, remaining.to_string());
                next.run(ctx).await?;
                Ok(())
            }
            RateDecision::Denied { retry_after } => {
                log::warn!(
                    "Rate limit exceeded for {} on {} {}",
                    key,
                    ctx.method,
                    ctx.path
                );
                Err(SecurityError::RateLimitExceeded {
                    key,
                    retry_after_ms: retry_after.as_millis() as u64,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::SecurityChain;

    fn store(window_ms: u64, base: u64, penalty: u64) -> RateLimitStore {
        RateLimitStore::new(Duration::from_millis(window_ms), base, penalty)
    }

    #[test]
    fn test_threshold_without_penalty() {
        let store = store(1000, 2, 1);
        let now = Instant::now();

        assert_eq!(
            store.check_at("k", now),
            RateDecision::Allowed {
                limit: 2,
                remaining: 1,
            }
        );
        assert_eq!(
            store.check_at("k", now),
            RateDecision::Allowed {
                limit: 2,
                remaining: 0,
            }
        );
        assert_eq!(
            store.check_at("k", now),
            RateDecision::Denied {
                retry_after: Duration::from_millis(1000),
            }
        );
        assert_eq!(store.count("k"), Some(2));
    }

    #[test]
    fn test_effective_limit_includes_penalty() {
        let store = store(1000, 2, 2);
        let now = Instant::now();
        for _ in 0..4 {
            assert!(store.check_at("k", now).is_allowed());
        }
        assert_eq!(
            store.check_at("k", now),
            RateDecision::Denied {
                retry_after: Duration::from_millis(2000),
            }
        );
    }

    #[test]
    fn test_denial_extends_lockout() {
        let store = store(1000, 1, 1);
        let start = Instant::now();
        assert!(store.check_at("k", start).is_allowed());

        // Denied at 900ms pushes expiry to 1900ms
        let denied_at = start + Duration::from_millis(900);
        assert!(!store.check_at("k", denied_at).is_allowed());
        assert!(!store.check_at("k", start + Duration::from_millis(1500)).is_allowed());

        // The 1500ms denial moved expiry to 2500ms
        assert!(!store.check_at("k", start + Duration::from_millis(2400)).is_allowed());
        assert!(store.check_at("k", start + Duration::from_millis(4000)).is_allowed());
        assert_eq!(store.count("k"), Some(1));
    }

    #[test]
    fn test_oversized_window_and_penalty_are_capped() {
        let store = RateLimitStore::new(Duration::MAX, 1, u64::MAX);
        let now = Instant::now();
        assert!(store.check_at("k", now).is_allowed());
        assert_eq!(store.effective_limit(), u64::MAX);

        let store = RateLimitStore::new(Duration::MAX, 1, 1);
        assert!(store.check_at("k", now).is_allowed());
        assert_eq!(
            store.check_at("k", now),
            RateDecision::Denied {
                retry_after: MAX_SPAN,
            }
        );
    }

    #[test]
    fn test_window_expiry_resets_count() {
        let store = store(100, 1, 1);
        let start = Instant::now();
        assert!(store.check_at("k", start).is_allowed());
        assert!(store.check_at("k", start + Duration::from_millis(100)).is_allowed());
        assert_eq!(store.count("k"), Some(1));
    }

    #[test]
    fn test_keys_are_independent() {
        let store = store(1000, 1, 1);
        let now = Instant::now();
        assert!(store.check_at("a", now).is_allowed());
        assert!(store.check_at("b", now).is_allowed());
        assert!(!store.check_at("a", now).is_allowed());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_bounded_eviction() {
        let store = store(1000, 5, 1).with_max_buckets(2);
        let start = Instant::now();
        store.check_at("old", start);
        store.check_at("newer", start + Duration::from_millis(10));

        // Nothing expired yet, so the soonest-expiring bucket goes
        store.check_at("third", start + Duration::from_millis(20));
        assert_eq!(store.len(), 2);
        assert_eq!(store.count("old"), None);

        // After expiry every stale bucket is purged
        store.check_at("fourth", start + Duration::from_millis(5000));
        assert_eq!(store.len(), 1);
        assert_eq!(store.count("fourth"), Some(1));
    }

    #[test]
    fn test_key_resolution_priority() {
        let ctx = SecurityContext::new("GET", "/")
            .with_request_id("req-1")
            .with_header("x-forwarded-for", "10.0.0.1, 10.0.0.2");
        assert_eq!(RateLimiter::resolve_key(&ctx), "10.0.0.1");

        let ctx = ctx.with_client_addr("192.168.1.5");
        assert_eq!(RateLimiter::resolve_key(&ctx), "192.168.1.5");

        let bare = SecurityContext::new("GET", "/").with_request_id("req-2");
        assert_eq!(RateLimiter::resolve_key(&bare), "req-2");
    }

    #[tokio::test]
    async fn test_middleware_sets_headers_then_raises() {
        let limiter = RateLimiter::new(Arc::new(store(60_000, 1, 1)));
        let chain: Vec<Arc<dyn SecurityMiddleware>> = vec![Arc::new(limiter)];
        let handler = |_ctx: &mut SecurityContext| -> SecurityResult<()> { Ok(()) };

        let mut first = SecurityContext::new("GET", "/").with_client_addr("1.2.3.4");
        assert!(!SecurityChain::run(&chain, &mut first, &handler).await.unwrap().blocked);
        assert_eq!(first.response_header(LIMIT_HEADER), Some("1"));
        assert_eq!(first.response_header(REMAINING_HEADER), Some("0"));

        let mut second = SecurityContext::new("GET", "/").with_client_addr("1.2.3.4");
        let err = SecurityChain::run(&chain, &mut second, &handler).await.unwrap_err();
        assert!(matches!(
            err,
            SecurityError::RateLimitExceeded {
                ref key,
                retry_after_ms: 60_000,
            } if key == "1.2.3.4"
        ));
    }
}
