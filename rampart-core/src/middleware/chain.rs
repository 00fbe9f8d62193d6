//! Continuation-passing chain executor
//!
//! `execute(i)` runs middleware `i` with a continuation that runs `i + 1`;
//! past the end it runs the final handler. Each step records whether it
//! invoked its continuation. A step that returns without proceeding marks the
//! chain blocked with `"<name> blocked request"`, and nothing downstream runs.

use super::{FinalHandler, SecurityContext, SecurityMiddleware};
use crate::error::SecurityResult;
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// What happened downstream of a continuation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Every remaining middleware proceeded and the handler ran
    Completed,
    /// A middleware did not proceed
    Blocked { reason: String },
}

impl Flow {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Flow::Blocked { .. })
    }
}

/// Outcome of a whole chain run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainResult {
    pub blocked: bool,
    pub reason: Option<String>,
}

impl From<Flow> for ChainResult {
    fn from(flow: Flow) -> Self {
        match flow {
            Flow::Completed => ChainResult {
                blocked: false,
                reason: None,
            },
            Flow::Blocked { reason } => ChainResult {
                blocked: true,
                reason: Some(reason),
            },
        }
    }
}

/// Per-run bookkeeping shared by every continuation
struct ChainState {
    proceeded: Vec<AtomicBool>,
    blocked: Mutex<Option<String>>,
}

impl ChainState {
    fn new(len: usize) -> Self {
        Self {
            proceeded: (0..len).map(|_| AtomicBool::new(false)).collect(),
            blocked: Mutex::new(None),
        }
    }

    fn mark_proceeded(&self, step: usize) {
        if let Some(flag) = self.proceeded.get(step) {
            flag.store(true, Ordering::SeqCst);
        }
    }

    fn proceeded(&self, step: usize) -> bool {
        self.proceeded.get(step).is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Record a block; the first (innermost) reason is kept
    fn block(&self, reason: String) {
        let mut blocked = self.blocked.lock().unwrap_or_else(PoisonError::into_inner);
        if blocked.is_none() {
            *blocked = Some(reason);
        }
    }

    fn flow(&self) -> Flow {
        match self.blocked.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            Some(reason) => Flow::Blocked { reason },
            None => Flow::Completed,
        }
    }
}

/// Continuation handed to a middleware
///
/// Consumed by [`Next::run`], so a middleware can proceed at most once.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn SecurityMiddleware>],
    position: usize,
    handler: &'a dyn FinalHandler,
    state: &'a ChainState,
}

impl<'a> Next<'a> {
    /// Run the rest of the chain
    pub fn run<'b>(self, ctx: &'b mut SecurityContext) -> BoxFuture<'b, SecurityResult<Flow>>
    where
        'a: 'b,
    {
        Box::pin(async move {
            if let Some(caller) = self.position.checked_sub(1) {
                self.state.mark_proceeded(caller);
            }

            let Some(middleware) = self.middlewares.get(self.position) else {
                self.handler.call(ctx).await?;
                return Ok(self.state.flow());
            };

            let next = Next {
                position: self.position + 1,
                ..self
            };
            middleware.handle(ctx, next).await?;

            if !self.state.proceeded(self.position) {
                log::warn!(
                    "Request {} blocked by middleware '{}'",
                    ctx.request_id,
                    middleware.name()
                );
                self.state.block(format!("{} blocked request", middleware.name()));
            }
            Ok(self.state.flow())
        })
    }
}

/// Chain executor
pub struct SecurityChain;

impl SecurityChain {
    /// Run `middlewares` around `handler`
    ///
    /// `Ok(ChainResult { blocked: true, .. })` is a soft block; `Err` is a
    /// hard failure raised by a middleware or the handler. The two never
    /// occur together.
    pub async fn run(
        middlewares: &[Arc<dyn SecurityMiddleware>],
        ctx: &mut SecurityContext,
        handler: &dyn FinalHandler,
    ) -> SecurityResult<ChainResult> {
        let state = ChainState::new(middlewares.len());
        let start = Next {
            middlewares,
            position: 0,
            handler,
            state: &state,
        };
        let flow = start.run(ctx).await?;
        Ok(flow.into())
    }
}
