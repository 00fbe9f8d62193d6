//! Rampart - Core
//!
//! Request authorization and security enforcement for handler invocations.
//!
//! # Overview
//!
//! Every handler declares an ordered list of [`Enhancer`]s. At request time
//! the [`SecurityPipeline`] evaluates the guard enhancers in order (any
//! `false` stops the request with a [`GuardDenial`]), then runs the declared
//! security middlewares as a chain of responsibility around the handler.
//!
//! ```rust,ignore
//! use rampart_core::prelude::*;
//!
//! let mut app = SecurityApp::from_config(RampartConfig::load()?)?;
//! let stack = Enhancer::security(["sanitizer", "csrf", "rate_limit", "audit"]);
//! app.route("Orders", "create", Enhancer::guard("auth", None))
//!     .route("Orders", "create", stack);
//!
//! match app.handle("Orders", "create", &mut request, &handler).await? {
//!     PipelineOutcome::Completed => { /* handler ran */ }
//!     PipelineOutcome::Denied(denial) => { /* 401/403 from denial.guard_id */ }
//!     PipelineOutcome::Blocked { reason } => { /* middleware stopped the chain */ }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`auth`] - token, session and external-code authentication strategies
//! - [`policy`] - named policies and the policy registry
//! - [`guard`] - authentication, role and policy guards plus the guard chain
//! - [`middleware`] - sanitizer, CSRF, rate limiter, CORS/CSP, audit and the chain executor
//! - [`pipeline`] / [`app`] - wiring of all the above
//! - [`config`] / [`logging`] - TOML + env configuration, structured logging
//!
//! # Failure model
//!
//! Soft denials (guard `false`, middleware not proceeding, missing or invalid
//! credentials) are values. Hard denials (CSRF mismatch, disallowed origin,
//! rate limit, unresolved middleware) are [`SecurityError`]s.

pub mod app;
pub mod auth;
pub mod config;
pub mod container;
pub mod enhancer;
pub mod error;
pub mod guard;
pub mod headers;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod policy;
pub mod principal;

pub use app::SecurityApp;
pub use config::RampartConfig;
pub use container::{ComponentRegistry, InstanceResolver};
pub use enhancer::{Enhancer, RouteTable};
pub use error::{SecurityError, SecurityResult};
pub use guard::{GuardDenial, GuardOptions, GuardOutcome, RequestContext};
pub use headers::Headers;
pub use middleware::{SecurityContext, SecurityMiddleware};
pub use pipeline::{PipelineOutcome, SecurityPipeline};
pub use principal::Principal;

/// Common imports for wiring a pipeline
pub mod prelude {
    pub use crate::app::SecurityApp;
    pub use crate::auth::{AuthStrategy, ExternalCodeStrategy, SessionStrategy, TokenStrategy};
    pub use crate::config::RampartConfig;
    pub use crate::enhancer::Enhancer;
    pub use crate::error::{SecurityError, SecurityResult};
    pub use crate::guard::{Guard, GuardOptions, RequestContext};
    pub use crate::middleware::{Next, SecurityContext, SecurityMiddleware};
    pub use crate::pipeline::PipelineOutcome;
    pub use crate::policy::{MetadataPolicy, Policy, PolicyFn, PolicyRegistry};
    pub use crate::principal::Principal;
}
