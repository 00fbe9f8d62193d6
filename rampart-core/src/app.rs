//! Application context owning every shared security service
//!
//! # Example
//!
//! ```no_run
//! use rampart_core::{Enhancer, GuardOptions, RampartConfig, SecurityApp, SecurityContext};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut app = SecurityApp::from_config(RampartConfig::load()?)?;
//! let admins = GuardOptions::new().with_roles(["admin"]);
//! app.route("Reports", "list", Enhancer::guard("auth", None))
//!     .route("Reports", "list", Enhancer::guard("roles", Some(admins)))
//!     .route("Reports", "list", Enhancer::security(["rate_limit", "audit"]));
//!
//! let mut request = SecurityContext::new("GET", "/reports");
//! let handler = |_ctx: &mut SecurityContext| -> rampart_core::SecurityResult<()> { Ok(()) };
//! let outcome = app.handle("Reports", "list", &mut request, &handler).await?;
//! # Ok(())
//! # }
//! ```

use crate::auth::{AuthStrategy, SessionStrategy, TokenStrategy};
use crate::config::RampartConfig;
use crate::container::ComponentRegistry;
use crate::enhancer::{Enhancer, RouteTable};
use crate::error::SecurityResult;
use crate::guard::{AuthenticationGuard, PolicyGuard, RoleGuard};
use crate::logging;
use crate::middleware::{
    AuditLogger, AuditSink, CorsMiddleware, CspMiddleware, CsrfProtector, FinalHandler,
    InputSanitizer, LogAuditSink, RateLimitStore, RateLimiter, SecurityContext,
};
use crate::pipeline::{PipelineOutcome, SecurityPipeline};
use crate::policy::PolicyRegistry;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Guard ids registered by [`SecurityApp::from_config`]
pub const AUTH_GUARD: &str = "auth";
pub const ROLES_GUARD: &str = "roles";
pub const POLICIES_GUARD: &str = "policies";

/// Middleware ids registered by [`SecurityApp::from_config`]
pub const SANITIZER: &str = "sanitizer";
pub const CSRF: &str = "csrf";
pub const RATE_LIMIT: &str = "rate_limit";
pub const CORS: &str = "cors";
pub const CSP: &str = "csp";
pub const AUDIT: &str = "audit";

pub struct SecurityApp {
    config: RampartConfig,
    policies: Arc<PolicyRegistry>,
    sessions: Arc<SessionStrategy>,
    tokens: Option<Arc<TokenStrategy>>,
    rate_limits: Arc<RateLimitStore>,
    components: Arc<ComponentRegistry>,
    routes: RouteTable,
    pipeline: SecurityPipeline,
}

impl std::fmt::Debug for SecurityApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityApp")
            .field("policies", &self.policies.names())
            .field("sessions", &self.sessions.len())
            .field("token_auth", &self.tokens.is_some())
            .field("guards", &self.components.guard_ids())
            .field("middlewares", &self.components.middleware_ids())
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl SecurityApp {
    /// Validate `config` and build every service with the built-in components
    ///
    /// Installs the process-wide logger from `config.logging` unless one is
    /// already installed. Bearer credentials are verified as signed tokens
    /// when token auth is enabled, and looked up as session ids otherwise.
    pub fn from_config(config: RampartConfig) -> Result<Self> {
        config.validate().context("Invalid rampart configuration")?;
        logging::init_logging(&config.logging).context("Failed to initialize logging")?;

        let policies = Arc::new(PolicyRegistry::new());
        let sessions = Arc::new(SessionStrategy::new(config.sessions.ttl()));
        let tokens = config.token.enabled.then(|| {
            let secret = config.token.secret.as_bytes().to_vec();
            Arc::new(TokenStrategy::new(secret))
        });
        let rate_limits = Arc::new(
            RateLimitStore::new(
                config.rate_limit.window(),
                config.rate_limit.base_limit,
                config.rate_limit.penalty_multiplier,
            )
            .with_max_buckets(config.rate_limit.max_buckets),
        );

        let strategy: Arc<dyn AuthStrategy> = match &tokens {
            Some(tokens) => tokens.clone() as Arc<dyn AuthStrategy>,
            None => sessions.clone(),
        };

        let components = Arc::new(ComponentRegistry::new());
        components.register_guard(AUTH_GUARD, AuthenticationGuard::new(strategy.clone()));
        components.register_guard(ROLES_GUARD, RoleGuard::new());
        let policy_guard = PolicyGuard::new(policies.clone(), strategy.clone());
        components.register_guard(POLICIES_GUARD, policy_guard);

        components.register_middleware(SANITIZER, InputSanitizer::new());
        components.register_middleware(
            CSRF,
            CsrfProtector::new(&config.csrf.header_name, &config.csrf.cookie_name)
                .with_exempt_methods(&config.csrf.exempt_methods),
        );
        components.register_middleware(RATE_LIMIT, RateLimiter::new(rate_limits.clone()));

        let mut cors = CorsMiddleware::new(config.cors.allowed_origins.clone())
            .with_methods(config.cors.allowed_methods.clone())
            .with_headers(config.cors.allowed_headers.clone())
            .with_credentials(config.cors.allow_credentials);
        if let Some(max_age) = config.cors.max_age_secs {
            cors = cors.with_max_age(max_age);
        }
        components.register_middleware(CORS, cors);

        let mut csp = CspMiddleware::new(&config.csp.policy).report_only(config.csp.report_only);
        if let Some(uri) = &config.csp.report_uri {
            csp = csp.with_report_uri(uri);
        }
        components.register_middleware(CSP, csp);

        if config.audit.enabled {
            components.register_middleware(AUDIT, AuditLogger::new(Arc::new(LogAuditSink)));
        }

        log::info!(
            "Security app ready (auth: {}, guards: {:?}, middlewares: {:?})",
            strategy.name(),
            components.guard_ids(),
            components.middleware_ids()
        );

        Ok(Self {
            pipeline: SecurityPipeline::new(components.clone()),
            config,
            policies,
            sessions,
            tokens,
            rate_limits,
            components,
            routes: RouteTable::new(),
        })
    }

    /// Send audit entries to `sink` instead of the log
    pub fn with_audit_sink(self, sink: Arc<dyn AuditSink>) -> Self {
        self.components.register_middleware(AUDIT, AuditLogger::new(sink));
        self
    }

    /// Append an enhancer to a handler's declaration
    pub fn route(&mut self, controller: &str, method: &str, enhancer: Enhancer) -> &mut Self {
        self.routes.register(controller, method, enhancer);
        self
    }

    /// Run the pipeline declared for `controller`/`method`
    pub async fn handle(
        &self,
        controller: &str,
        method: &str,
        request: &mut SecurityContext,
        handler: &dyn FinalHandler,
    ) -> SecurityResult<PipelineOutcome> {
        self.pipeline.execute_route(&self.routes, controller, method, request, handler).await
    }

    pub fn config(&self) -> &RampartConfig {
        &self.config
    }

    pub fn policies(&self) -> &Arc<PolicyRegistry> {
        &self.policies
    }

    pub fn sessions(&self) -> &Arc<SessionStrategy> {
        &self.sessions
    }

    /// Token strategy, when token auth is enabled
    pub fn tokens(&self) -> Option<&Arc<TokenStrategy>> {
        self.tokens.as_ref()
    }

    pub fn rate_limits(&self) -> &Arc<RateLimitStore> {
        &self.rate_limits
    }

    /// Registry for application-specific guards and middlewares
    pub fn components(&self) -> &Arc<ComponentRegistry> {
        &self.components
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn pipeline(&self) -> &SecurityPipeline {
        &self.pipeline
    }
}
