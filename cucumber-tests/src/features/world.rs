use cucumber::World as CucumberWorld;
use rampart_core::middleware::{ChainResult, RateDecision, RateLimitStore, SecurityMiddleware};
use rampart_core::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const CONTROLLER: &str = "Scenario";
pub const METHOD: &str = "handle";
pub const SECRET: &str = "bdd-secret";

/// State shared by the steps of one scenario
#[derive(CucumberWorld)]
#[world(init = Self::new)]
pub struct SecurityWorld {
    pub app: SecurityApp,
    pub request: SecurityContext,
    pub handler_calls: Arc<AtomicUsize>,
    pub outcome: Option<SecurityResult<PipelineOutcome>>,

    /// Ad-hoc middleware chain and what it recorded
    pub chain: Vec<Arc<dyn SecurityMiddleware>>,
    pub trace: Arc<Mutex<Vec<String>>>,
    pub chain_result: Option<SecurityResult<ChainResult>>,

    pub sanitized: Option<String>,

    pub store: Option<RateLimitStore>,
    pub clock: Instant,
    pub decisions: Vec<RateDecision>,
}

impl std::fmt::Debug for SecurityWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityWorld")
            .field("app", &self.app)
            .field("request", &self.request)
            .field("outcome", &self.outcome)
            .field("chain_len", &self.chain.len())
            .field("chain_result", &self.chain_result)
            .field("decisions", &self.decisions)
            .finish()
    }
}

impl SecurityWorld {
    fn new() -> Self {
        let mut config = RampartConfig::default();
        config.token.enabled = true;
        config.token.secret = SECRET.to_string();
        let app = SecurityApp::from_config(config).expect("scenario config is valid");

        Self {
            app,
            request: SecurityContext::new("POST", "/scenario"),
            handler_calls: Arc::new(AtomicUsize::new(0)),
            outcome: None,
            chain: Vec::new(),
            trace: Arc::new(Mutex::new(Vec::new())),
            chain_result: None,
            sanitized: None,
            store: None,
            clock: Instant::now(),
            decisions: Vec::new(),
        }
    }

    pub fn tokens(&self) -> &TokenStrategy {
        self.app.tokens().expect("token auth is enabled in scenarios")
    }

    pub fn handler_ran(&self) -> bool {
        self.handler_calls.load(Ordering::SeqCst) > 0
    }

    /// Run the scenario route through the app with a counting handler
    pub async fn handle_request(&mut self) {
        let calls = self.handler_calls.clone();
        let handler = move |_ctx: &mut SecurityContext| -> SecurityResult<()> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let outcome = self.app.handle(CONTROLLER, METHOD, &mut self.request, &handler).await;
        self.outcome = Some(outcome);
    }

    pub fn advance(&mut self, ms: u64) {
        self.clock += Duration::from_millis(ms);
    }
}
