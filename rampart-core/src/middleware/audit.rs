//! Audit logging middleware
//!
//! Times the rest of the chain and records one [`AuditEntry`] per request.
//! A failure downstream is recorded and then re-raised.

use super::{Flow, Next, SecurityContext, SecurityMiddleware};
use crate::error::SecurityResult;
use crate::principal::Principal;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Log target audit entries are written to
pub const AUDIT_TARGET: &str = "rampart::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Blocked,
    Failure,
}

/// One audited request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    pub status: AuditStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Destination for audit entries
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Writes entries as JSON on the `rampart::audit` log target
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, entry: &AuditEntry) {
        match serde_json::to_string(entry) {
            Ok(json) => match entry.status {
                AuditStatus::Failure => log::warn!(target: AUDIT_TARGET, "{}", json),
                _ => log::info!(target: AUDIT_TARGET, "{}", json),
            },
            Err(e) => {
                log::error!("Failed to serialize audit entry {}: {}", entry.request_id, e)
            }
        }
    }
}

/// Keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: &AuditEntry) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).push(entry.clone());
    }
}

#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(Arc::new(LogAuditSink))
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger").finish_non_exhaustive()
    }
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    fn entry(ctx: &SecurityContext, started: Instant, status: AuditStatus) -> AuditEntry {
        let metadata = ctx
            .metadata
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        AuditEntry {
            request_id: ctx.request_id.clone(),
            method: ctx.method.clone(),
            path: ctx.path.clone(),
            latency_ms: started.elapsed().as_millis() as u64,
            principal: ctx.principal.clone(),
            status,
            timestamp: Utc::now(),
            metadata,
        }
    }
}

#[async_trait]
impl SecurityMiddleware for AuditLogger {
    fn name(&self) -> &str {
        "AuditLogger"
    }

    async fn handle(&self, ctx: &mut SecurityContext, next: Next<'_>) -> SecurityResult<()> {
        let started = Instant::now();
        match next.run(ctx).await {
            Ok(Flow::Completed) => {
                self.sink.record(&Self::entry(ctx, started, AuditStatus::Success));
                Ok(())
            }
            Ok(Flow::Blocked { reason }) => {
                let mut entry = Self::entry(ctx, started, AuditStatus::Blocked);
                entry.metadata.insert("reason".into(), reason.into());
                self.sink.record(&entry);
                Ok(())
            }
            Err(e) => {
                let mut entry = Self::entry(ctx, started, AuditStatus::Failure);
                entry.metadata.insert("error".into(), e.to_string().into());
                entry.metadata.insert("code".into(), e.code().into());
                self.sink.record(&entry);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SecurityError;
    use crate::middleware::{ChainResult, SecurityChain};

    struct Blocker;

    #[async_trait]
    impl SecurityMiddleware for Blocker {
        fn name(&self) -> &str {
            "Blocker"
        }

        async fn handle(&self, _ctx: &mut SecurityContext, _next: Next<'_>) -> SecurityResult<()> {
            Ok(())
        }
    }

    fn audited(
        extra: Option<Arc<dyn SecurityMiddleware>>,
    ) -> (Vec<Arc<dyn SecurityMiddleware>>, Arc<MemoryAuditSink>) {
        let sink = Arc::new(MemoryAuditSink::new());
        let mut chain: Vec<Arc<dyn SecurityMiddleware>> =
            vec![Arc::new(AuditLogger::new(sink.clone()))];
        chain.extend(extra);
        (chain, sink)
    }

    #[tokio::test]
    async fn test_success_entry() {
        let (chain, sink) = audited(None);
        let principal = Principal::new("u1", ["admin"]);
        let mut ctx = SecurityContext::new("GET", "/reports")
            .with_request_id("req-42")
            .with_principal(principal.clone());
        let handler = |ctx: &mut SecurityContext| -> SecurityResult<()> {
            ctx.metadata.extra.insert("rows".into(), 3.into());
            Ok(())
        };

        SecurityChain::run(&chain, &mut ctx, &handler).await.unwrap();

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.request_id, "req-42");
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.path, "/reports");
        assert_eq!(entry.status, AuditStatus::Success);
        assert_eq!(entry.principal.as_ref(), Some(&principal));
        assert_eq!(entry.metadata["rows"], 3);
    }

    #[tokio::test]
    async fn test_failure_recorded_then_reraised() {
        let (chain, sink) = audited(None);
        let mut ctx = SecurityContext::new("POST", "/orders");
        let handler = |_ctx: &mut SecurityContext| -> SecurityResult<()> {
            Err(SecurityError::Handler("db down".into()))
        };

        let err = SecurityChain::run(&chain, &mut ctx, &handler).await.unwrap_err();
        assert!(matches!(err, SecurityError::Handler(_)));

        let entry = &sink.entries()[0];
        assert_eq!(entry.status, AuditStatus::Failure);
        assert_eq!(entry.metadata["error"], "Handler failed: db down");
        assert_eq!(entry.metadata["code"], "handler_failed");
    }

    #[tokio::test]
    async fn test_downstream_block_recorded() {
        let (chain, sink) = audited(Some(Arc::new(Blocker)));
        let mut ctx = SecurityContext::new("GET", "/");
        let handler = |_ctx: &mut SecurityContext| -> SecurityResult<()> { Ok(()) };

        let result = SecurityChain::run(&chain, &mut ctx, &handler).await.unwrap();
        assert_eq!(
            result,
            ChainResult {
                blocked: true,
                reason: Some("Blocker blocked request".into()),
            }
        );

        let entry = &sink.entries()[0];
        assert_eq!(entry.status, AuditStatus::Blocked);
        assert_eq!(entry.metadata["reason"], "Blocker blocked request");
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let ctx = SecurityContext::new("GET", "/x").with_request_id("r1");
        let entry = AuditLogger::entry(&ctx, Instant::now(), AuditStatus::Success);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["requestId"], "r1");
        assert_eq!(json["status"], "success");
        assert!(json.get("latencyMs").is_some());
        assert!(json.get("principal").is_none());
    }
}
