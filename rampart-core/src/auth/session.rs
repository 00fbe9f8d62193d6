//! In-memory session authentication
//!
//! Sessions are stored in a thread-safe `HashMap` behind an `RwLock` and are
//! lost on restart. Expired entries are evicted lazily when looked up; there
//! is no background sweep.

use super::AuthStrategy;
use crate::principal::Principal;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct SessionEntry {
    principal: Principal,
    expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Session table keyed by opaque session id
#[derive(Debug)]
pub struct SessionStrategy {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStrategy {
    /// Create a session table whose entries live for `ttl`
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
        }
    }

    /// Store a principal under a fresh session id using the default TTL
    pub fn create(&self, principal: Principal) -> String {
        self.create_with_ttl(principal, self.ttl)
    }

    /// Store a principal under a fresh session id with an explicit TTL
    pub fn create_with_ttl(&self, principal: Principal, ttl: Duration) -> String {
        let id = format!("sess_{}", Uuid::new_v4());
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let entry = SessionEntry {
            principal,
            expires_at,
        };
        log::debug!("Session created: {} for {}", id, entry.principal.id);
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), entry);
        id
    }

    /// Return the principal of a live session, evicting it if it has expired
    pub fn lookup(&self, session_id: &str) -> Option<Principal> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
            match sessions.get(session_id) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => return Some(entry.principal.clone()),
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.get(session_id).is_some_and(|e| e.is_expired(now)) {
            sessions.remove(session_id);
            log::debug!("Session expired and evicted: {}", session_id);
        }
        None
    }

    /// Remove a session; returns whether it existed
    pub fn destroy(&self, session_id: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .is_some()
    }

    /// Number of stored sessions, expired ones included until looked up
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuthStrategy for SessionStrategy {
    fn authenticate(&self, credential: &str) -> Option<Principal> {
        self.lookup(credential)
    }

    fn name(&self) -> &str {
        "session"
    }
}
