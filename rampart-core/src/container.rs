//! Instance resolution
//!
//! Enhancers name guards and middlewares by identifier; an
//! [`InstanceResolver`] turns those identifiers into instances. Dependency
//! injection proper lives outside this crate; [`ComponentRegistry`] is the
//! plain in-memory resolver used when wiring by hand.

use crate::guard::Guard;
use crate::middleware::SecurityMiddleware;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Lookup-by-identifier collaborator supplying guard and middleware instances
pub trait InstanceResolver: Send + Sync {
    fn resolve_guard(&self, id: &str) -> Option<Arc<dyn Guard>>;

    fn resolve_middleware(&self, id: &str) -> Option<Arc<dyn SecurityMiddleware>>;
}

/// In-memory resolver
#[derive(Default)]
pub struct ComponentRegistry {
    guards: RwLock<HashMap<String, Arc<dyn Guard>>>,
    middlewares: RwLock<HashMap<String, Arc<dyn SecurityMiddleware>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_guard<G: Guard + 'static>(&self, id: impl Into<String>, guard: G) {
        self.register_guard_arc(id, Arc::new(guard));
    }

    pub fn register_guard_arc(&self, id: impl Into<String>, guard: Arc<dyn Guard>) {
        self.guards.write().unwrap_or_else(PoisonError::into_inner).insert(id.into(), guard);
    }

    pub fn register_middleware<M: SecurityMiddleware + 'static>(
        &self,
        id: impl Into<String>,
        middleware: M,
    ) {
        self.register_middleware_arc(id, Arc::new(middleware));
    }

    pub fn register_middleware_arc(
        &self,
        id: impl Into<String>,
        middleware: Arc<dyn SecurityMiddleware>,
    ) {
        self.middlewares
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), middleware);
    }

    /// Registered guard ids, sorted
    pub fn guard_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> =
            self.guards.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Registered middleware ids, sorted
    pub fn middleware_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .middlewares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl InstanceResolver for ComponentRegistry {
    fn resolve_guard(&self, id: &str) -> Option<Arc<dyn Guard>> {
        self.guards.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }

    fn resolve_middleware(&self, id: &str) -> Option<Arc<dyn SecurityMiddleware>> {
        self.middlewares.read().unwrap_or_else(PoisonError::into_inner).get(id).cloned()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("guards", &self.guard_ids())
            .field("middlewares", &self.middleware_ids())
            .finish()
    }
}
