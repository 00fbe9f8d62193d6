//! Named, pluggable authorization rules
//!
//! A [`Policy`] is evaluated against the request principal by the policy
//! guard. Policies live in a [`PolicyRegistry`] owned by the application and
//! shared by reference with the guards that need it.

use crate::guard::RequestContext;
use crate::principal::Principal;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Authorization rule evaluated against a principal
#[async_trait]
pub trait Policy: Send + Sync {
    /// Registry key for this policy
    fn name(&self) -> &str;

    /// Decide whether the principal satisfies the rule
    async fn evaluate(&self, principal: &Principal, context: Option<&RequestContext>) -> bool;
}

type PolicyCheck = dyn Fn(&Principal, Option<&RequestContext>) -> bool + Send + Sync;

/// Policy backed by a synchronous closure
pub struct PolicyFn {
    name: String,
    check: Box<PolicyCheck>,
}

impl PolicyFn {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Principal, Option<&RequestContext>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }
}

impl std::fmt::Debug for PolicyFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyFn").field("name", &self.name).finish()
    }
}

#[async_trait]
impl Policy for PolicyFn {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, principal: &Principal, context: Option<&RequestContext>) -> bool {
        (self.check)(principal, context)
    }
}

/// Allows when a principal metadata entry equals an expected value
///
/// e.g. `MetadataPolicy::new("pro-plan", "plan", json!("pro"))`
#[derive(Debug, Clone)]
pub struct MetadataPolicy {
    name: String,
    key: String,
    expected: serde_json::Value,
}

impl MetadataPolicy {
    pub fn new(
        name: impl Into<String>,
        key: impl Into<String>,
        expected: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            expected,
        }
    }
}

#[async_trait]
impl Policy for MetadataPolicy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, principal: &Principal, _context: Option<&RequestContext>) -> bool {
        principal.metadata_value(&self.key) == Some(&self.expected)
    }
}

/// Allows when the principal itself declares the policy name
#[derive(Debug, Clone)]
pub struct DeclaredPolicy {
    name: String,
}

impl DeclaredPolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Policy for DeclaredPolicy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, principal: &Principal, _context: Option<&RequestContext>) -> bool {
        principal.declares_policy(&self.name)
    }
}

/// Name -> policy table
///
/// Mutated only through [`PolicyRegistry::register`]; a second registration
/// under the same name replaces the first.
#[derive(Default)]
pub struct PolicyRegistry {
    policies: RwLock<HashMap<String, Arc<dyn Policy>>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a policy under its own name (last write wins)
    pub fn register<P: Policy + 'static>(&self, policy: P) {
        self.register_arc(Arc::new(policy));
    }

    pub fn register_arc(&self, policy: Arc<dyn Policy>) {
        let name = policy.name().to_string();
        let previous = self
            .policies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), policy);
        if previous.is_some() {
            log::info!("Policy '{}' replaced", name);
        } else {
            log::debug!("Policy '{}' registered", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Policy>> {
        self.policies.read().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.policies.read().unwrap_or_else(PoisonError::into_inner).contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.policies.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.policies.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRegistry").field("policies", &self.names()).finish()
    }
}
