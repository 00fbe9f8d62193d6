//! Authenticated identity attached to a request

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Authenticated identity with its roles, declared policies and free-form metadata
///
/// The field names double as the token payload layout, so a token body such as
/// `{"id":"u1","roles":["admin"],"metadata":{"plan":"pro"}}` decodes directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    /// Identity key (user id, session owner, external code)
    pub id: String,

    /// Role names
    #[serde(default)]
    pub roles: BTreeSet<String>,

    /// Policy names the identity declares it satisfies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<BTreeSet<String>>,

    /// Provider-specific metadata (subscription plan, tenant, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Principal {
    /// Create a principal with the given roles and nothing else
    pub fn new<I, S>(id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            policies: None,
            metadata: None,
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.get_or_insert_with(HashMap::new).insert(key.into(), value);
        self
    }

    /// Declare a policy name on the principal
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policies.get_or_insert_with(BTreeSet::new).insert(policy.into());
        self
    }

    /// Check if the principal carries a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Any-match role check
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|r| self.has_role(r.as_ref()))
    }

    /// Check if the principal declares a policy name
    pub fn declares_policy(&self, policy: &str) -> bool {
        self.policies.as_ref().is_some_and(|p| p.contains(policy))
    }

    /// Look up a metadata value
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_any_role_match() {
        let principal = Principal::new("alice", ["admin", "user"]);
        assert!(principal.has_role("admin"));
        assert!(principal.has_any_role(&["auditor", "user"]));
        assert!(!principal.has_any_role(&["auditor"]));
        assert!(!principal.has_any_role::<&str>(&[]));
    }

    #[test]
    fn test_decodes_minimal_payload() {
        let principal: Principal = serde_json::from_value(json!({"id": "u1"})).unwrap();
        assert_eq!(principal.id, "u1");
        assert!(principal.roles.is_empty());
        assert!(principal.policies.is_none());
        assert!(principal.metadata.is_none());
    }

    #[test]
    fn test_metadata_and_policies() {
        let principal = Principal::new("bob", ["user"])
            .with_metadata("plan", json!("pro"))
            .with_policy("beta-access");
        assert_eq!(principal.metadata_value("plan"), Some(&json!("pro")));
        assert!(principal.declares_policy("beta-access"));
        assert!(!principal.declares_policy("billing"));
    }
}
