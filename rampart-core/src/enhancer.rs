//! Per-handler enhancer metadata
//!
//! Route registration produces an ordered list of enhancers per handler;
//! evaluation order is declaration order. The [`RouteTable`] is filled
//! explicitly at application-wiring time, keyed by `(controller, method)`.

use crate::guard::GuardOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One declarative enhancement of a handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Enhancer {
    /// Run the guard registered under `guard_id`
    Guard {
        guard_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<GuardOptions>,
    },
    /// Wrap the handler with the listed middlewares, outermost first
    Security { middleware_ids: Vec<String> },
}

impl Enhancer {
    pub fn guard(guard_id: impl Into<String>, options: Option<GuardOptions>) -> Self {
        Enhancer::Guard {
            guard_id: guard_id.into(),
            options,
        }
    }

    pub fn security<I, S>(middleware_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Enhancer::Security {
            middleware_ids: middleware_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_guard(&self) -> bool {
        matches!(self, Enhancer::Guard { .. })
    }
}

/// Middleware ids of every security enhancer, flattened in declaration order
pub fn middleware_ids(enhancers: &[Enhancer]) -> Vec<&str> {
    enhancers
        .iter()
        .filter_map(|e| match e {
            Enhancer::Security { middleware_ids } => {
                Some(middleware_ids.iter().map(String::as_str))
            }
            Enhancer::Guard { .. } => None,
        })
        .flatten()
        .collect()
}

/// Ordered enhancer lists keyed by `(controller, method)`
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<(String, String), Vec<Enhancer>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an enhancer to a handler's list
    pub fn register(
        &mut self,
        controller: impl Into<String>,
        method: impl Into<String>,
        enhancer: Enhancer,
    ) -> &mut Self {
        self.routes.entry((controller.into(), method.into())).or_default().push(enhancer);
        self
    }

    /// Enhancers of a handler; empty when the handler was never registered
    pub fn enhancers(&self, controller: &str, method: &str) -> &[Enhancer] {
        self.routes
            .get(&(controller.to_string(), method.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Registered `(controller, method)` pairs, sorted
    pub fn routes(&self) -> Vec<(&str, &str)> {
        let mut routes: Vec<(&str, &str)> =
            self.routes.keys().map(|(c, m)| (c.as_str(), m.as_str())).collect();
        routes.sort();
        routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order_is_kept() {
        let mut table = RouteTable::new();
        table
            .register("Orders", "create", Enhancer::guard("auth", None))
            .register("Orders", "create", Enhancer::security(["audit", "csrf"]))
            .register("Orders", "create", Enhancer::guard("roles", None));

        let enhancers = table.enhancers("Orders", "create");
        assert_eq!(enhancers.len(), 3);
        assert!(enhancers[0].is_guard());
        assert!(!enhancers[1].is_guard());
        assert_eq!(table.routes(), vec![("Orders", "create")]);
    }

    #[test]
    fn test_unknown_route_has_no_enhancers() {
        assert!(RouteTable::new().enhancers("Nope", "none").is_empty());
    }

    #[test]
    fn test_middleware_ids_flattened_in_order() {
        let enhancers = vec![
            Enhancer::security(["audit"]),
            Enhancer::guard("auth", None),
            Enhancer::security(["csrf", "rate_limit"]),
        ];
        assert_eq!(
            middleware_ids(&enhancers),
            vec!["audit", "csrf", "rate_limit"]
        );
    }

    #[test]
    fn test_tagged_serde_form() {
        let json = r#"[
            {"kind":"guard","guard_id":"roles","options":{"roles":["admin"]}},
            {"kind":"security","middleware_ids":["audit"]}
        ]"#;
        let enhancers: Vec<Enhancer> = serde_json::from_str(json).unwrap();
        assert_eq!(
            enhancers,
            vec![
                Enhancer::guard("roles", Some(GuardOptions::new().with_roles(["admin"]))),
                Enhancer::security(["audit"]),
            ]
        );
    }
}
