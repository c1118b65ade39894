//! The component registry: a versioned library of reusable subgraphs that
//! `component` nodes reference by key and SemVer constraint.
//!
//! Components are registered once at startup (see [`ComponentRegistry::register`])
//! and resolved at compile time by [`crate::compiler`]. A component builds an
//! `Arc<dyn Node>` given its node's `config_overrides`, the tools available to
//! it (filtered by `required_capabilities`), and a model factory — mirroring
//! the original `ExecutableComponent.build_graph` contract, minus the
//! LangGraph-specific return type.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use semver::{Version, VersionReq};
use serde_json::Value;
use thiserror::Error;

use crate::node::{Node, NodeError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Subgraph,
}

#[derive(Clone, Debug)]
pub struct ComponentMetadata {
    pub key: String,
    pub name: String,
    pub description: String,
    pub component_type: ComponentType,
    pub version: Version,
    pub author: String,
    pub tags: Vec<String>,
    pub required_tools: Vec<String>,
    pub required_components: Vec<String>,
    pub required_capabilities: Vec<String>,
}

impl Default for ComponentType {
    fn default() -> Self {
        Self::Subgraph
    }
}

/// A registered, reusable agent subgraph.
#[async_trait]
pub trait Component: Send + Sync {
    fn metadata(&self) -> &ComponentMetadata;

    /// Validate `config_overrides` against this component's own contract.
    /// The base contract (used unless a component overrides it) accepts any
    /// object and rejects anything else.
    fn validate_config_overrides(&self, config_overrides: &BTreeMap<String, Value>) -> Result<(), ComponentError> {
        let _ = config_overrides;
        Ok(())
    }

    /// Build the executable node for this component, given validated
    /// `config_overrides` and the tools it declared it needs.
    async fn build(
        &self,
        config_overrides: &BTreeMap<String, Value>,
        available_tools: &[String],
    ) -> Result<Arc<dyn Node>, ComponentError>;
}

#[derive(Debug, Error, Diagnostic)]
pub enum ComponentError {
    #[error("component '{key}' not found")]
    #[diagnostic(code(flowforge::registry::not_found))]
    NotFound { key: String },

    #[error("component '{key}' has no version satisfying '{constraint}' (have: {available:?})")]
    #[diagnostic(code(flowforge::registry::no_matching_version))]
    NoMatchingVersion {
        key: String,
        constraint: String,
        available: Vec<String>,
    },

    #[error("invalid config_overrides for component '{key}': {message}")]
    #[diagnostic(code(flowforge::registry::invalid_overrides))]
    InvalidOverrides { key: String, message: String },

    #[error("component '{key}' failed to build: {message}")]
    #[diagnostic(code(flowforge::registry::build_failed))]
    BuildFailed { key: String, message: String },
}

impl From<ComponentError> for NodeError {
    fn from(err: ComponentError) -> Self {
        NodeError::Provider {
            provider: "component_registry",
            message: err.to_string(),
        }
    }
}

type VersionedEntry = (Version, Arc<dyn Component>);

/// Holds every registered component, keyed by component key, each with one
/// or more registered versions.
#[derive(Default, Clone)]
pub struct ComponentRegistry {
    by_key: FxHashMap<String, Vec<VersionedEntry>>,
}

impl ComponentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component under its own `metadata().key`/`version`.
    pub fn register(&mut self, component: Arc<dyn Component>) {
        let meta = component.metadata();
        self.by_key
            .entry(meta.key.clone())
            .or_default()
            .push((meta.version.clone(), component));
    }

    /// Resolve the highest registered version of `key` satisfying `constraint`
    /// (a SemVer requirement string, e.g. `"^2.0"` or `"*"`).
    pub fn resolve(&self, key: &str, constraint: &str) -> Result<Arc<dyn Component>, ComponentError> {
        let entries = self.by_key.get(key).ok_or_else(|| ComponentError::NotFound { key: key.to_string() })?;
        let req = VersionReq::parse(constraint).map_err(|e| ComponentError::InvalidOverrides {
            key: key.to_string(),
            message: format!("invalid version constraint '{constraint}': {e}"),
        })?;

        entries
            .iter()
            .filter(|(version, _)| req.matches(version))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, component)| Arc::clone(component))
            .ok_or_else(|| ComponentError::NoMatchingVersion {
                key: key.to_string(),
                constraint: constraint.to_string(),
                available: entries.iter().map(|(v, _)| v.to_string()).collect(),
            })
    }

    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.by_key.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeContext, NodePartial};
    use crate::state::StateSnapshot;

    struct EchoComponent {
        meta: ComponentMetadata,
    }

    struct EchoNode;

    #[async_trait]
    impl Node for EchoNode {
        async fn run(&self, _snapshot: StateSnapshot, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
            Ok(NodePartial::new())
        }
    }

    #[async_trait]
    impl Component for EchoComponent {
        fn metadata(&self) -> &ComponentMetadata {
            &self.meta
        }

        async fn build(&self, _overrides: &BTreeMap<String, Value>, _tools: &[String]) -> Result<Arc<dyn Node>, ComponentError> {
            Ok(Arc::new(EchoNode))
        }
    }

    fn echo(version: &str) -> Arc<EchoComponent> {
        Arc::new(EchoComponent {
            meta: ComponentMetadata {
                key: "echo".to_string(),
                name: "Echo".to_string(),
                description: "test component".to_string(),
                component_type: ComponentType::Subgraph,
                version: Version::parse(version).unwrap(),
                author: "test".to_string(),
                tags: vec![],
                required_tools: vec![],
                required_components: vec![],
                required_capabilities: vec![],
            },
        })
    }

    #[test]
    fn resolves_highest_matching_version() {
        let mut registry = ComponentRegistry::new();
        registry.register(echo("1.0.0"));
        registry.register(echo("2.1.0"));
        let resolved = registry.resolve("echo", "^2.0").unwrap();
        assert_eq!(resolved.metadata().version, Version::parse("2.1.0").unwrap());
    }

    #[test]
    fn wildcard_resolves_to_highest_version() {
        let mut registry = ComponentRegistry::new();
        registry.register(echo("1.0.0"));
        registry.register(echo("1.5.0"));
        let resolved = registry.resolve("echo", "*").unwrap();
        assert_eq!(resolved.metadata().version, Version::parse("1.5.0").unwrap());
    }

    #[test]
    fn missing_component_errors() {
        let registry = ComponentRegistry::new();
        let err = registry.resolve("missing", "*").unwrap_err();
        assert!(matches!(err, ComponentError::NotFound { .. }));
    }

    #[test]
    fn unsatisfiable_constraint_errors() {
        let mut registry = ComponentRegistry::new();
        registry.register(echo("1.0.0"));
        let err = registry.resolve("echo", "^2.0").unwrap_err();
        assert!(matches!(err, ComponentError::NoMatchingVersion { .. }));
    }
}
