//! The canonical v3 graph intermediate representation.
//!
//! This is the closed-world schema a [`crate::parser`] accepts directly and a
//! [`crate::upgrader`] produces from legacy payloads. Every struct here
//! mirrors one Pydantic model from the service this engine was distilled
//! from, field for field, so upgrade/canonicalize/validate can reason about
//! the same shape regardless of where a [`GraphConfig`] came from.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SCHEMA_VERSION: &str = "3.0";

/// The four executable node kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphNodeKind {
    Llm,
    Tool,
    Transform,
    Component,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFieldType {
    String,
    Int,
    Float,
    Bool,
    List,
    Dict,
    Any,
}

/// The closed vocabulary of reducer strategies a state contract may bind a
/// field to. See [`crate::reducers`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReducerKind {
    Replace,
    AddMessages,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinEdgeCondition {
    HasToolCalls,
    NoToolCalls,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredicateOperator {
    Eq,
    Neq,
    Truthy,
    Falsy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateFieldSchema {
    #[serde(rename = "type")]
    pub field_type: StateFieldType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Value,
}

/// The graph's state contract: the fields it declares, and which reducer
/// strategy merges writes to each at a barrier.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateContract {
    #[serde(rename = "schema", default)]
    pub state_schema: BTreeMap<String, StateFieldSchema>,
    #[serde(default)]
    pub reducers: BTreeMap<String, ReducerKind>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct Limits {
    pub max_time_s: u32,
    pub max_steps: u32,
    pub max_concurrency: u32,
}

fn default_max_time_s() -> u32 {
    300
}
fn default_max_steps() -> u32 {
    128
}
fn default_max_concurrency() -> u32 {
    10
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_time_s: default_max_time_s(),
            max_steps: default_max_steps(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDependencyRef {
    pub key: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptDependencyRef {
    pub key: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentDependencyRef {
    pub key: String,
    #[serde(default = "default_version_wildcard")]
    pub version: String,
}

fn default_version_wildcard() -> String {
    "*".to_string()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deps {
    #[serde(default)]
    pub models: Vec<ModelDependencyRef>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub prompts: Vec<PromptDependencyRef>,
    #[serde(default)]
    pub components: Vec<ComponentDependencyRef>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub agent_version: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmNodeConfig {
    #[serde(default)]
    pub prompt_template: String,
    #[serde(default = "default_response_key")]
    pub output_key: String,
    #[serde(default)]
    pub model_override: Option<String>,
    #[serde(default)]
    pub temperature_override: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_true")]
    pub tools_enabled: bool,
    #[serde(default)]
    pub tool_filter: Option<Vec<String>>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub message_key: Option<String>,
}

fn default_response_key() -> String {
    "response".to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_iterations() -> u32 {
    10
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolNodeConfig {
    #[serde(default = "default_true")]
    pub execute_all: bool,
    #[serde(default)]
    pub tool_filter: Option<Vec<String>>,
    #[serde(default = "default_tool_results_key")]
    pub output_key: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
}

fn default_tool_results_key() -> String {
    "tool_results".to_string()
}
fn default_timeout_seconds() -> u32 {
    60
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformNodeConfig {
    pub template: String,
    pub output_key: String,
    #[serde(default)]
    pub input_keys: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentReference {
    pub key: String,
    #[serde(default = "default_version_wildcard")]
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentNodeConfig {
    pub component_ref: ComponentReference,
    #[serde(default)]
    pub config_overrides: BTreeMap<String, Value>,
}

/// The per-kind node configuration, tagged on `kind` with its payload
/// flattened alongside the common [`Node`] fields (`id`, `name`, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "config", rename_all = "snake_case")]
pub enum NodeKind {
    Llm(LlmNodeConfig),
    Tool(ToolNodeConfig),
    Transform(TransformNodeConfig),
    Component(ComponentNodeConfig),
}

impl NodeKind {
    #[must_use]
    pub fn as_graph_node_kind(&self) -> GraphNodeKind {
        match self {
            NodeKind::Llm(_) => GraphNodeKind::Llm,
            NodeKind::Tool(_) => GraphNodeKind::Tool,
            NodeKind::Transform(_) => GraphNodeKind::Transform,
            NodeKind::Component(_) => GraphNodeKind::Component,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reads: Vec<String>,
    #[serde(default)]
    pub writes: Vec<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EdgePredicate {
    pub state_path: String,
    pub operator: PredicateOperator,
    #[serde(default)]
    pub value: Value,
}

/// Either a built-in routing condition or a custom state predicate.
/// Distinguished at parse time by JSON shape: a bare string is `Builtin`,
/// an object is `Custom`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeWhen {
    Builtin(BuiltinEdgeCondition),
    Custom(EdgePredicate),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Edge {
    pub from_node: String,
    pub to_node: String,
    #[serde(default)]
    pub when: Option<EdgeWhen>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphIr {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub entrypoints: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    pub schema_version: String,
    pub key: String,
    #[serde(default = "default_revision")]
    pub revision: u32,
    pub graph: GraphIr,
    #[serde(default)]
    pub state: StateContract,
    #[serde(default)]
    pub deps: Option<Deps>,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub ui: Option<Value>,
}

fn default_revision() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_kind_flattens_alongside_common_fields() {
        let raw = json!({
            "id": "n1",
            "name": "respond",
            "reads": ["messages"],
            "writes": ["response"],
            "kind": "llm",
            "config": {"output_key": "response"},
        });
        let node: Node = serde_json::from_value(raw).unwrap();
        assert_eq!(node.id, "n1");
        match node.kind {
            NodeKind::Llm(cfg) => assert_eq!(cfg.output_key, "response"),
            other => panic!("expected Llm, got {other:?}"),
        }
    }

    #[test]
    fn edge_when_resolves_builtin_string_and_custom_object() {
        let builtin: EdgeWhen = serde_json::from_value(json!("has_tool_calls")).unwrap();
        assert_eq!(builtin, EdgeWhen::Builtin(BuiltinEdgeCondition::HasToolCalls));

        let custom: EdgeWhen = serde_json::from_value(json!({
            "state_path": "extra.retries",
            "operator": "truthy",
        }))
        .unwrap();
        match custom {
            EdgeWhen::Custom(pred) => assert_eq!(pred.state_path, "extra.retries"),
            other => panic!("expected Custom, got {other:?}"),
        }
    }

    #[test]
    fn graph_config_rejects_unknown_top_level_fields() {
        let raw = json!({
            "schema_version": "3.0",
            "key": "demo",
            "graph": {"nodes": [], "edges": [], "entrypoints": []},
            "unexpected": true,
        });
        let err = serde_json::from_value::<GraphConfig>(raw).unwrap_err();
        assert!(err.to_string().contains("unexpected"));
    }

    #[test]
    fn limits_default_to_documented_constants() {
        let limits = Limits::default();
        assert_eq!(limits.max_time_s, 300);
        assert_eq!(limits.max_steps, 128);
        assert_eq!(limits.max_concurrency, 10);
    }

    #[test]
    fn graph_config_minimal_roundtrips() {
        let raw = json!({
            "schema_version": "3.0",
            "key": "demo",
            "graph": {
                "nodes": [],
                "edges": [],
                "entrypoints": ["n1"],
            },
        });
        let cfg: GraphConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(cfg.revision, 1);
        assert_eq!(cfg.limits.max_steps, 128);
        let back = serde_json::to_value(&cfg).unwrap();
        let reparsed: GraphConfig = serde_json::from_value(back).unwrap();
        assert_eq!(cfg, reparsed);
    }
}
