//! The pre-v3 graph config shapes the [`crate::upgrader`] accepts.
//!
//! Schema v2 is the stable legacy shape: a flat node/edge list instead of
//! the nested `graph` envelope, bare `type` discriminators instead of
//! `kind`, and a `custom_state_fields` map instead of a `state` contract.
//! Schema v1 predates even that; it is assumed structurally compatible with
//! v2 (same field names, looser requirements) and is migrated by direct
//! reinterpretation rather than a distinct type — see
//! [`migrate_graph_config`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ir::{PredicateOperator, ReducerKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyNodeType {
    Llm,
    Tool,
    Transform,
    Component,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyConditionType {
    HasToolCalls,
    NoToolCalls,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyCustomCondition {
    pub state_key: String,
    pub operator: PredicateOperator,
    #[serde(default)]
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyCondition {
    Builtin(LegacyConditionType),
    Custom(LegacyCustomCondition),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyLlmConfig {
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

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyToolConfig {
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
pub struct LegacyTransformConfig {
    pub template: String,
    pub output_key: String,
    #[serde(default)]
    pub input_keys: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyComponentRef {
    pub key: String,
    #[serde(default = "default_version_wildcard")]
    pub version: String,
}

fn default_version_wildcard() -> String {
    "*".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyComponentConfig {
    pub component_ref: LegacyComponentRef,
    #[serde(default)]
    pub config_overrides: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyGraphNodeConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub node_type: LegacyNodeType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub position: Option<Value>,
    #[serde(default)]
    pub llm_config: Option<LegacyLlmConfig>,
    #[serde(default)]
    pub tool_config: Option<LegacyToolConfig>,
    #[serde(default)]
    pub transform_config: Option<LegacyTransformConfig>,
    #[serde(default)]
    pub component_config: Option<LegacyComponentConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyGraphEdgeConfig {
    pub from_node: String,
    pub to_node: String,
    #[serde(default)]
    pub condition: Option<LegacyCondition>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyStateField {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Value,
    pub reducer: ReducerKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyToolDependency {
    #[serde(default)]
    pub tool_filter: Option<Vec<String>>,
}

fn default_max_execution_time_seconds() -> u32 {
    300
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyGraphConfig {
    #[serde(default)]
    pub nodes: Vec<LegacyGraphNodeConfig>,
    #[serde(default)]
    pub edges: Vec<LegacyGraphEdgeConfig>,
    #[serde(default)]
    pub entry_point: Option<String>,
    #[serde(default)]
    pub custom_state_fields: BTreeMap<String, LegacyStateField>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default = "default_max_execution_time_seconds")]
    pub max_execution_time_seconds: u32,
    #[serde(default)]
    pub tool_config: Option<LegacyToolDependency>,
    #[serde(default)]
    pub prompt_config: Option<Value>,
}

impl Default for LegacyGraphConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            entry_point: None,
            custom_state_fields: BTreeMap::new(),
            metadata: Map::new(),
            max_execution_time_seconds: default_max_execution_time_seconds(),
            tool_config: None,
            prompt_config: None,
        }
    }
}

/// Build the default ReAct-pattern v2 config: an LLM node that loops into a
/// tool node until it stops producing tool calls.
#[must_use]
pub fn create_react_config(prompt: &str) -> LegacyGraphConfig {
    let agent = LegacyGraphNodeConfig {
        id: Some("agent".to_string()),
        node_type: LegacyNodeType::Llm,
        name: Some("agent".to_string()),
        description: Some("Reasons over the conversation and decides whether to call a tool.".to_string()),
        position: None,
        llm_config: Some(LegacyLlmConfig {
            prompt_template: prompt.to_string(),
            tools_enabled: true,
            ..LegacyLlmConfig::default()
        }),
        tool_config: None,
        transform_config: None,
        component_config: None,
    };
    let tools = LegacyGraphNodeConfig {
        id: Some("tools".to_string()),
        node_type: LegacyNodeType::Tool,
        name: Some("tools".to_string()),
        description: Some("Executes the tool calls requested by the agent node.".to_string()),
        position: None,
        llm_config: None,
        tool_config: Some(LegacyToolConfig::default()),
        transform_config: None,
        component_config: None,
    };

    let agent_to_tools = LegacyGraphEdgeConfig {
        from_node: "agent".to_string(),
        to_node: "tools".to_string(),
        condition: Some(LegacyCondition::Builtin(LegacyConditionType::HasToolCalls)),
        priority: 0,
        label: None,
    };
    let tools_to_agent = LegacyGraphEdgeConfig {
        from_node: "tools".to_string(),
        to_node: "agent".to_string(),
        condition: None,
        priority: 0,
        label: None,
    };
    let agent_to_end = LegacyGraphEdgeConfig {
        from_node: "agent".to_string(),
        to_node: "END".to_string(),
        condition: Some(LegacyCondition::Builtin(LegacyConditionType::NoToolCalls)),
        priority: 1,
        label: None,
    };

    let mut metadata = Map::new();
    metadata.insert("builtin_key".to_string(), Value::String("react".to_string()));
    metadata.insert("display_name".to_string(), Value::String("ReAct Agent".to_string()));

    LegacyGraphConfig {
        nodes: vec![agent, tools],
        edges: vec![agent_to_tools, tools_to_agent, agent_to_end],
        entry_point: Some("agent".to_string()),
        metadata,
        ..LegacyGraphConfig::default()
    }
}

/// Reinterpret a v1 payload as v2. v1 predates the `schema_version` field
/// and predates strict validation, but shares every field name and shape
/// with v2 — no structural translation is needed, only permissive parsing.
pub fn migrate_graph_config(raw: &Value) -> Result<LegacyGraphConfig, serde_json::Error> {
    serde_json::from_value(raw.clone())
}
