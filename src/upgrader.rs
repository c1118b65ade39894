//! Auto-upgrade of legacy (v1/v2) graph config payloads to canonical v3.
//!
//! v3 payloads are parsed and validated directly. v2 payloads are converted
//! field-by-field into v3 shape. v1 payloads are first reinterpreted as v2
//! (see [`crate::legacy::migrate_graph_config`]) and carry an extra warning
//! noting the double hop. Every structural gap the source payload leaves —
//! a missing node id, a dangling entrypoint, a condition with no matching
//! state key — is patched with a documented default and recorded as a
//! [`MigrationWarning`] rather than silently dropped.

use std::collections::{BTreeMap, BTreeSet};

use miette::Diagnostic;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::canonicalize::canonicalize_graph_config;
use crate::ir::{GraphConfig, SCHEMA_VERSION};
use crate::legacy::{
    create_react_config, migrate_graph_config, LegacyCondition, LegacyConditionType,
    LegacyGraphConfig, LegacyGraphEdgeConfig, LegacyGraphNodeConfig, LegacyNodeType,
};
use crate::parser::parse_graph_config;
use crate::validate::ensure_valid_graph_config;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationWarningCode {
    UnknownVersionTreatedAsV1,
    UpgradedV1ToV2,
    MissingNodeIdDefaulted,
    MultipleStartTargetsPickFirst,
    InvalidEntrypointFallback,
    MissingEntrypointFallback,
    EdgeFromEndDropped,
    EdgeToStartDropped,
    EdgeSourceMissingDropped,
    EdgeTargetMissingDropped,
    NoEdgesDefaultedToEnd,
    MissingLlmConfigDefaulted,
    MissingToolConfigDefaulted,
    DefaultGraphFromNull,
}

impl MigrationWarningCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownVersionTreatedAsV1 => "UNKNOWN_VERSION_TREATED_AS_V1",
            Self::UpgradedV1ToV2 => "UPGRADED_V1_TO_V2",
            Self::MissingNodeIdDefaulted => "MISSING_NODE_ID_DEFAULTED",
            Self::MultipleStartTargetsPickFirst => "MULTIPLE_START_TARGETS_PICK_FIRST",
            Self::InvalidEntrypointFallback => "INVALID_ENTRYPOINT_FALLBACK",
            Self::MissingEntrypointFallback => "MISSING_ENTRYPOINT_FALLBACK",
            Self::EdgeFromEndDropped => "EDGE_FROM_END_DROPPED",
            Self::EdgeToStartDropped => "EDGE_TO_START_DROPPED",
            Self::EdgeSourceMissingDropped => "EDGE_SOURCE_MISSING_DROPPED",
            Self::EdgeTargetMissingDropped => "EDGE_TARGET_MISSING_DROPPED",
            Self::NoEdgesDefaultedToEnd => "NO_EDGES_DEFAULTED_TO_END",
            Self::MissingLlmConfigDefaulted => "MISSING_LLM_CONFIG_DEFAULTED",
            Self::MissingToolConfigDefaulted => "MISSING_TOOL_CONFIG_DEFAULTED",
            Self::DefaultGraphFromNull => "DEFAULT_GRAPH_FROM_NULL",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationWarning {
    pub code: MigrationWarningCode,
    pub path: String,
    pub message: String,
}

impl MigrationWarning {
    fn new(code: MigrationWarningCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum MigrationError {
    #[error("{path}: {message}")]
    #[diagnostic(code(flowforge::upgrader::invalid_v3_config))]
    InvalidV3Config { path: String, message: String },

    #[error("{path}: {message}")]
    #[diagnostic(code(flowforge::upgrader::empty_graph))]
    EmptyGraph { path: String, message: String },

    #[error("{path}: {message}")]
    #[diagnostic(code(flowforge::upgrader::invalid_v2_config))]
    InvalidV2Config { path: String, message: String },

    #[error("{path}: {message}")]
    #[diagnostic(code(flowforge::upgrader::invalid_v1_config))]
    InvalidV1Config { path: String, message: String },

    #[error("{path}: {message}")]
    #[diagnostic(code(flowforge::upgrader::invalid_migrated_v3_config))]
    InvalidMigratedV3Config { path: String, message: String },

    #[error("{path}: {message}")]
    #[diagnostic(code(flowforge::upgrader::duplicate_node_id))]
    DuplicateNodeId { path: String, message: String },

    #[error("{path}: {message}")]
    #[diagnostic(code(flowforge::upgrader::missing_transform_config))]
    MissingTransformConfig { path: String, message: String },

    #[error("{path}: {message}")]
    #[diagnostic(code(flowforge::upgrader::missing_component_config))]
    MissingComponentConfig { path: String, message: String },

    #[error("{path}: {message}")]
    #[diagnostic(code(flowforge::upgrader::missing_predicate_state_key))]
    MissingPredicateStateKey { path: String, message: String },
}

#[derive(Clone, Debug)]
pub struct MigrationResult {
    pub source_version: String,
    pub config: GraphConfig,
    pub warnings: Vec<MigrationWarning>,
}

/// Detect a payload's declared version, defaulting to `"1.0"` when absent.
#[must_use]
pub fn detect_graph_config_version(raw: &Value) -> String {
    if let Some(v) = raw.get("schema_version").and_then(Value::as_str) {
        return v.to_string();
    }
    if let Some(v) = raw.get("version") {
        return match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
    }
    "1.0".to_string()
}

fn is_explicit_empty_graph(raw: &Value) -> bool {
    if let Some(Value::Array(nodes)) = raw.get("nodes") {
        if nodes.is_empty() {
            return true;
        }
    }
    if let Some(Value::Object(graph)) = raw.get("graph") {
        if let Some(Value::Array(nodes)) = graph.get("nodes") {
            if nodes.is_empty() {
                return true;
            }
        }
    }
    false
}

/// Upgrade a raw payload of any supported version to canonical, validated v3.
pub fn upgrade_graph_config(raw: &Value) -> Result<MigrationResult, MigrationError> {
    let source_version = detect_graph_config_version(raw);
    let mut warnings = Vec::new();

    if source_version.starts_with("3.") {
        let parsed = parse_graph_config(raw).map_err(|e| MigrationError::InvalidV3Config {
            path: "graph_config".to_string(),
            message: e.to_string(),
        })?;
        let canonical = canonicalize_graph_config(parsed);
        ensure_valid_graph_config(&canonical).map_err(|e| MigrationError::InvalidV3Config {
            path: "graph_config".to_string(),
            message: e.to_string(),
        })?;
        return Ok(MigrationResult {
            source_version,
            config: canonical,
            warnings,
        });
    }

    if is_explicit_empty_graph(raw) {
        return Err(MigrationError::EmptyGraph {
            path: "graph_config.nodes".to_string(),
            message: "Empty graph cannot be auto-migrated.".to_string(),
        });
    }

    let config_v2 = if source_version.starts_with("2.") {
        serde_json::from_value::<LegacyGraphConfig>(raw.clone()).map_err(|e| MigrationError::InvalidV2Config {
            path: "graph_config".to_string(),
            message: e.to_string(),
        })?
    } else {
        if !source_version.starts_with("1.") {
            warnings.push(MigrationWarning::new(
                MigrationWarningCode::UnknownVersionTreatedAsV1,
                "graph_config.version",
                format!("Unknown version '{source_version}' treated as v1 payload."),
            ));
        }
        let migrated = migrate_graph_config(raw).map_err(|e| MigrationError::InvalidV1Config {
            path: "graph_config".to_string(),
            message: e.to_string(),
        })?;
        warnings.push(MigrationWarning::new(
            MigrationWarningCode::UpgradedV1ToV2,
            "graph_config.version",
            "Migrated through legacy v1->v2 transformer before conversion.",
        ));
        migrated
    };

    let config_v3_raw = convert_v2_to_v3_raw(&config_v2, &source_version, &mut warnings)?;

    let parsed_v3 = parse_graph_config(&config_v3_raw).map_err(|e| MigrationError::InvalidMigratedV3Config {
        path: "graph_config".to_string(),
        message: e.to_string(),
    })?;
    let canonical_v3 = canonicalize_graph_config(parsed_v3);
    ensure_valid_graph_config(&canonical_v3).map_err(|e| MigrationError::InvalidMigratedV3Config {
        path: "graph_config".to_string(),
        message: e.to_string(),
    })?;

    Ok(MigrationResult {
        source_version,
        config: canonical_v3,
        warnings,
    })
}

/// Upgrade `raw`, or synthesize and upgrade a default ReAct config when
/// `raw` is absent entirely.
pub fn upgrade_or_create_default_graph_config(
    raw: Option<&Value>,
    agent_prompt: Option<&str>,
) -> Result<MigrationResult, MigrationError> {
    let Some(raw) = raw else {
        let prompt = agent_prompt.unwrap_or("You are a helpful assistant.");
        let default_v2 = serde_json::to_value(create_react_config(prompt)).expect("legacy config serializes infallibly");
        let result = upgrade_graph_config(&default_v2)?;
        let default_warning = MigrationWarning::new(
            MigrationWarningCode::DefaultGraphFromNull,
            "graph_config",
            "graph_config was null; generated default ReAct config before migration.",
        );
        let mut warnings = vec![default_warning];
        warnings.extend(result.warnings);
        return Ok(MigrationResult {
            source_version: "null".to_string(),
            config: result.config,
            warnings,
        });
    };
    upgrade_graph_config(raw)
}

fn convert_v2_to_v3_raw(
    config_v2: &LegacyGraphConfig,
    source_version: &str,
    warnings: &mut Vec<MigrationWarning>,
) -> Result<Value, MigrationError> {
    let mut node_ids: BTreeSet<String> = BTreeSet::new();
    let mut v3_nodes = Vec::new();

    for (index, node) in config_v2.nodes.iter().enumerate() {
        let mut node_id = node.id.clone().unwrap_or_default().trim().to_string();
        if node_id.is_empty() {
            node_id = format!("node_{}", index + 1);
            warnings.push(MigrationWarning::new(
                MigrationWarningCode::MissingNodeIdDefaulted,
                format!("nodes[{index}].id"),
                format!("Node id missing; defaulted to '{node_id}'."),
            ));
        }
        if node_ids.contains(&node_id) {
            return Err(MigrationError::DuplicateNodeId {
                path: format!("nodes[{index}].id"),
                message: format!("Duplicate node id '{node_id}' cannot be auto-migrated."),
            });
        }
        node_ids.insert(node_id.clone());
        v3_nodes.push(convert_v2_node(node, &node_id, index, warnings)?);
    }

    if v3_nodes.is_empty() {
        return Err(MigrationError::EmptyGraph {
            path: "nodes".to_string(),
            message: "v2 graph has no executable nodes after conversion.".to_string(),
        });
    }

    let entrypoints = derive_entrypoints(config_v2, &node_ids, warnings);
    let mut v3_edges = convert_v2_edges(&config_v2.edges, &node_ids, warnings)?;

    if v3_edges.is_empty() {
        warnings.push(MigrationWarning::new(
            MigrationWarningCode::NoEdgesDefaultedToEnd,
            "edges",
            format!("No valid edges after conversion; added '{} -> END'.", entrypoints[0]),
        ));
        v3_edges.push(json!({"from_node": entrypoints[0], "to_node": "END"}));
    }

    let metadata = extract_metadata(config_v2);
    let limits = extract_limits(config_v2);
    let deps = extract_deps(config_v2);
    let ui = build_ui_payload(config_v2, source_version, warnings);

    let key = derive_key(config_v2);
    let revision = derive_revision(config_v2);

    Ok(json!({
        "schema_version": SCHEMA_VERSION,
        "key": key,
        "revision": revision,
        "graph": {
            "nodes": v3_nodes,
            "edges": v3_edges,
            "entrypoints": entrypoints,
        },
        "state": convert_state(config_v2),
        "limits": limits,
        "metadata": metadata,
        "deps": deps,
        "ui": ui,
    }))
}

fn convert_v2_node(
    node: &LegacyGraphNodeConfig,
    node_id: &str,
    index: usize,
    warnings: &mut Vec<MigrationWarning>,
) -> Result<Value, MigrationError> {
    let node_name = node.name.clone().unwrap_or_else(|| node_id.to_string());

    match node.node_type {
        LegacyNodeType::Llm => {
            let config = match &node.llm_config {
                Some(llm) => json!({
                    "prompt_template": llm.prompt_template,
                    "output_key": llm.output_key,
                    "model_override": llm.model_override,
                    "temperature_override": llm.temperature_override,
                    "max_tokens": llm.max_tokens,
                    "tools_enabled": llm.tools_enabled,
                    "tool_filter": llm.tool_filter,
                    "max_iterations": llm.max_iterations,
                    "message_key": llm.message_key,
                }),
                None => {
                    warnings.push(MigrationWarning::new(
                        MigrationWarningCode::MissingLlmConfigDefaulted,
                        format!("nodes[{index}].llm_config"),
                        "LLM node missing llm_config; default runtime values were applied.",
                    ));
                    json!({
                        "prompt_template": "",
                        "output_key": "response",
                        "tools_enabled": true,
                        "max_iterations": 10,
                    })
                }
            };
            let output_key = config["output_key"].as_str().unwrap_or("response").to_string();
            Ok(json!({
                "id": node_id,
                "kind": "llm",
                "name": node_name,
                "description": node.description,
                "reads": ["messages"],
                "writes": ["messages", output_key],
                "config": config,
            }))
        }
        LegacyNodeType::Tool => {
            let config = match &node.tool_config {
                Some(tool) => json!({
                    "execute_all": tool.execute_all,
                    "tool_filter": tool.tool_filter,
                    "output_key": tool.output_key,
                    "timeout_seconds": tool.timeout_seconds,
                }),
                None => {
                    warnings.push(MigrationWarning::new(
                        MigrationWarningCode::MissingToolConfigDefaulted,
                        format!("nodes[{index}].tool_config"),
                        "Tool node missing tool_config; default runtime values were applied.",
                    ));
                    json!({
                        "execute_all": true,
                        "tool_filter": null,
                        "output_key": "tool_results",
                        "timeout_seconds": 60,
                    })
                }
            };
            let output_key = config["output_key"].as_str().unwrap_or("tool_results").to_string();
            Ok(json!({
                "id": node_id,
                "kind": "tool",
                "name": node_name,
                "description": node.description,
                "reads": ["messages"],
                "writes": [output_key],
                "config": config,
            }))
        }
        LegacyNodeType::Transform => {
            let Some(transform) = &node.transform_config else {
                return Err(MigrationError::MissingTransformConfig {
                    path: format!("nodes[{index}].transform_config"),
                    message: "Transform node missing transform_config.".to_string(),
                });
            };
            Ok(json!({
                "id": node_id,
                "kind": "transform",
                "name": node_name,
                "description": node.description,
                "reads": transform.input_keys,
                "writes": [transform.output_key],
                "config": {
                    "template": transform.template,
                    "output_key": transform.output_key,
                    "input_keys": transform.input_keys,
                },
            }))
        }
        LegacyNodeType::Component => {
            let Some(component) = &node.component_config else {
                return Err(MigrationError::MissingComponentConfig {
                    path: format!("nodes[{index}].component_config"),
                    message: "Component node missing component_config.".to_string(),
                });
            };
            Ok(json!({
                "id": node_id,
                "kind": "component",
                "name": node_name,
                "description": node.description,
                "reads": [],
                "writes": [],
                "config": {
                    "component_ref": {
                        "key": component.component_ref.key,
                        "version": component.component_ref.version,
                    },
                    "config_overrides": component.config_overrides,
                },
            }))
        }
    }
}

fn derive_entrypoints(
    config_v2: &LegacyGraphConfig,
    node_ids: &BTreeSet<String>,
    warnings: &mut Vec<MigrationWarning>,
) -> Vec<String> {
    if let Some(entry) = &config_v2.entry_point {
        if node_ids.contains(entry) {
            return vec![entry.clone()];
        }
        warnings.push(MigrationWarning::new(
            MigrationWarningCode::InvalidEntrypointFallback,
            "entry_point",
            format!("entry_point '{entry}' does not exist; deriving entrypoint from edges."),
        ));
    }

    let mut start_targets: Vec<String> = Vec::new();
    for edge in &config_v2.edges {
        if edge.from_node == "START" && node_ids.contains(&edge.to_node) && !start_targets.contains(&edge.to_node) {
            start_targets.push(edge.to_node.clone());
        }
    }

    if !start_targets.is_empty() {
        if start_targets.len() > 1 {
            warnings.push(MigrationWarning::new(
                MigrationWarningCode::MultipleStartTargetsPickFirst,
                "edges",
                format!("Multiple START targets found {start_targets:?}; selected '{}'.", start_targets[0]),
            ));
        }
        return vec![start_targets[0].clone()];
    }

    let default_entrypoint = config_v2.nodes[0].id.clone().unwrap_or_else(|| "node_1".to_string());
    warnings.push(MigrationWarning::new(
        MigrationWarningCode::MissingEntrypointFallback,
        "entry_point",
        format!("No entrypoint found; defaulted to first node '{default_entrypoint}'."),
    ));
    vec![default_entrypoint]
}

fn convert_v2_edges(
    edges: &[LegacyGraphEdgeConfig],
    node_ids: &BTreeSet<String>,
    warnings: &mut Vec<MigrationWarning>,
) -> Result<Vec<Value>, MigrationError> {
    let mut converted = Vec::new();
    for (index, edge) in edges.iter().enumerate() {
        if edge.from_node == "START" {
            continue;
        }
        if edge.from_node == "END" {
            warnings.push(MigrationWarning::new(
                MigrationWarningCode::EdgeFromEndDropped,
                format!("edges[{index}]"),
                "Dropped edge with END as source.",
            ));
            continue;
        }
        if edge.to_node == "START" {
            warnings.push(MigrationWarning::new(
                MigrationWarningCode::EdgeToStartDropped,
                format!("edges[{index}]"),
                "Dropped edge with START as target.",
            ));
            continue;
        }
        if !node_ids.contains(&edge.from_node) {
            warnings.push(MigrationWarning::new(
                MigrationWarningCode::EdgeSourceMissingDropped,
                format!("edges[{index}].from_node"),
                format!("Dropped edge from unknown node '{}'.", edge.from_node),
            ));
            continue;
        }
        if edge.to_node != "END" && !node_ids.contains(&edge.to_node) {
            warnings.push(MigrationWarning::new(
                MigrationWarningCode::EdgeTargetMissingDropped,
                format!("edges[{index}].to_node"),
                format!("Dropped edge to unknown node '{}'.", edge.to_node),
            ));
            continue;
        }

        let when = match &edge.condition {
            None => Value::Null,
            Some(LegacyCondition::Builtin(LegacyConditionType::HasToolCalls)) => json!("has_tool_calls"),
            Some(LegacyCondition::Builtin(LegacyConditionType::NoToolCalls)) => json!("no_tool_calls"),
            Some(LegacyCondition::Custom(custom)) => {
                if custom.state_key.is_empty() {
                    return Err(MigrationError::MissingPredicateStateKey {
                        path: format!("edges[{index}].condition.state_key"),
                        message: "Custom condition state_key is required for predicate migration.".to_string(),
                    });
                }
                json!({
                    "state_path": custom.state_key,
                    "operator": custom.operator,
                    "value": custom.value,
                })
            }
        };

        converted.push(json!({
            "from_node": edge.from_node,
            "to_node": edge.to_node,
            "when": when,
            "priority": edge.priority,
            "label": edge.label,
        }));
    }
    Ok(converted)
}

fn convert_state(config_v2: &LegacyGraphConfig) -> Value {
    let mut schema = Map::new();
    let mut reducers = Map::new();
    for (state_key, field) in &config_v2.custom_state_fields {
        schema.insert(
            state_key.clone(),
            json!({
                "type": field.field_type,
                "description": field.description,
                "default": field.default,
            }),
        );
        reducers.insert(state_key.clone(), serde_json::to_value(field.reducer).unwrap());
    }
    json!({"schema": Value::Object(schema), "reducers": Value::Object(reducers)})
}

fn extract_metadata(config_v2: &LegacyGraphConfig) -> Value {
    let raw = &config_v2.metadata;
    let tags: Vec<String> = raw
        .get("tags")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let mut metadata = Map::new();
    if let Some(v) = raw.get("display_name") {
        metadata.insert("display_name".to_string(), v.clone());
    }
    if let Some(v) = raw.get("description") {
        metadata.insert("description".to_string(), v.clone());
    }
    if !tags.is_empty() {
        metadata.insert("tags".to_string(), json!(tags));
    }
    if let Some(v) = raw.get("agent_version").or_else(|| raw.get("version")) {
        metadata.insert("agent_version".to_string(), v.clone());
    }

    if metadata.is_empty() {
        Value::Null
    } else {
        Value::Object(metadata)
    }
}

fn extract_limits(config_v2: &LegacyGraphConfig) -> Value {
    let raw = &config_v2.metadata;
    let limits_raw = raw.get("limits").and_then(Value::as_object);
    let max_steps = limits_raw.and_then(|l| l.get("max_steps")).and_then(Value::as_u64).unwrap_or(128);
    let max_concurrency = limits_raw.and_then(|l| l.get("max_concurrency")).and_then(Value::as_u64).unwrap_or(10);
    json!({
        "max_time_s": config_v2.max_execution_time_seconds,
        "max_steps": max_steps,
        "max_concurrency": max_concurrency,
    })
}

fn extract_deps(config_v2: &LegacyGraphConfig) -> Value {
    let tools: BTreeSet<String> = config_v2
        .tool_config
        .as_ref()
        .and_then(|t| t.tool_filter.as_ref())
        .map(|filter| filter.iter().filter(|t| !t.is_empty()).cloned().collect())
        .unwrap_or_default();

    let mut model_keys: BTreeSet<String> = BTreeSet::new();
    let mut component_refs: BTreeSet<(String, String)> = BTreeSet::new();
    for node in &config_v2.nodes {
        if let Some(llm) = &node.llm_config {
            if let Some(model) = &llm.model_override {
                model_keys.insert(model.clone());
            }
        }
        if let Some(component) = &node.component_config {
            component_refs.insert((component.component_ref.key.clone(), component.component_ref.version.clone()));
        }
    }

    if model_keys.is_empty() && tools.is_empty() && component_refs.is_empty() {
        return Value::Null;
    }

    json!({
        "models": model_keys.iter().map(|k| json!({"key": k})).collect::<Vec<_>>(),
        "tools": tools.iter().collect::<Vec<_>>(),
        "prompts": Vec::<Value>::new(),
        "components": component_refs.iter().map(|(k, v)| json!({"key": k, "version": v})).collect::<Vec<_>>(),
    })
}

fn build_ui_payload(config_v2: &LegacyGraphConfig, source_version: &str, warnings: &[MigrationWarning]) -> Value {
    let mut positions = Map::new();
    for node in &config_v2.nodes {
        let Some(id) = &node.id else { continue };
        if let Some(pos) = node.position.as_ref().and_then(Value::as_object) {
            if let (Some(x), Some(y)) = (pos.get("x").and_then(Value::as_f64), pos.get("y").and_then(Value::as_f64)) {
                positions.insert(id.clone(), json!({"x": x, "y": y}));
            }
        }
    }

    let warning_codes: Vec<&str> = warnings.iter().map(|w| w.code.as_str()).collect();
    let mut ui = Map::new();
    ui.insert(
        "migration".to_string(),
        json!({"from_version": source_version, "warning_codes": warning_codes}),
    );
    if !positions.is_empty() {
        ui.insert("positions".to_string(), Value::Object(positions));
    }
    Value::Object(ui)
}

fn derive_key(config_v2: &LegacyGraphConfig) -> String {
    let raw = &config_v2.metadata;
    for field in ["key", "builtin_key", "system_agent_key", "display_name", "pattern"] {
        if let Some(s) = raw.get(field).and_then(Value::as_str) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    "migrated_graph".to_string()
}

fn derive_revision(config_v2: &LegacyGraphConfig) -> u32 {
    config_v2
        .metadata
        .get("revision")
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|&v| v >= 1)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_version_from_schema_version_field() {
        assert_eq!(detect_graph_config_version(&json!({"schema_version": "3.0"})), "3.0");
        assert_eq!(detect_graph_config_version(&json!({"version": "2.0"})), "2.0");
        assert_eq!(detect_graph_config_version(&json!({})), "1.0");
    }

    #[test]
    fn upgrades_v2_react_style_config() {
        let raw = serde_json::to_value(create_react_config("be helpful")).unwrap();
        let result = upgrade_graph_config(&raw).unwrap();
        assert_eq!(result.source_version, "1.0");
        assert!(result.warnings.iter().any(|w| w.code == MigrationWarningCode::UpgradedV1ToV2));
        assert_eq!(result.config.graph.entrypoints, vec!["agent".to_string()]);
    }

    #[test]
    fn default_graph_synthesized_when_raw_is_none() {
        let result = upgrade_or_create_default_graph_config(None, Some("be nice")).unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == MigrationWarningCode::DefaultGraphFromNull));
    }

    #[test]
    fn explicit_empty_graph_is_rejected() {
        let raw = json!({"nodes": []});
        let err = upgrade_graph_config(&raw).unwrap_err();
        assert!(matches!(err, MigrationError::EmptyGraph { .. }));
    }

    #[test]
    fn v3_payload_passes_through_parse_and_validate() {
        let raw = json!({
            "schema_version": "3.0",
            "key": "demo",
            "graph": {
                "nodes": [{
                    "id": "n1", "name": "n1", "kind": "transform",
                    "config": {"template": "x", "output_key": "out"},
                }],
                "edges": [{"from_node": "n1", "to_node": "END"}],
                "entrypoints": ["n1"],
            },
        });
        let result = upgrade_graph_config(&raw).unwrap();
        assert_eq!(result.source_version, "3.0");
        assert!(result.warnings.is_empty());
    }
}
