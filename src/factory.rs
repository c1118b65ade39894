//! Agent Factory: the entry point chat sessions use to go from "an agent
//! record, maybe" to a running graph.
//!
//! Resolution order mirrors the service this is grounded in: a stored
//! [`AgentRecord`] with a `graph_config` is always the source of truth for
//! that agent, even after a caller-supplied system prompt is layered in —
//! only when there's no agent at all (or no config stored on it) does this
//! fall back to the builtin [`crate::builtin::react_config`]. Builtin
//! provenance (the `ui.builtin_key` field) is read for analytics/labeling
//! only; it never replaces a stored config.

use std::sync::Arc;

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::builtin::{self, DeepResearchOptions};
use crate::compiler::{CompileError, CompiledGraph, CompilerDeps, GraphCompiler};
use crate::registry::ComponentRegistry;
use crate::upgrader::{upgrade_graph_config, MigrationError};

/// The default agent used when a session has no agent config of its own.
pub const DEFAULT_BUILTIN_AGENT: &str = "react";

/// The builtin agent keys [`resolve_agent_config`] recognizes as provenance
/// when a stored config declares `ui.builtin_key`.
fn builtin_keys() -> [&'static str; 2] {
    ["react", "deep_research"]
}

/// A minimal stand-in for the persisted agent row this factory reads from.
/// Only the fields the resolution and labeling logic actually touch.
#[derive(Clone, Debug, Default)]
pub struct AgentRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub graph_config: Option<Value>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum FactoryError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),
}

/// The result of building an agent: its compiled graph plus the analytics
/// label callers use to tag events (`"react"`, `"deep_research"`, or
/// `"graph"` for a fully custom config).
pub struct AgentBuild {
    pub compiled: CompiledGraph,
    pub agent_type_key: String,
}

fn merge_layered_prompt(base_prompt: &str, node_prompt: Option<&str>) -> String {
    let base = base_prompt.trim();
    let node = node_prompt.map(str::trim).unwrap_or("");
    match (base.is_empty(), node.is_empty()) {
        (false, false) => format!("{base}\n\n<NODE_PROMPT>\n{node}\n</NODE_PROMPT>"),
        (false, true) => base.to_string(),
        _ => node.to_string(),
    }
}

/// Inject `system_prompt` into every `llm` node's `prompt_template` and
/// every `component` node's `config_overrides.system_prompt`, preserving
/// any prompt already on that node inside a `<NODE_PROMPT>` block.
///
/// Operates on raw JSON (not a parsed [`crate::ir::GraphConfig`]) so it can
/// run before the canonical-v3 check: a legacy payload gets the same
/// treatment once [`crate::upgrader`] lifts it to v3 shape, so injection
/// always happens on the canonical `graph.nodes[].kind`/`config` shape.
#[must_use]
pub fn inject_system_prompt(config: &Value, system_prompt: &str) -> Value {
    let mut config = config.clone();
    let Some(nodes) = config
        .get_mut("graph")
        .and_then(|g| g.get_mut("nodes"))
        .and_then(Value::as_array_mut)
    else {
        return config;
    };

    for node in nodes.iter_mut() {
        let Some(node_obj) = node.as_object_mut() else { continue };
        let kind = node_obj.get("kind").and_then(Value::as_str).map(str::to_string);
        match kind.as_deref() {
            Some("component") => {
                let cfg = node_obj.entry("config").or_insert_with(|| Value::Object(Default::default()));
                let Some(cfg_obj) = cfg.as_object_mut() else { continue };
                let overrides = cfg_obj
                    .entry("config_overrides")
                    .or_insert_with(|| Value::Object(Default::default()));
                let Some(overrides_obj) = overrides.as_object_mut() else { continue };
                let existing = overrides_obj.get("system_prompt").and_then(Value::as_str).map(str::to_string);
                let merged = merge_layered_prompt(system_prompt, existing.as_deref());
                overrides_obj.insert("system_prompt".to_string(), Value::String(merged));
            }
            Some("llm") => {
                let cfg = node_obj.entry("config").or_insert_with(|| Value::Object(Default::default()));
                let Some(cfg_obj) = cfg.as_object_mut() else { continue };
                let existing = cfg_obj.get("prompt_template").and_then(Value::as_str).map(str::to_string);
                let merged = merge_layered_prompt(system_prompt, existing.as_deref());
                cfg_obj.insert("prompt_template".to_string(), Value::String(merged));
            }
            _ => {}
        }
    }

    config
}

/// Resolve which raw graph config JSON to build, and the analytics label
/// for it. Returns `(raw_config, agent_type_key)`.
#[must_use]
pub fn resolve_agent_config(agent: Option<&AgentRecord>, system_prompt: &str) -> (Value, String) {
    if let Some(agent) = agent {
        if let Some(raw_config) = &agent.graph_config {
            let known = builtin_keys();
            let mut candidates: Vec<String> = Vec::new();
            if let Some(key) = raw_config.get("key").and_then(Value::as_str) {
                let trimmed = key.trim();
                if !trimmed.is_empty() {
                    candidates.push(trimmed.to_string());
                }
            }
            if let Some(ui_key) = raw_config.get("ui").and_then(|ui| ui.get("builtin_key")).and_then(Value::as_str) {
                let trimmed = ui_key.trim();
                if !trimmed.is_empty() {
                    candidates.push(trimmed.to_string());
                }
            }
            let agent_type_key = candidates
                .into_iter()
                .find(|candidate| known.contains(&candidate.as_str()))
                .unwrap_or_else(|| "graph".to_string());

            let raw_config = if system_prompt.is_empty() {
                raw_config.clone()
            } else {
                inject_system_prompt(raw_config, system_prompt)
            };
            return (raw_config, agent_type_key);
        }
    }

    let default_config = builtin::react_config();
    let raw_config = serde_json::to_value(&default_config).expect("GraphConfig serializes infallibly");
    let raw_config = if system_prompt.is_empty() {
        raw_config
    } else {
        inject_system_prompt(&raw_config, system_prompt)
    };
    (raw_config, DEFAULT_BUILTIN_AGENT.to_string())
}

/// Resolve, upgrade, validate, and compile an agent in one call — the
/// unified path every agent (builtin or stored) goes through.
pub async fn build_chat_agent(
    agent: Option<&AgentRecord>,
    system_prompt: &str,
    deps: CompilerDeps,
) -> Result<AgentBuild, FactoryError> {
    let (raw_config, agent_type_key) = resolve_agent_config(agent, system_prompt);
    let migrated = upgrade_graph_config(&raw_config)?;
    let compiler = GraphCompiler::new(deps);
    let compiled = compiler.compile(migrated.config).await?;
    Ok(AgentBuild { compiled, agent_type_key })
}

/// Build an agent directly from a builtin key, bypassing agent-record
/// resolution entirely. Returns `None` for an unknown key.
pub async fn build_builtin_agent(
    builtin_key: &str,
    system_prompt: &str,
    deps: CompilerDeps,
) -> Option<Result<AgentBuild, FactoryError>> {
    let config = match builtin_key {
        "react" => builtin::react_config(),
        "deep_research" => builtin::deep_research_config(DeepResearchOptions::default()),
        _ => return None,
    };
    let raw_config = serde_json::to_value(&config).expect("GraphConfig serializes infallibly");
    let raw_config = if system_prompt.is_empty() {
        raw_config
    } else {
        inject_system_prompt(&raw_config, system_prompt)
    };

    Some(async move {
        let migrated = upgrade_graph_config(&raw_config)?;
        let compiler = GraphCompiler::new(deps);
        let compiled = compiler.compile(migrated.config).await?;
        Ok(AgentBuild {
            compiled,
            agent_type_key: builtin_key.to_string(),
        })
    }.await)
}

/// Build a [`ComponentRegistry`] seeded with every builtin component,
/// suitable for passing into [`CompilerDeps::components`].
#[must_use]
pub fn default_component_registry() -> Arc<ComponentRegistry> {
    let mut registry = ComponentRegistry::new();
    builtin::ensure_registered(&mut registry);
    Arc::new(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{ModelProvider, ModelRequest, ModelResponse, ToolExecutor};
    use crate::node::NodeError;
    use async_trait::async_trait;
    use serde_json::json;

    struct NoopProvider;
    #[async_trait]
    impl ModelProvider for NoopProvider {
        async fn generate(&self, _request: ModelRequest) -> Result<ModelResponse, NodeError> {
            Ok(ModelResponse::default())
        }
    }

    struct NoopExecutor;
    #[async_trait]
    impl ToolExecutor for NoopExecutor {
        async fn call(&self, _name: &str, _arguments: Value) -> Result<Value, NodeError> {
            Ok(Value::Null)
        }
        fn available_tools(&self) -> Vec<String> {
            vec![]
        }
    }

    fn deps() -> CompilerDeps {
        CompilerDeps {
            model_provider: Arc::new(NoopProvider),
            tool_executor: Arc::new(NoopExecutor),
            components: default_component_registry(),
        }
    }

    #[test]
    fn falls_back_to_react_when_no_agent_is_given() {
        let (raw, key) = resolve_agent_config(None, "");
        assert_eq!(key, "react");
        assert_eq!(raw["key"], json!("react"));
    }

    #[test]
    fn stored_graph_config_is_the_source_of_truth() {
        let agent = AgentRecord {
            id: Some("a1".to_string()),
            name: Some("Custom".to_string()),
            graph_config: Some(json!({
                "schema_version": "3.0",
                "key": "my-custom-agent",
                "graph": {
                    "nodes": [{
                        "id": "n1", "name": "n1", "kind": "transform",
                        "config": {"template": "hi", "output_key": "out"},
                    }],
                    "edges": [{"from_node": "n1", "to_node": "END"}],
                    "entrypoints": ["n1"],
                },
            })),
        };
        let (raw, key) = resolve_agent_config(Some(&agent), "");
        assert_eq!(key, "graph");
        assert_eq!(raw["key"], json!("my-custom-agent"));
    }

    #[test]
    fn ui_builtin_key_is_used_for_labeling_not_replacement() {
        let agent = AgentRecord {
            id: None,
            name: None,
            graph_config: Some(json!({
                "schema_version": "3.0",
                "key": "forked-react",
                "ui": {"builtin_key": "react"},
                "graph": {
                    "nodes": [{
                        "id": "n1", "name": "n1", "kind": "transform",
                        "config": {"template": "hi", "output_key": "out"},
                    }],
                    "edges": [{"from_node": "n1", "to_node": "END"}],
                    "entrypoints": ["n1"],
                },
            })),
        };
        let (raw, key) = resolve_agent_config(Some(&agent), "");
        assert_eq!(key, "react");
        assert_eq!(raw["key"], json!("forked-react"));
    }

    #[test]
    fn system_prompt_injects_into_every_llm_and_component_node_without_dropping_node_prompt() {
        let config = json!({
            "graph": {
                "nodes": [
                    {"id": "a", "kind": "llm", "config": {"prompt_template": "be terse"}},
                    {"id": "b", "kind": "component", "config": {"component_ref": {"key": "k", "version": "*"}}},
                ],
            },
        });
        let injected = inject_system_prompt(&config, "You are Zeta.");
        let nodes = injected["graph"]["nodes"].as_array().unwrap();
        let a_prompt = nodes[0]["config"]["prompt_template"].as_str().unwrap();
        assert!(a_prompt.contains("You are Zeta."));
        assert!(a_prompt.contains("<NODE_PROMPT>"));
        assert!(a_prompt.contains("be terse"));
        let b_prompt = nodes[1]["config"]["config_overrides"]["system_prompt"].as_str().unwrap();
        assert_eq!(b_prompt, "You are Zeta.");
    }

    #[tokio::test]
    async fn builds_the_default_react_agent_end_to_end() {
        let build = build_chat_agent(None, "Be helpful.", deps()).await.unwrap();
        assert_eq!(build.agent_type_key, "react");
        assert!(build.compiled.nodes.contains_key("agent"));
        assert!(build.compiled.nodes.contains_key("tools"));
    }

    #[tokio::test]
    async fn builds_deep_research_directly_from_its_builtin_key() {
        let build = build_builtin_agent("deep_research", "", deps()).await.unwrap().unwrap();
        assert_eq!(build.agent_type_key, "deep_research");
        assert_eq!(build.compiled.node_component_keys().len(), 4);
    }

    #[tokio::test]
    async fn unknown_builtin_key_returns_none() {
        assert!(build_builtin_agent("nonexistent", "", deps()).await.is_none());
    }
}
