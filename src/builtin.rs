//! Built-in agent configs and the components they depend on.
//!
//! Two agents ship with the engine: [`react_config`], a minimal
//! reason-then-act loop, and [`deep_research_config`], a multi-phase
//! research pipeline built from `component` nodes. [`ensure_registered`]
//! seeds a [`ComponentRegistry`] with the `deep_research:*` components those
//! nodes resolve against; it's idempotent so callers can invoke it on every
//! startup without double-registering.
//!
//! The research components here are deliberately light: the original
//! service drives them with an LLM-backed planner per phase, but that
//! behavior lives behind the same [`Component`] seam regardless of what's
//! underneath it, so a deterministic stand-in exercises the registry,
//! versioning, and `config_overrides` machinery without requiring a model
//! provider to be wired up just to construct a builtin graph.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use semver::Version;
use serde_json::{json, Value};

use crate::ir::GraphConfig;
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::parser::parse_graph_config;
use crate::registry::{Component, ComponentError, ComponentMetadata, ComponentRegistry, ComponentType};
use crate::state::StateSnapshot;

/// The default agent: an `llm` node that loops through a `tool` node while
/// it keeps emitting tool calls, and exits once it stops.
#[must_use]
pub fn react_config() -> GraphConfig {
    parse_graph_config(&json!({
        "schema_version": "3.0",
        "key": "react",
        "revision": 1,
        "graph": {
            "entrypoints": ["agent"],
            "nodes": [
                {
                    "id": "agent",
                    "name": "Agent",
                    "kind": "llm",
                    "description": "Reasons over the conversation and decides whether to call a tool",
                    "reads": ["messages"],
                    "writes": ["messages", "response"],
                    "config": {
                        "prompt_template": "You are a helpful assistant.",
                        "output_key": "response",
                        "tools_enabled": true,
                    },
                },
                {
                    "id": "tools",
                    "name": "Tools",
                    "kind": "tool",
                    "description": "Executes every tool call the agent requested",
                    "reads": ["messages"],
                    "writes": ["messages", "tool_results"],
                    "config": {
                        "execute_all": true,
                    },
                },
            ],
            "edges": [
                {"from_node": "agent", "to_node": "tools", "when": "has_tool_calls"},
                {"from_node": "agent", "to_node": "END", "when": "no_tool_calls"},
                {"from_node": "tools", "to_node": "agent"},
            ],
        },
        "state": {"schema": {}, "reducers": {}},
        "limits": {"max_time_s": 300, "max_steps": 128, "max_concurrency": 10},
        "metadata": {
            "display_name": "ReAct Agent",
            "description": "Default agent with reasoning and tool-calling capability",
            "tags": ["reasoning", "tools", "react"],
            "agent_version": "2.0.0",
        },
        "ui": {
            "icon": "brain",
            "author": "Xyzen",
            "pattern": "react",
            "builtin_key": "react",
            "publishable": false,
        },
    }))
    .expect("builtin react config is a fixed, known-valid literal")
}

/// Tuning knobs [`deep_research_config`] exposes, mirroring the keyword
/// arguments the original builtin factory accepted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeepResearchOptions {
    /// Whether the graph opens with a `clarify` gate before researching.
    pub allow_clarification: bool,
    pub max_iterations: u32,
    pub max_concurrent_units: u32,
}

impl Default for DeepResearchOptions {
    fn default() -> Self {
        Self {
            allow_clarification: true,
            max_iterations: 24,
            max_concurrent_units: 12,
        }
    }
}

/// A four-phase research agent: an optional `clarify` gate, then
/// `brief` -> `supervisor` -> `final_report`, each a `component` node
/// resolved against the `deep_research:*` keys [`ensure_registered`] seeds.
#[must_use]
pub fn deep_research_config(opts: DeepResearchOptions) -> GraphConfig {
    let entrypoint = if opts.allow_clarification { "clarify" } else { "brief" };

    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    if opts.allow_clarification {
        nodes.push(json!({
            "id": "clarify",
            "name": "Clarify with User",
            "kind": "component",
            "description": "Analyze query and determine if clarification is needed",
            "reads": ["messages"],
            "writes": ["messages", "need_clarification", "skip_research"],
            "config": {
                "component_ref": {"key": "deep_research:clarify", "version": "^2.0"},
            },
        }));
        edges.extend([
            json!({
                "from_node": "clarify",
                "to_node": "END",
                "when": {"state_path": "need_clarification", "operator": "truthy"},
                "label": "Ask clarifying question",
                "priority": 2,
            }),
            json!({
                "from_node": "clarify",
                "to_node": "END",
                "when": {"state_path": "skip_research", "operator": "truthy"},
                "label": "Handle follow-up directly",
                "priority": 1,
            }),
            json!({
                "from_node": "clarify",
                "to_node": "brief",
                "when": {"state_path": "need_clarification", "operator": "falsy"},
                "label": "Proceed to research",
                "priority": 0,
            }),
        ]);
    }

    nodes.extend([
        json!({
            "id": "brief",
            "name": "Write Research Brief",
            "kind": "component",
            "description": "Transform user messages into structured research brief",
            "reads": ["messages"],
            "writes": ["research_brief"],
            "config": {"component_ref": {"key": "deep_research:brief", "version": "^2.0"}},
        }),
        json!({
            "id": "supervisor",
            "name": "Research Supervisor",
            "kind": "component",
            "description": "Coordinate research by delegating to sub-researchers",
            "reads": ["messages", "research_brief", "notes"],
            "writes": ["notes"],
            "config": {
                "component_ref": {"key": "deep_research:supervisor", "version": "^2.0"},
                "config_overrides": {
                    "max_iterations": opts.max_iterations,
                    "max_concurrent_units": opts.max_concurrent_units,
                },
            },
        }),
        json!({
            "id": "final_report",
            "name": "Final Report",
            "kind": "component",
            "description": "Synthesize research findings into comprehensive report",
            "reads": ["messages", "research_brief", "notes"],
            "writes": ["messages", "final_report"],
            "config": {"component_ref": {"key": "deep_research:final_report", "version": "^2.0"}},
        }),
    ]);

    edges.push(json!({"from_node": "brief", "to_node": "supervisor"}));
    edges.push(json!({"from_node": "supervisor", "to_node": "final_report"}));
    edges.push(json!({"from_node": "final_report", "to_node": "END"}));

    parse_graph_config(&json!({
        "schema_version": "3.0",
        "key": "deep_research",
        "revision": 1,
        "graph": {
            "entrypoints": [entrypoint],
            "nodes": nodes,
            "edges": edges,
        },
        "state": {
            "schema": {
                "research_brief": {
                    "type": "string",
                    "default": "",
                    "description": "Generated research brief that guides the research",
                },
                "notes": {
                    "type": "list",
                    "default": [],
                    "description": "Collected research notes from supervisor",
                },
                "final_report": {
                    "type": "string",
                    "default": "",
                    "description": "Final synthesized research report",
                },
                "need_clarification": {
                    "type": "bool",
                    "default": false,
                    "description": "Whether user clarification is needed",
                },
                "skip_research": {
                    "type": "bool",
                    "default": false,
                    "description": "Whether to skip research for follow-up requests",
                },
            },
            "reducers": {"notes": "replace"},
        },
        "deps": {
            "models": [],
            "tools": [],
            "prompts": [],
            "components": [
                {"key": "deep_research:brief", "version": "^2.0"},
                {"key": "deep_research:clarify", "version": "^2.0"},
                {"key": "deep_research:final_report", "version": "^2.0"},
                {"key": "deep_research:supervisor", "version": "^2.0"},
            ],
        },
        "limits": {
            "max_time_s": 600,
            "max_steps": 256,
            "max_concurrency": opts.max_concurrent_units,
        },
        "metadata": {
            "display_name": "Deep Research",
            "description": "Multi-phase deep research workflow",
            "tags": ["research", "multi-phase", "components"],
            "agent_version": "3.0.0",
        },
        "ui": {
            "icon": "microscope",
            "author": "Xyzen",
            "pattern": "multi-phase-research",
            "builtin_key": "deep_research",
            "publishable": true,
            "config": {
                "allow_clarification": opts.allow_clarification,
                "max_iterations": opts.max_iterations,
                "max_concurrent_units": opts.max_concurrent_units,
            },
        },
    }))
    .expect("builtin deep_research config is assembled from known-valid literals")
}

fn last_user_text(snapshot: &StateSnapshot) -> Option<&str> {
    snapshot
        .messages
        .iter()
        .rev()
        .find(|m| m.has_role(Message::USER))
        .map(|m| m.content.as_str())
}

fn extra_of(key: &str, value: Value) -> FxHashMap<String, Value> {
    let mut extra = FxHashMap::default();
    extra.insert(key.to_string(), value);
    extra
}

/// Decides whether the latest user turn carries enough detail to research,
/// or whether the agent should ask a clarifying question first.
struct ClarifyNode;

#[async_trait]
impl Node for ClarifyNode {
    async fn run(&self, snapshot: StateSnapshot, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let Some(text) = last_user_text(&snapshot) else {
            return Err(NodeError::MissingInput { what: "a user message to clarify" });
        };
        let word_count = text.split_whitespace().count();
        let need_clarification = word_count < 3;

        let mut extra = FxHashMap::default();
        extra.insert("need_clarification".to_string(), Value::Bool(need_clarification));
        extra.insert("skip_research".to_string(), Value::Bool(false));

        let mut partial = NodePartial::new().with_extra(extra);
        if need_clarification {
            partial = partial.with_messages(vec![Message::assistant(
                "Could you say a bit more about what you'd like researched?",
            )]);
        }
        Ok(partial)
    }
}

/// Condenses the conversation into a single research brief.
struct BriefNode;

#[async_trait]
impl Node for BriefNode {
    async fn run(&self, snapshot: StateSnapshot, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let Some(text) = last_user_text(&snapshot) else {
            return Err(NodeError::MissingInput { what: "a user message to brief" });
        };
        let brief = format!("Research brief: {text}");
        Ok(NodePartial::new().with_extra(extra_of("research_brief", Value::String(brief))))
    }
}

/// Delegates the brief to a bounded number of research units and collects
/// their notes. `max_iterations`/`max_concurrent_units` are accepted as
/// `config_overrides` but this stand-in runs a single pass.
struct SupervisorNode {
    max_iterations: u32,
    max_concurrent_units: u32,
}

#[async_trait]
impl Node for SupervisorNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let brief = snapshot
            .extra
            .get("research_brief")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let note = json!({
            "step": ctx.step,
            "summary": format!("Investigated: {brief}"),
            "max_iterations": self.max_iterations,
            "max_concurrent_units": self.max_concurrent_units,
        });
        Ok(NodePartial::new().with_extra(extra_of("notes", Value::Array(vec![note]))))
    }
}

/// Synthesizes collected notes into a final report message.
struct FinalReportNode;

#[async_trait]
impl Node for FinalReportNode {
    async fn run(&self, snapshot: StateSnapshot, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let note_count = snapshot.extra.get("notes").and_then(Value::as_array).map_or(0, Vec::len);
        let brief = snapshot
            .extra
            .get("research_brief")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let report = format!("{brief}\n\nSynthesized from {note_count} research note(s).");
        Ok(NodePartial::new()
            .with_messages(vec![Message::assistant(&report)])
            .with_extra(extra_of("final_report", Value::String(report))))
    }
}

macro_rules! deep_research_component {
    ($name:ident, $key:literal, $display:literal, $description:literal) => {
        struct $name {
            meta: ComponentMetadata,
        }

        impl $name {
            fn new() -> Self {
                Self {
                    meta: ComponentMetadata {
                        key: $key.to_string(),
                        name: $display.to_string(),
                        description: $description.to_string(),
                        component_type: ComponentType::Subgraph,
                        version: Version::new(2, 0, 0),
                        author: "Xyzen".to_string(),
                        tags: vec!["deep_research".to_string()],
                        required_tools: vec![],
                        required_components: vec![],
                        required_capabilities: vec![],
                    },
                }
            }
        }
    };
}

deep_research_component!(
    ClarifyComponent,
    "deep_research:clarify",
    "Clarify with User",
    "Analyze query and determine if clarification is needed"
);
deep_research_component!(
    BriefComponent,
    "deep_research:brief",
    "Write Research Brief",
    "Transform user messages into a structured research brief"
);
deep_research_component!(
    SupervisorComponent,
    "deep_research:supervisor",
    "Research Supervisor",
    "Coordinate research by delegating to sub-researchers"
);
deep_research_component!(
    FinalReportComponent,
    "deep_research:final_report",
    "Final Report",
    "Synthesize research findings into a comprehensive report"
);

#[async_trait]
impl Component for ClarifyComponent {
    fn metadata(&self) -> &ComponentMetadata {
        &self.meta
    }

    async fn build(&self, _overrides: &BTreeMap<String, Value>, _tools: &[String]) -> Result<Arc<dyn Node>, ComponentError> {
        Ok(Arc::new(ClarifyNode))
    }
}

#[async_trait]
impl Component for BriefComponent {
    fn metadata(&self) -> &ComponentMetadata {
        &self.meta
    }

    async fn build(&self, _overrides: &BTreeMap<String, Value>, _tools: &[String]) -> Result<Arc<dyn Node>, ComponentError> {
        Ok(Arc::new(BriefNode))
    }
}

#[async_trait]
impl Component for SupervisorComponent {
    fn metadata(&self) -> &ComponentMetadata {
        &self.meta
    }

    async fn build(&self, overrides: &BTreeMap<String, Value>, _tools: &[String]) -> Result<Arc<dyn Node>, ComponentError> {
        let max_iterations = overrides.get("max_iterations").and_then(Value::as_u64).unwrap_or(24) as u32;
        let max_concurrent_units = overrides
            .get("max_concurrent_units")
            .and_then(Value::as_u64)
            .unwrap_or(12) as u32;
        Ok(Arc::new(SupervisorNode {
            max_iterations,
            max_concurrent_units,
        }))
    }
}

#[async_trait]
impl Component for FinalReportComponent {
    fn metadata(&self) -> &ComponentMetadata {
        &self.meta
    }

    async fn build(&self, _overrides: &BTreeMap<String, Value>, _tools: &[String]) -> Result<Arc<dyn Node>, ComponentError> {
        Ok(Arc::new(FinalReportNode))
    }
}

/// Registers the `deep_research:*` components if they aren't already
/// present. Idempotent: safe to call on every startup.
pub fn ensure_registered(registry: &mut ComponentRegistry) {
    if registry.keys().contains(&"deep_research:clarify") {
        return;
    }
    registry.register(Arc::new(ClarifyComponent::new()));
    registry.register(Arc::new(BriefComponent::new()));
    registry.register(Arc::new(SupervisorComponent::new()));
    registry.register(Arc::new(FinalReportComponent::new()));
}
