//! Lowers a canonical, validated [`GraphConfig`] into a [`CompiledGraph`]:
//! a map of executable node ids to `Arc<dyn Node>` steps plus the routing
//! table the runtime walks at each barrier.
//!
//! Unlike the service this engine is grounded in — which bridges the v3 IR
//! back into a legacy LangGraph-oriented `GraphBuilder` — this compiler
//! lowers straight to a native step graph. There's no intermediate
//! framework to round-trip through.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::ir::{ComponentNodeConfig, GraphConfig, LlmNodeConfig, NodeKind, ToolNodeConfig, TransformNodeConfig};
use crate::message::Message;
use crate::node::{Node, NodeContext, NodeError, NodePartial};
use crate::reducers::ReducerRegistry;
use crate::registry::{ComponentError, ComponentRegistry};
use crate::state::StateSnapshot;

pub const END: &str = "END";

#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    #[error(transparent)]
    #[diagnostic(code(flowforge::compiler::invalid_config))]
    Invalid(#[from] crate::validate::InvalidGraphConfig),

    #[error("component resolution failed for node '{node_id}': {source}")]
    #[diagnostic(code(flowforge::compiler::component_resolution))]
    ComponentResolution {
        node_id: String,
        #[source]
        source: ComponentError,
    },
}

/// A request to generate a chat completion, handed to a [`ModelProvider`].
#[derive(Clone, Debug)]
pub struct ModelRequest {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub messages: Vec<Message>,
    pub tools_enabled: bool,
    pub tool_filter: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug, Default)]
pub struct ModelResponse {
    pub message: Message,
    pub tool_calls: Vec<ToolCall>,
}

/// Backs every `llm` node. Swappable per deployment; the compiler is
/// agnostic to which concrete provider is wired in.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> Result<ModelResponse, NodeError>;
}

/// Backs every `tool` node.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn call(&self, name: &str, arguments: Value) -> Result<Value, NodeError>;
    fn available_tools(&self) -> Vec<String>;
}

struct LlmNode {
    id: String,
    config: LlmNodeConfig,
    provider: Arc<dyn ModelProvider>,
}

#[async_trait]
impl Node for LlmNode {
    #[instrument(skip_all, fields(node_id = %self.id))]
    async fn run(&self, snapshot: StateSnapshot, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let mut messages = snapshot.messages.clone();
        if !self.config.prompt_template.is_empty() && !messages.iter().any(|m| m.has_role(Message::SYSTEM)) {
            messages.insert(0, Message::system(&self.config.prompt_template));
        }

        let response = self
            .provider
            .generate(ModelRequest {
                model: self.config.model_override.clone(),
                temperature: self.config.temperature_override,
                max_tokens: self.config.max_tokens,
                messages,
                tools_enabled: self.config.tools_enabled,
                tool_filter: self.config.tool_filter.clone(),
            })
            .await?;

        let mut extra = rustc_hash::FxHashMap::default();
        extra.insert(
            self.config.output_key.clone(),
            Value::String(response.message.content.clone()),
        );
        if !response.tool_calls.is_empty() {
            extra.insert(
                "tool_calls".to_string(),
                serde_json::to_value(
                    response
                        .tool_calls
                        .iter()
                        .map(|c| serde_json::json!({"id": c.id, "name": c.name, "arguments": c.arguments}))
                        .collect::<Vec<_>>(),
                )
                .expect("tool calls serialize infallibly"),
            );
        }

        Ok(NodePartial::new()
            .with_messages(vec![response.message])
            .with_extra(extra))
    }
}

struct ToolNode {
    config: ToolNodeConfig,
    executor: Arc<dyn ToolExecutor>,
}

#[async_trait]
impl Node for ToolNode {
    async fn run(&self, snapshot: StateSnapshot, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let Some(raw_calls) = snapshot.extra.get("tool_calls") else {
            return Ok(NodePartial::new());
        };
        let calls: Vec<Value> = raw_calls.as_array().cloned().unwrap_or_default();

        let mut results = Vec::new();
        for call in &calls {
            let name = call.get("name").and_then(Value::as_str).unwrap_or_default();
            if let Some(filter) = &self.config.tool_filter {
                if !filter.iter().any(|f| f == name) {
                    continue;
                }
            }
            let arguments = call.get("arguments").cloned().unwrap_or(Value::Null);
            let timeout = std::time::Duration::from_secs(u64::from(self.config.timeout_seconds));
            let outcome = tokio::time::timeout(timeout, self.executor.call(name, arguments))
                .await
                .map_err(|_| NodeError::Provider {
                    provider: "tool_executor",
                    message: format!("tool '{name}' timed out after {}s", self.config.timeout_seconds),
                })??;
            results.push(serde_json::json!({"name": name, "result": outcome}));
            if !self.config.execute_all {
                break;
            }
        }

        let mut extra = rustc_hash::FxHashMap::default();
        extra.insert(self.config.output_key.clone(), Value::Array(results));
        Ok(NodePartial::new().with_extra(extra))
    }
}

struct TransformNode {
    config: TransformNodeConfig,
}

#[async_trait]
impl Node for TransformNode {
    async fn run(&self, snapshot: StateSnapshot, _ctx: NodeContext) -> Result<NodePartial, NodeError> {
        let mut rendered = self.config.template.clone();
        let keys = if self.config.input_keys.is_empty() {
            snapshot.extra.keys().cloned().collect::<Vec<_>>()
        } else {
            self.config.input_keys.clone()
        };
        for key in &keys {
            let placeholder = format!("{{{{{key}}}}}");
            if let Some(value) = snapshot.extra.get(key) {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                rendered = rendered.replace(&placeholder, &text);
            }
        }

        let mut extra = rustc_hash::FxHashMap::default();
        extra.insert(self.config.output_key.clone(), Value::String(rendered));
        Ok(NodePartial::new().with_extra(extra))
    }
}

struct ComponentNode {
    inner: Arc<dyn Node>,
}

#[async_trait]
impl Node for ComponentNode {
    async fn run(&self, snapshot: StateSnapshot, ctx: NodeContext) -> Result<NodePartial, NodeError> {
        self.inner.run(snapshot, ctx).await
    }
}

#[derive(Clone, Debug)]
pub struct CompiledEdge {
    pub to: String,
    pub when: Option<crate::ir::EdgeWhen>,
    pub priority: i32,
}

/// The executable form of a [`GraphConfig`]: every node wired to its step
/// implementation, plus the routing table the runtime consults at barriers.
pub struct CompiledGraph {
    pub key: String,
    pub revision: u32,
    pub entrypoint: String,
    pub nodes: FxHashMap<String, Arc<dyn Node>>,
    pub routing: FxHashMap<String, Vec<CompiledEdge>>,
    pub reducers: ReducerRegistry,
    pub limits: crate::ir::Limits,
    /// Node id -> component key, for nodes compiled from a `component` kind.
    /// Exposed to callers that want to report which reusable components a
    /// run actually exercised.
    pub component_keys: FxHashMap<String, String>,
}

impl CompiledGraph {
    #[must_use]
    pub fn node_component_keys(&self) -> &FxHashMap<String, String> {
        &self.component_keys
    }
}

/// Dependencies a [`GraphCompiler`] needs to resolve `llm` and `tool` nodes.
/// `component` nodes resolve through the [`ComponentRegistry`] instead.
pub struct CompilerDeps {
    pub model_provider: Arc<dyn ModelProvider>,
    pub tool_executor: Arc<dyn ToolExecutor>,
    pub components: Arc<ComponentRegistry>,
}

pub struct GraphCompiler {
    deps: CompilerDeps,
}

impl GraphCompiler {
    #[must_use]
    pub fn new(deps: CompilerDeps) -> Self {
        Self { deps }
    }

    /// Canonicalize, validate, and lower `config` into a [`CompiledGraph`].
    #[instrument(skip_all, fields(key = %config.key))]
    pub async fn compile(&self, config: GraphConfig) -> Result<CompiledGraph, CompileError> {
        let canonical = crate::canonicalize::canonicalize_graph_config(config);
        crate::validate::ensure_valid_graph_config(&canonical)?;

        let mut nodes: FxHashMap<String, Arc<dyn Node>> = FxHashMap::default();
        let mut component_keys: FxHashMap<String, String> = FxHashMap::default();
        for node in &canonical.graph.nodes {
            let compiled: Arc<dyn Node> = match &node.kind {
                NodeKind::Llm(cfg) => Arc::new(LlmNode {
                    id: node.id.clone(),
                    config: cfg.clone(),
                    provider: Arc::clone(&self.deps.model_provider),
                }),
                NodeKind::Tool(cfg) => Arc::new(ToolNode {
                    config: cfg.clone(),
                    executor: Arc::clone(&self.deps.tool_executor),
                }),
                NodeKind::Transform(cfg) => Arc::new(TransformNode { config: cfg.clone() }),
                NodeKind::Component(cfg) => {
                    let built = self.compile_component(cfg).await.map_err(|source| CompileError::ComponentResolution {
                        node_id: node.id.clone(),
                        source,
                    })?;
                    component_keys.insert(node.id.clone(), cfg.component_ref.key.clone());
                    Arc::new(ComponentNode { inner: built })
                }
            };
            nodes.insert(node.id.clone(), compiled);
        }

        let mut routing: FxHashMap<String, Vec<CompiledEdge>> = FxHashMap::default();
        for edge in &canonical.graph.edges {
            routing.entry(edge.from_node.clone()).or_default().push(CompiledEdge {
                to: edge.to_node.clone(),
                when: edge.when.clone(),
                priority: edge.priority,
            });
        }

        Ok(CompiledGraph {
            key: canonical.key,
            revision: canonical.revision,
            entrypoint: canonical.graph.entrypoints[0].clone(),
            nodes,
            routing,
            reducers: ReducerRegistry::from_contract(&canonical.state.reducers),
            limits: canonical.limits,
            component_keys,
        })
    }

    async fn compile_component(&self, cfg: &ComponentNodeConfig) -> Result<Arc<dyn Node>, ComponentError> {
        let component = self.deps.components.resolve(&cfg.component_ref.key, &cfg.component_ref.version)?;
        let overrides: BTreeMap<String, Value> = cfg.config_overrides.clone();
        component.validate_config_overrides(&overrides)?;
        let available_tools = self.deps.tool_executor.available_tools();
        component.build(&overrides, &available_tools).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, GraphIr, Limits, Node as IrNode, StateContract, TransformNodeConfig as IrTransform};

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
            components: Arc::new(ComponentRegistry::new()),
        }
    }

    #[tokio::test]
    async fn compiles_single_transform_node_graph() {
        let config = GraphConfig {
            schema_version: "3.0".to_string(),
            key: "demo".to_string(),
            revision: 1,
            graph: GraphIr {
                nodes: vec![IrNode {
                    id: "n1".to_string(),
                    name: "n1".to_string(),
                    description: None,
                    reads: vec![],
                    writes: vec![],
                    kind: NodeKind::Transform(IrTransform {
                        template: "hi".to_string(),
                        output_key: "out".to_string(),
                        input_keys: vec![],
                    }),
                }],
                edges: vec![Edge {
                    from_node: "n1".to_string(),
                    to_node: END.to_string(),
                    when: None,
                    priority: 0,
                    label: None,
                }],
                entrypoints: vec!["n1".to_string()],
            },
            state: StateContract::default(),
            deps: None,
            limits: Limits::default(),
            metadata: None,
            ui: None,
        };

        let compiler = GraphCompiler::new(deps());
        let compiled = compiler.compile(config).await.unwrap();
        assert_eq!(compiled.entrypoint, "n1");
        assert!(compiled.nodes.contains_key("n1"));
        assert_eq!(compiled.routing["n1"][0].to, "END");
    }
}
