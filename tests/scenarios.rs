//! End-to-end coverage of the literal scenarios a complete graph config
//! pipeline (parse/upgrade -> canonicalize -> validate -> compile -> run)
//! must satisfy. Each unit stage already has its own module tests; this
//! file drives the full pipeline the way a real caller would.

use std::sync::Arc;

use async_trait::async_trait;
use flowforge::compiler::{CompilerDeps, GraphCompiler, ModelProvider, ModelRequest, ModelResponse, ToolExecutor};
use flowforge::legacy::create_react_config;
use flowforge::message::Message;
use flowforge::node::NodeError;
use flowforge::registry::ComponentRegistry;
use flowforge::runtime::{CancellationFlag, ExitCondition, Runtime};
use flowforge::state::ExecutionState;
use flowforge::upgrader::upgrade_graph_config;
use flowforge::validate::{validate_graph_config, ValidationErrorCode};
use serde_json::{json, Value};

struct StubProvider {
    reply: &'static str,
}

#[async_trait]
impl ModelProvider for StubProvider {
    async fn generate(&self, _request: ModelRequest) -> Result<ModelResponse, NodeError> {
        Ok(ModelResponse {
            message: Message::assistant(self.reply),
            tool_calls: vec![],
        })
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

fn deps(reply: &'static str) -> CompilerDeps {
    CompilerDeps {
        model_provider: Arc::new(StubProvider { reply }),
        tool_executor: Arc::new(NoopExecutor),
        components: Arc::new(ComponentRegistry::new()),
    }
}

/// Scenario 1: minimal LLM graph, compile + run with a stub model.
#[tokio::test]
async fn minimal_llm_graph_runs_to_completion_with_a_stub_model() {
    let raw = json!({
        "schema_version": "3.0",
        "key": "minimal-llm",
        "graph": {
            "nodes": [{
                "id": "agent",
                "name": "agent",
                "kind": "llm",
                "config": {},
            }],
            "edges": [{"from_node": "agent", "to_node": "END"}],
            "entrypoints": ["agent"],
        },
    });

    let migrated = upgrade_graph_config(&raw).unwrap();
    assert!(validate_graph_config(&migrated.config).is_empty());

    let compiler = GraphCompiler::new(deps("ok"));
    let compiled = compiler.compile(migrated.config).await.unwrap();

    let runtime = Runtime::new(Arc::new(compiled));
    let outcome = runtime
        .run(ExecutionState::new_with_user_message("hello"), CancellationFlag::new())
        .await;

    assert_eq!(outcome.exit, ExitCondition::Completed);
    assert_eq!(outcome.state.messages.len(), 2);
    assert_eq!(outcome.state.messages.last().unwrap().content, "ok");
}

/// Scenario 2: a legacy v2 ReAct payload upgrades to v3 with the START edge
/// dropped and both built-in tool-call guards preserved.
#[test]
fn legacy_v2_react_upgrades_to_a_clean_v3_agent_tool_loop() {
    let raw = serde_json::to_value(create_react_config("You are helpful.")).unwrap();
    let migrated = upgrade_graph_config(&raw).unwrap();

    assert_eq!(migrated.config.graph.entrypoints, vec!["agent".to_string()]);
    assert_eq!(migrated.config.graph.edges.len(), 3);
    assert!(migrated
        .config
        .graph
        .edges
        .iter()
        .all(|e| e.from_node != "START" && e.to_node != "START"));
    assert!(validate_graph_config(&migrated.config).is_empty());
}

/// Scenario 3: a node with no incoming edge is flagged UNREACHABLE_NODE at
/// the documented path.
#[test]
fn unreachable_node_is_rejected_with_the_documented_code_and_path() {
    let raw = json!({
        "schema_version": "3.0",
        "key": "with-orphan",
        "graph": {
            "nodes": [
                {"id": "agent", "name": "agent", "kind": "transform", "config": {"template": "x", "output_key": "out"}},
                {"id": "orphan", "name": "orphan", "kind": "transform", "config": {"template": "y", "output_key": "out2"}},
            ],
            "edges": [{"from_node": "agent", "to_node": "END"}],
            "entrypoints": ["agent"],
        },
    });
    let config = flowforge::parser::parse_graph_config(&raw).unwrap();
    let errors = validate_graph_config(&config);
    let found = errors.iter().find(|e| e.code == ValidationErrorCode::UnreachableNode).unwrap();
    assert_eq!(found.path, "graph.nodes");
}

/// Scenario 4: a two-node cycle with both limits zeroed is rejected at
/// validation time; raising max_steps lets it run and hit limit_exceeded.
/// The guarded `a -> END` edge never fires at runtime (no `tool_calls` is
/// ever produced) — it exists only so `END_UNREACHABLE` doesn't also fire,
/// isolating the behavior this scenario actually tests.
#[tokio::test]
async fn cycle_requires_limits_then_hits_limit_exceeded_once_granted_one() {
    fn cyclic_config(max_steps: u32) -> Value {
        json!({
            "schema_version": "3.0",
            "key": "cycle",
            "graph": {
                "nodes": [
                    {"id": "a", "name": "a", "kind": "transform", "config": {"template": "x", "output_key": "out"}},
                    {"id": "b", "name": "b", "kind": "transform", "config": {"template": "y", "output_key": "out2"}},
                ],
                "edges": [
                    {"from_node": "a", "to_node": "b"},
                    {"from_node": "a", "to_node": "END", "when": "has_tool_calls"},
                    {"from_node": "b", "to_node": "a"},
                ],
                "entrypoints": ["a"],
            },
            "limits": {"max_time_s": 0, "max_steps": max_steps, "max_concurrency": 10},
        });
    }

    let zero_limits = flowforge::parser::parse_graph_config(&cyclic_config(0)).unwrap();
    let errors = validate_graph_config(&zero_limits);
    assert!(errors.iter().any(|e| e.code == ValidationErrorCode::CycleLimitsRequired));

    let bounded = flowforge::parser::parse_graph_config(&cyclic_config(10)).unwrap();
    assert!(validate_graph_config(&bounded).is_empty());

    let compiler = GraphCompiler::new(deps("ignored"));
    let compiled = compiler.compile(bounded).await.unwrap();
    let runtime = Runtime::new(Arc::new(compiled));
    let outcome = runtime
        .run(ExecutionState::new_with_user_message("go"), CancellationFlag::new())
        .await;

    assert_eq!(outcome.exit, ExitCondition::LimitExceeded);
    assert_eq!(outcome.steps_taken, 10);
}

/// Scenario 5: a predicate referencing a state path absent from the schema
/// is rejected; declaring that field in `state.schema` clears the error.
#[test]
fn predicate_on_missing_state_path_is_rejected_then_cleared_by_declaring_the_field() {
    fn config_with_schema(schema: Value) -> Value {
        json!({
            "schema_version": "3.0",
            "key": "predicate-demo",
            "graph": {
                "nodes": [{"id": "clarify", "name": "clarify", "kind": "transform", "config": {"template": "x", "output_key": "out"}}],
                "edges": [
                    {
                        "from_node": "clarify",
                        "to_node": "END",
                        "when": {"state_path": "need_clarification", "operator": "truthy"},
                    },
                ],
                "entrypoints": ["clarify"],
            },
            "state": {"schema": schema, "reducers": {}},
        });
    }

    let missing = flowforge::parser::parse_graph_config(&config_with_schema(json!({}))).unwrap();
    let errors = validate_graph_config(&missing);
    assert!(errors.iter().any(|e| e.code == ValidationErrorCode::PredicateStatePathMissing));

    let declared = flowforge::parser::parse_graph_config(&config_with_schema(json!({
        "need_clarification": {"type": "bool", "default": false},
    })))
    .unwrap();
    assert!(validate_graph_config(&declared).is_empty());
    assert_eq!(
        declared.state.state_schema.get("need_clarification").map(|f| &f.field_type),
        Some(&flowforge::ir::StateFieldType::Bool)
    );
}
