//! The concurrent runtime: drives a [`CompiledGraph`] to completion.
//!
//! Executes supersteps over a frontier of pending node ids. Each superstep
//! drains up to `max_concurrency` nodes into a batch, runs their step
//! functions concurrently, merges the resulting state patches back in
//! canonical node-id order, then computes the next frontier from each
//! executed node's router. See [`Runtime::run`] for the full algorithm.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::instrument;

use crate::compiler::{CompiledGraph, END};
use crate::ir::{BuiltinEdgeCondition, EdgeWhen, PredicateOperator};
use crate::node::{NodeContext, NodeError, NodePartial};
use crate::reducers::strategies;
use crate::state::{ExecutionState, StateSnapshot};
use crate::utils::json_ext::get_by_path;
use crate::channels::Channel;

/// How a run stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitCondition {
    Completed,
    LimitExceeded,
    Cancelled,
    NodeFailed { node_id: String, message: String },
    /// A node finished and no outgoing edge's guard matched (including nodes
    /// with no outgoing edges at all). The validator only guarantees *some*
    /// path from the entrypoints reaches `END`, not that the path actually
    /// taken at runtime does.
    InvalidRouting { node_id: String },
}

/// A cooperative cancellation flag shared between a run and its caller.
/// Cloning shares the same underlying flag; call [`CancellationFlag::cancel`]
/// from outside the run to request a stop at the next batch boundary.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Final outcome of a run.
#[derive(Debug)]
pub struct RunOutcome {
    pub exit: ExitCondition,
    pub state: StateSnapshot,
    pub steps_taken: u64,
    pub elapsed: Duration,
}

/// Drives one [`CompiledGraph`] through to completion, a limit, a node
/// failure, or cancellation.
pub struct Runtime {
    graph: Arc<CompiledGraph>,
}

impl Runtime {
    #[must_use]
    pub fn new(graph: Arc<CompiledGraph>) -> Self {
        Self { graph }
    }

    #[must_use]
    pub fn compiled(&self) -> &CompiledGraph {
        &self.graph
    }

    /// Run from `initial_state` to completion.
    ///
    /// 1. Seed the frontier with the single entrypoint.
    /// 2. While the frontier is non-empty and the run hasn't been
    ///    cancelled or hit a limit: drain up to `max_concurrency` nodes into
    ///    a batch, execute their step functions concurrently, merge the
    ///    resulting patches in canonical node-id order, then route each
    ///    executed node to build the next frontier.
    /// 3. Return once the frontier empties, a limit is hit, a node fails,
    ///    routing is ambiguous, or cancellation is observed.
    #[instrument(skip_all, fields(key = %self.graph.key))]
    pub async fn run(&self, mut state: ExecutionState, cancellation: CancellationFlag) -> RunOutcome {
        let started_at = Instant::now();
        let mut step_count: u64 = 0;
        let mut frontier: Vec<String> = vec![self.graph.entrypoint.clone()];

        loop {
            if frontier.is_empty() {
                return self.finish(ExitCondition::Completed, &state, step_count, started_at);
            }
            if cancellation.is_cancelled() {
                return self.finish(ExitCondition::Cancelled, &state, step_count, started_at);
            }
            if self.limit_exceeded(step_count, started_at) {
                return self.finish(ExitCondition::LimitExceeded, &state, step_count, started_at);
            }

            let max_concurrency = self.graph.limits.max_concurrency.max(1) as usize;
            let take = frontier.len().min(max_concurrency);
            let batch: Vec<String> = frontier.drain(..take).collect();

            let snapshot = state.snapshot();
            let results = self.execute_batch(&batch, &snapshot, step_count).await;

            let mut ordered: Vec<(String, Result<NodePartial, NodeError>)> = batch.into_iter().zip(results).collect();
            ordered.sort_by(|a, b| a.0.cmp(&b.0));

            let mut next_frontier: Vec<String> = Vec::new();
            for (node_id, result) in ordered {
                step_count += 1;

                let partial = match result {
                    Ok(partial) => partial,
                    Err(err) => {
                        return self.finish(
                            ExitCondition::NodeFailed {
                                node_id,
                                message: err.to_string(),
                            },
                            &state,
                            step_count,
                            started_at,
                        );
                    }
                };
                self.merge_partial(&mut state, &partial);

                let context = self.routing_context(&state.snapshot(), step_count, started_at);
                match self.route(&node_id, &context) {
                    RouteOutcome::Next(target) => next_frontier.push(target),
                    RouteOutcome::Terminal => {}
                    RouteOutcome::Invalid => {
                        return self.finish(ExitCondition::InvalidRouting { node_id }, &state, step_count, started_at);
                    }
                }
            }

            frontier = next_frontier;
        }
    }

    async fn execute_batch(
        &self,
        batch: &[String],
        snapshot: &StateSnapshot,
        step_count: u64,
    ) -> Vec<Result<NodePartial, NodeError>> {
        let mut handles = Vec::with_capacity(batch.len());
        for node_id in batch {
            let node = Arc::clone(&self.graph.nodes[node_id]);
            let ctx = NodeContext::new(node_id.clone(), step_count);
            let snap = snapshot.clone();
            handles.push(tokio::spawn(async move { node.run(snap, ctx).await }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(NodeError::Provider {
                    provider: "runtime",
                    message: format!("node task did not complete: {join_err}"),
                }),
            };
            results.push(result);
        }
        results
    }

    /// Merge one node's patch into `state`, applying `add_messages` to the
    /// messages channel unconditionally and each extra field's bound
    /// reducer (default `replace`) to the extras channel. Bumps a channel's
    /// version only when the merge actually changed its content.
    fn merge_partial(&self, state: &mut ExecutionState, partial: &NodePartial) {
        if let Some(incoming) = &partial.messages {
            let current = state.messages.snapshot();
            let current_value = serde_json::to_value(&current).expect("messages serialize infallibly");
            let incoming_value = serde_json::to_value(incoming).expect("messages serialize infallibly");
            let merged_value = strategies::add_messages("messages", current_value, incoming_value).expect("messages channel is always an array of messages");
            let merged: Vec<crate::message::Message> = serde_json::from_value(merged_value).expect("merged messages deserialize infallibly");
            if merged != current {
                let next_version = state.messages.version() + 1;
                *state.messages.get_mut() = merged;
                state.messages.set_version(next_version);
            }
        }

        if let Some(incoming) = &partial.extra {
            let mut extra = state.extra.snapshot();
            let before = extra.clone();
            for (field, incoming_value) in incoming {
                let current_value = extra.get(field).cloned().unwrap_or(Value::Null);
                let merged = self
                    .graph
                    .reducers
                    .apply(field, current_value, incoming_value.clone())
                    .unwrap_or_else(|_| incoming_value.clone());
                extra.insert(field.clone(), merged);
            }
            if extra != before {
                let next_version = state.extra.version() + 1;
                *state.extra.get_mut() = extra;
                state.extra.set_version(next_version);
            }
        }

        if let Some(incoming) = &partial.errors {
            if !incoming.is_empty() {
                let mut errors = state.errors.snapshot();
                errors.extend(incoming.iter().cloned());
                let next_version = state.errors.version() + 1;
                *state.errors.get_mut() = errors;
                state.errors.set_version(next_version);
            }
        }
    }

    fn limit_exceeded(&self, step_count: u64, started_at: Instant) -> bool {
        let limits = &self.graph.limits;
        let steps_over = limits.max_steps > 0 && step_count >= u64::from(limits.max_steps);
        let time_over = limits.max_time_s > 0 && started_at.elapsed() >= Duration::from_secs(u64::from(limits.max_time_s));
        steps_over || time_over
    }

    /// Build the flat JSON object edge predicates are evaluated against:
    /// every `extra` field at the top level, plus synthesized `messages`
    /// and `execution_context` entries for the two built-in state paths.
    fn routing_context(&self, snapshot: &StateSnapshot, step_count: u64, started_at: Instant) -> Value {
        let mut map = serde_json::Map::new();
        for (key, value) in &snapshot.extra {
            map.insert(key.clone(), value.clone());
        }
        map.insert(
            "messages".to_string(),
            serde_json::to_value(&snapshot.messages).expect("messages serialize infallibly"),
        );
        map.insert(
            "execution_context".to_string(),
            serde_json::json!({
                "step_count": step_count,
                "elapsed_ms": started_at.elapsed().as_millis() as u64,
            }),
        );
        Value::Object(map)
    }

    fn route(&self, node_id: &str, context: &Value) -> RouteOutcome {
        let Some(edges) = self.graph.routing.get(node_id) else {
            return RouteOutcome::Invalid;
        };
        for edge in edges {
            if evaluate_when(&edge.when, context) {
                return if edge.to == END {
                    RouteOutcome::Terminal
                } else {
                    RouteOutcome::Next(edge.to.clone())
                };
            }
        }
        RouteOutcome::Invalid
    }

    fn finish(&self, exit: ExitCondition, state: &ExecutionState, step_count: u64, started_at: Instant) -> RunOutcome {
        RunOutcome {
            exit,
            state: state.snapshot(),
            steps_taken: step_count,
            elapsed: started_at.elapsed(),
        }
    }
}

enum RouteOutcome {
    Next(String),
    Terminal,
    Invalid,
}

fn evaluate_when(when: &Option<EdgeWhen>, context: &Value) -> bool {
    match when {
        None => true,
        Some(EdgeWhen::Builtin(cond)) => {
            let has_calls = context
                .get("tool_calls")
                .and_then(Value::as_array)
                .map(|calls| !calls.is_empty())
                .unwrap_or(false);
            match cond {
                BuiltinEdgeCondition::HasToolCalls => has_calls,
                BuiltinEdgeCondition::NoToolCalls => !has_calls,
            }
        }
        Some(EdgeWhen::Custom(pred)) => {
            let value = get_by_path(context, &pred.state_path).cloned().unwrap_or(Value::Null);
            match pred.operator {
                PredicateOperator::Eq => value == pred.value,
                PredicateOperator::Neq => value != pred.value,
                PredicateOperator::Truthy => is_truthy(&value),
                PredicateOperator::Falsy => !is_truthy(&value),
            }
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
