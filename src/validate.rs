//! Structural validation for a canonical [`GraphConfig`].
//!
//! Checks run in the same order the original validator did: shape (empty
//! graph, duplicate ids, entrypoint count), edge well-formedness, routing
//! determinism per source node, reachability from entrypoints, reachability
//! of `END`, and cycle/limit interaction. Every check appends a structured
//! [`ValidationError`] rather than failing fast, so a caller sees every
//! problem in one pass.

use std::collections::{HashMap, HashSet, VecDeque};

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::ir::{BuiltinEdgeCondition, Edge, EdgeWhen, GraphConfig, NodeKind};

const BUILTIN_STATE_PATHS: [&str; 2] = ["messages", "execution_context"];

const MAX_TIME_S_CEILING: u32 = 3600;
const MAX_STEPS_CEILING: u32 = 100_000;
const MAX_CONCURRENCY_RANGE: std::ops::RangeInclusive<u32> = 1..=256;
const TOOL_TIMEOUT_SECONDS_RANGE: std::ops::RangeInclusive<u32> = 1..=600;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationErrorCode {
    EmptyGraph,
    DuplicateNodeId,
    MultipleEntrypointsUnsupported,
    EntrypointNotFound,
    EdgeFromStartForbidden,
    EdgeFromEndForbidden,
    EdgeSourceNotFound,
    EdgeToStartForbidden,
    EdgeTargetNotFound,
    PredicateStatePathMissing,
    MultipleDefaultEdges,
    DuplicateHasToolCallsEdge,
    DuplicateNoToolCallsEdge,
    MixedBuiltinAndCustomRouting,
    UnreachableNode,
    EndUnreachable,
    CycleLimitsRequired,
    LimitOutOfRange,
    ToolTimeoutOutOfRange,
}

impl ValidationErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyGraph => "EMPTY_GRAPH",
            Self::DuplicateNodeId => "DUPLICATE_NODE_ID",
            Self::MultipleEntrypointsUnsupported => "MULTIPLE_ENTRYPOINTS_UNSUPPORTED",
            Self::EntrypointNotFound => "ENTRYPOINT_NOT_FOUND",
            Self::EdgeFromStartForbidden => "EDGE_FROM_START_FORBIDDEN",
            Self::EdgeFromEndForbidden => "EDGE_FROM_END_FORBIDDEN",
            Self::EdgeSourceNotFound => "EDGE_SOURCE_NOT_FOUND",
            Self::EdgeToStartForbidden => "EDGE_TO_START_FORBIDDEN",
            Self::EdgeTargetNotFound => "EDGE_TARGET_NOT_FOUND",
            Self::PredicateStatePathMissing => "PREDICATE_STATE_PATH_MISSING",
            Self::MultipleDefaultEdges => "MULTIPLE_DEFAULT_EDGES",
            Self::DuplicateHasToolCallsEdge => "DUPLICATE_HAS_TOOL_CALLS_EDGE",
            Self::DuplicateNoToolCallsEdge => "DUPLICATE_NO_TOOL_CALLS_EDGE",
            Self::MixedBuiltinAndCustomRouting => "MIXED_BUILTIN_AND_CUSTOM_ROUTING",
            Self::UnreachableNode => "UNREACHABLE_NODE",
            Self::EndUnreachable => "END_UNREACHABLE",
            Self::CycleLimitsRequired => "CYCLE_LIMITS_REQUIRED",
            Self::LimitOutOfRange => "LIMIT_OUT_OF_RANGE",
            Self::ToolTimeoutOutOfRange => "TOOL_TIMEOUT_OUT_OF_RANGE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub code: ValidationErrorCode,
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(code: ValidationErrorCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code.as_str(), self.path, self.message)
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("invalid graph configuration: {}", format_errors(.0))]
#[diagnostic(code(flowforge::validate::invalid_graph_config))]
pub struct InvalidGraphConfig(pub Vec<ValidationError>);

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn build_adjacency<'a>(edges: &'a [Edge], node_ids: &FxHashSet<String>) -> HashMap<&'a str, HashSet<&'a str>> {
    let mut adjacency: HashMap<&str, HashSet<&str>> = node_ids.iter().map(|id| (id.as_str(), HashSet::new())).collect();
    for edge in edges {
        if node_ids.contains(&edge.from_node) && node_ids.contains(&edge.to_node) {
            adjacency
                .entry(edge.from_node.as_str())
                .or_default()
                .insert(edge.to_node.as_str());
        }
    }
    adjacency
}

fn has_cycle(adjacency: &HashMap<&str, HashSet<&str>>) -> bool {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut colors: HashMap<&str, Color> = adjacency.keys().map(|&n| (n, Color::White)).collect();

    fn visit<'a>(node: &'a str, adjacency: &HashMap<&'a str, HashSet<&'a str>>, colors: &mut HashMap<&'a str, Color>) -> bool {
        colors.insert(node, Color::Gray);
        if let Some(neighbors) = adjacency.get(node) {
            for &next in neighbors {
                match colors.get(next).copied().unwrap_or(Color::White) {
                    Color::Black => continue,
                    Color::Gray => return true,
                    Color::White => {
                        if visit(next, adjacency, colors) {
                            return true;
                        }
                    }
                }
            }
        }
        colors.insert(node, Color::Black);
        false
    }

    let nodes: Vec<&str> = adjacency.keys().copied().collect();
    for node in nodes {
        if colors.get(node).copied() == Some(Color::White) && visit(node, adjacency, &mut colors) {
            return true;
        }
    }
    false
}

fn reachable_from_entrypoints<'a>(entrypoints: &'a [String], adjacency: &HashMap<&'a str, HashSet<&'a str>>) -> HashSet<&'a str> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = entrypoints.iter().map(String::as_str).collect();
    while let Some(node) = queue.pop_front() {
        if !visited.insert(node) {
            continue;
        }
        if let Some(neighbors) = adjacency.get(node) {
            for &next in neighbors {
                if !visited.contains(next) {
                    queue.push_back(next);
                }
            }
        }
    }
    visited
}

fn is_end_reachable(entrypoints: &[String], edges: &[Edge]) -> bool {
    let mut outgoing: HashMap<&str, Vec<&Edge>> = HashMap::new();
    for edge in edges {
        outgoing.entry(edge.from_node.as_str()).or_default().push(edge);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = entrypoints.iter().map(String::as_str).collect();
    while let Some(node) = queue.pop_front() {
        if !visited.insert(node) {
            continue;
        }
        if let Some(edges) = outgoing.get(node) {
            for edge in edges {
                if edge.to_node == "END" {
                    return true;
                }
                if !visited.contains(edge.to_node.as_str()) {
                    queue.push_back(edge.to_node.as_str());
                }
            }
        }
    }
    false
}

/// Run every structural check and return all failures found, in the order
/// the original checks ran.
#[must_use]
pub fn validate_graph_config(config: &GraphConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let nodes = &config.graph.nodes;
    let edges = &config.graph.edges;
    let entrypoints = &config.graph.entrypoints;

    if nodes.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorCode::EmptyGraph,
            "graph.nodes",
            "Graph must contain at least one node.",
        ));
        return errors;
    }

    let node_ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let node_id_set: FxHashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();

    let mut seen = HashSet::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for &id in &node_ids {
        if !seen.insert(id) && !duplicates.contains(&id) {
            duplicates.push(id);
        }
    }
    if !duplicates.is_empty() {
        duplicates.sort_unstable();
        errors.push(ValidationError::new(
            ValidationErrorCode::DuplicateNodeId,
            "graph.nodes",
            format!("Node IDs must be unique. Duplicates: {duplicates:?}."),
        ));
    }

    if entrypoints.len() != 1 {
        errors.push(ValidationError::new(
            ValidationErrorCode::MultipleEntrypointsUnsupported,
            "graph.entrypoints",
            "Current runtime requires exactly one entrypoint.",
        ));
    }

    for (idx, entrypoint) in entrypoints.iter().enumerate() {
        if !node_id_set.contains(entrypoint) {
            errors.push(ValidationError::new(
                ValidationErrorCode::EntrypointNotFound,
                format!("graph.entrypoints[{idx}]"),
                format!("Entrypoint '{entrypoint}' does not exist in graph.nodes."),
            ));
        }
    }

    let mut state_paths: FxHashSet<&str> = config.state.state_schema.keys().map(String::as_str).collect();
    state_paths.extend(BUILTIN_STATE_PATHS);

    let mut edges_by_source: HashMap<&str, Vec<(usize, &Edge)>> = HashMap::new();
    for (idx, edge) in edges.iter().enumerate() {
        let edge_path = format!("graph.edges[{idx}]");
        edges_by_source.entry(edge.from_node.as_str()).or_default().push((idx, edge));

        if edge.from_node == "START" {
            errors.push(ValidationError::new(
                ValidationErrorCode::EdgeFromStartForbidden,
                format!("{edge_path}.from_node"),
                "Uses graph.entrypoints[]; START edges are not allowed.",
            ));
        } else if edge.from_node == "END" {
            errors.push(ValidationError::new(
                ValidationErrorCode::EdgeFromEndForbidden,
                format!("{edge_path}.from_node"),
                "END cannot be used as an edge source.",
            ));
        } else if !node_id_set.contains(&edge.from_node) {
            errors.push(ValidationError::new(
                ValidationErrorCode::EdgeSourceNotFound,
                format!("{edge_path}.from_node"),
                format!("Edge source '{}' does not exist.", edge.from_node),
            ));
        }

        if edge.to_node == "START" {
            errors.push(ValidationError::new(
                ValidationErrorCode::EdgeToStartForbidden,
                format!("{edge_path}.to_node"),
                "START cannot be used as an edge target.",
            ));
        } else if edge.to_node != "END" && !node_id_set.contains(&edge.to_node) {
            errors.push(ValidationError::new(
                ValidationErrorCode::EdgeTargetNotFound,
                format!("{edge_path}.to_node"),
                format!("Edge target '{}' does not exist.", edge.to_node),
            ));
        }

        if let Some(EdgeWhen::Custom(pred)) = &edge.when {
            if !state_paths.contains(pred.state_path.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorCode::PredicateStatePathMissing,
                    format!("{edge_path}.when.state_path"),
                    format!(
                        "Predicate state_path '{}' is missing in state.schema and is not a built-in state path.",
                        pred.state_path
                    ),
                ));
            }
        }
    }

    for (source, entries) in &edges_by_source {
        let default_edges: Vec<_> = entries.iter().filter(|(_, e)| e.when.is_none()).collect();
        if default_edges.len() > 1 {
            errors.push(ValidationError::new(
                ValidationErrorCode::MultipleDefaultEdges,
                format!("graph.edges[{}].when", default_edges[1].0),
                format!("Node '{source}' has more than one unconditional edge."),
            ));
        }

        let has_tool_edges: Vec<_> = entries
            .iter()
            .filter(|(_, e)| matches!(&e.when, Some(EdgeWhen::Builtin(BuiltinEdgeCondition::HasToolCalls))))
            .collect();
        let no_tool_edges: Vec<_> = entries
            .iter()
            .filter(|(_, e)| matches!(&e.when, Some(EdgeWhen::Builtin(BuiltinEdgeCondition::NoToolCalls))))
            .collect();
        let custom_edges: Vec<_> = entries.iter().filter(|(_, e)| matches!(&e.when, Some(EdgeWhen::Custom(_)))).collect();

        if has_tool_edges.len() > 1 {
            errors.push(ValidationError::new(
                ValidationErrorCode::DuplicateHasToolCallsEdge,
                format!("graph.edges[{}].when", has_tool_edges[1].0),
                format!("Node '{source}' has duplicate has_tool_calls edges."),
            ));
        }
        if no_tool_edges.len() > 1 {
            errors.push(ValidationError::new(
                ValidationErrorCode::DuplicateNoToolCallsEdge,
                format!("graph.edges[{}].when", no_tool_edges[1].0),
                format!("Node '{source}' has duplicate no_tool_calls edges."),
            ));
        }
        if (!has_tool_edges.is_empty() || !no_tool_edges.is_empty()) && !custom_edges.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorCode::MixedBuiltinAndCustomRouting,
                format!("graph.edges[{}].when", custom_edges[0].0),
                format!("Node '{source}' mixes built-in tool routing and custom predicates."),
            ));
        }
    }

    let adjacency = build_adjacency(edges, &node_id_set);
    let reachable = reachable_from_entrypoints(entrypoints, &adjacency);
    let mut unreachable: Vec<&str> = node_ids.iter().filter(|id| !reachable.contains(*id)).copied().collect();
    if !unreachable.is_empty() {
        unreachable.sort_unstable();
        errors.push(ValidationError::new(
            ValidationErrorCode::UnreachableNode,
            "graph.nodes",
            format!("Unreachable nodes from entrypoints: {unreachable:?}."),
        ));
    }

    if !is_end_reachable(entrypoints, edges) {
        errors.push(ValidationError::new(
            ValidationErrorCode::EndUnreachable,
            "graph.edges",
            "No execution path from entrypoints can reach END.",
        ));
    }

    if has_cycle(&adjacency) && config.limits.max_steps == 0 && config.limits.max_time_s == 0 {
        errors.push(ValidationError::new(
            ValidationErrorCode::CycleLimitsRequired,
            "limits",
            "Graphs with cycles require max_steps or max_time_s limits.",
        ));
    }

    // max_steps/max_time_s of 0 is the explicit "no limit" sentinel the cycle
    // check above depends on; anything else must fall inside the documented
    // range. max_concurrency has no such sentinel.
    if config.limits.max_time_s > MAX_TIME_S_CEILING {
        errors.push(ValidationError::new(
            ValidationErrorCode::LimitOutOfRange,
            "limits.max_time_s",
            format!("max_time_s must be 0 (unlimited) or at most {MAX_TIME_S_CEILING}, got {}.", config.limits.max_time_s),
        ));
    }
    if config.limits.max_steps > MAX_STEPS_CEILING {
        errors.push(ValidationError::new(
            ValidationErrorCode::LimitOutOfRange,
            "limits.max_steps",
            format!("max_steps must be 0 (unlimited) or at most {MAX_STEPS_CEILING}, got {}.", config.limits.max_steps),
        ));
    }
    if !MAX_CONCURRENCY_RANGE.contains(&config.limits.max_concurrency) {
        errors.push(ValidationError::new(
            ValidationErrorCode::LimitOutOfRange,
            "limits.max_concurrency",
            format!(
                "max_concurrency must be within {}..={}, got {}.",
                MAX_CONCURRENCY_RANGE.start(),
                MAX_CONCURRENCY_RANGE.end(),
                config.limits.max_concurrency
            ),
        ));
    }

    for (idx, node) in nodes.iter().enumerate() {
        if let NodeKind::Tool(tool_config) = &node.kind {
            if !TOOL_TIMEOUT_SECONDS_RANGE.contains(&tool_config.timeout_seconds) {
                errors.push(ValidationError::new(
                    ValidationErrorCode::ToolTimeoutOutOfRange,
                    format!("graph.nodes[{idx}].config.timeout_seconds"),
                    format!(
                        "timeout_seconds must be within {}..={}, got {}.",
                        TOOL_TIMEOUT_SECONDS_RANGE.start(),
                        TOOL_TIMEOUT_SECONDS_RANGE.end(),
                        tool_config.timeout_seconds
                    ),
                ));
            }
        }
    }

    errors
}

/// Validate `config`, returning `Err` with every failure if any check fails.
pub fn ensure_valid_graph_config(config: &GraphConfig) -> Result<(), InvalidGraphConfig> {
    let errors = validate_graph_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(InvalidGraphConfig(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, GraphIr, Limits, Node, NodeKind, StateContract, ToolNodeConfig, TransformNodeConfig};

    fn tool_node(id: &str, timeout_seconds: u32) -> Node {
        Node {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            reads: vec![],
            writes: vec![],
            kind: NodeKind::Tool(ToolNodeConfig {
                execute_all: true,
                tool_filter: None,
                output_key: "tool_results".to_string(),
                timeout_seconds,
            }),
        }
    }

    fn transform_node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            reads: vec![],
            writes: vec![],
            kind: NodeKind::Transform(TransformNodeConfig {
                template: "x".to_string(),
                output_key: "out".to_string(),
                input_keys: vec![],
            }),
        }
    }

    fn base_config(nodes: Vec<Node>, edges: Vec<Edge>, entrypoints: Vec<&str>) -> GraphConfig {
        GraphConfig {
            schema_version: "3.0".to_string(),
            key: "demo".to_string(),
            revision: 1,
            graph: GraphIr {
                nodes,
                edges,
                entrypoints: entrypoints.into_iter().map(str::to_string).collect(),
            },
            state: StateContract::default(),
            deps: None,
            limits: Limits::default(),
            metadata: None,
            ui: None,
        }
    }

    #[test]
    fn empty_graph_is_rejected() {
        let config = base_config(vec![], vec![], vec![]);
        let errors = validate_graph_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ValidationErrorCode::EmptyGraph);
    }

    #[test]
    fn single_node_reaching_end_is_valid() {
        let config = base_config(
            vec![transform_node("n1")],
            vec![Edge {
                from_node: "n1".to_string(),
                to_node: "END".to_string(),
                when: None,
                priority: 0,
                label: None,
            }],
            vec!["n1"],
        );
        assert!(validate_graph_config(&config).is_empty());
    }

    #[test]
    fn unreachable_node_is_flagged() {
        let config = base_config(
            vec![transform_node("n1"), transform_node("n2")],
            vec![Edge {
                from_node: "n1".to_string(),
                to_node: "END".to_string(),
                when: None,
                priority: 0,
                label: None,
            }],
            vec!["n1"],
        );
        let errors = validate_graph_config(&config);
        assert!(errors.iter().any(|e| e.code == ValidationErrorCode::UnreachableNode));
    }

    #[test]
    fn cycle_without_limits_is_flagged() {
        let mut config = base_config(
            vec![transform_node("n1"), transform_node("n2")],
            vec![
                Edge {
                    from_node: "n1".to_string(),
                    to_node: "n2".to_string(),
                    when: None,
                    priority: 0,
                    label: None,
                },
                Edge {
                    from_node: "n2".to_string(),
                    to_node: "n1".to_string(),
                    when: None,
                    priority: 0,
                    label: None,
                },
            ],
            vec!["n1"],
        );
        config.limits.max_steps = 0;
        config.limits.max_time_s = 0;
        let errors = validate_graph_config(&config);
        assert!(errors.iter().any(|e| e.code == ValidationErrorCode::CycleLimitsRequired));
        assert!(errors.iter().any(|e| e.code == ValidationErrorCode::EndUnreachable));
    }

    #[test]
    fn ensure_valid_graph_config_formats_all_errors() {
        let config = base_config(vec![], vec![], vec![]);
        let err = ensure_valid_graph_config(&config).unwrap_err();
        assert!(err.to_string().contains("EMPTY_GRAPH"));
    }

    #[test]
    fn zero_limits_remain_valid_sentinels_on_an_acyclic_graph() {
        let mut config = base_config(
            vec![transform_node("n1")],
            vec![Edge {
                from_node: "n1".to_string(),
                to_node: "END".to_string(),
                when: None,
                priority: 0,
                label: None,
            }],
            vec!["n1"],
        );
        config.limits.max_steps = 0;
        config.limits.max_time_s = 0;
        assert!(validate_graph_config(&config).is_empty());
    }

    #[test]
    fn limit_exceeding_its_documented_ceiling_is_flagged() {
        let mut config = base_config(
            vec![transform_node("n1")],
            vec![Edge {
                from_node: "n1".to_string(),
                to_node: "END".to_string(),
                when: None,
                priority: 0,
                label: None,
            }],
            vec!["n1"],
        );
        config.limits.max_time_s = 999_999_999;
        let errors = validate_graph_config(&config);
        assert!(errors.iter().any(|e| e.code == ValidationErrorCode::LimitOutOfRange && e.path == "limits.max_time_s"));
    }

    #[test]
    fn max_concurrency_of_zero_is_flagged() {
        let mut config = base_config(
            vec![transform_node("n1")],
            vec![Edge {
                from_node: "n1".to_string(),
                to_node: "END".to_string(),
                when: None,
                priority: 0,
                label: None,
            }],
            vec!["n1"],
        );
        config.limits.max_concurrency = 0;
        let errors = validate_graph_config(&config);
        assert!(errors.iter().any(|e| e.code == ValidationErrorCode::LimitOutOfRange && e.path == "limits.max_concurrency"));
    }

    #[test]
    fn tool_timeout_of_zero_is_flagged() {
        let config = base_config(
            vec![tool_node("t1", 0)],
            vec![Edge {
                from_node: "t1".to_string(),
                to_node: "END".to_string(),
                when: None,
                priority: 0,
                label: None,
            }],
            vec!["t1"],
        );
        let errors = validate_graph_config(&config);
        assert!(errors
            .iter()
            .any(|e| e.code == ValidationErrorCode::ToolTimeoutOutOfRange && e.path == "graph.nodes[0].config.timeout_seconds"));
    }

    #[test]
    fn tool_timeout_within_range_is_accepted() {
        let config = base_config(
            vec![tool_node("t1", 30)],
            vec![Edge {
                from_node: "t1".to_string(),
                to_node: "END".to_string(),
                when: None,
                priority: 0,
                label: None,
            }],
            vec!["t1"],
        );
        assert!(validate_graph_config(&config).is_empty());
    }
}
