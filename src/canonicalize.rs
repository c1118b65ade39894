//! Deterministic canonical ordering for a [`GraphConfig`].
//!
//! Two configs that differ only in node/edge/entrypoint order are the same
//! graph. Canonicalization sorts all three into a stable order so content
//! hashing, diffing, and round-trip equality checks all agree.

use crate::ir::{BuiltinEdgeCondition, Edge, EdgeWhen, GraphConfig};

fn when_sort_key(when: &Option<EdgeWhen>) -> (u8, String, String, String) {
    match when {
        None => (0, String::new(), String::new(), String::new()),
        Some(EdgeWhen::Builtin(cond)) => {
            let label = match cond {
                BuiltinEdgeCondition::HasToolCalls => "has_tool_calls",
                BuiltinEdgeCondition::NoToolCalls => "no_tool_calls",
            };
            (1, label.to_string(), String::new(), String::new())
        }
        Some(EdgeWhen::Custom(pred)) => {
            let operator = serde_json::to_string(&pred.operator).unwrap_or_default();
            let value = serde_json::to_string(&pred.value).unwrap_or_default();
            (2, pred.state_path.clone(), operator, value)
        }
    }
}

fn edge_sort_key(edge: &Edge) -> (String, i64, u8, String, String, String, String) {
    let (when_type, when_path, when_operator, when_value) = when_sort_key(&edge.when);
    (
        edge.from_node.clone(),
        -i64::from(edge.priority),
        when_type,
        when_path,
        when_operator,
        when_value,
        edge.to_node.clone(),
    )
}

/// Return a canonical form of `config`: nodes sorted by id, edges sorted by
/// `(from_node, -priority, when, to_node)`, entrypoints sorted
/// lexicographically.
#[must_use]
pub fn canonicalize_graph_config(mut config: GraphConfig) -> GraphConfig {
    config.graph.nodes.sort_by(|a, b| a.id.cmp(&b.id));
    config
        .graph
        .edges
        .sort_by(|a, b| edge_sort_key(a).cmp(&edge_sort_key(b)));
    config.graph.entrypoints.sort();
    config
}

/// Parse then canonicalize in one step.
pub fn parse_and_canonicalize_graph_config(
    raw: &serde_json::Value,
) -> Result<GraphConfig, crate::parser::ParseError> {
    let parsed = crate::parser::parse_graph_config(raw)?;
    Ok(canonicalize_graph_config(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(id: &str) -> crate::ir::Node {
        crate::ir::Node {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            reads: vec![],
            writes: vec![],
            kind: crate::ir::NodeKind::Transform(crate::ir::TransformNodeConfig {
                template: "x".to_string(),
                output_key: "out".to_string(),
                input_keys: vec![],
            }),
        }
    }

    #[test]
    fn sorts_nodes_by_id() {
        let raw = json!({
            "schema_version": "3.0",
            "key": "demo",
            "graph": {
                "nodes": [],
                "edges": [],
                "entrypoints": ["b", "a"],
            },
        });
        let mut config: GraphConfig = serde_json::from_value(raw).unwrap();
        config.graph.nodes = vec![node("zeta"), node("alpha")];
        let canonical = canonicalize_graph_config(config);
        assert_eq!(canonical.graph.nodes[0].id, "alpha");
        assert_eq!(canonical.graph.entrypoints, vec!["a", "b"]);
    }

    #[test]
    fn sorts_edges_by_source_then_descending_priority() {
        let mut config = GraphConfig {
            schema_version: "3.0".to_string(),
            key: "demo".to_string(),
            revision: 1,
            graph: crate::ir::GraphIr {
                nodes: vec![],
                edges: vec![
                    Edge {
                        from_node: "a".to_string(),
                        to_node: "c".to_string(),
                        when: None,
                        priority: 0,
                        label: None,
                    },
                    Edge {
                        from_node: "a".to_string(),
                        to_node: "b".to_string(),
                        when: None,
                        priority: 5,
                        label: None,
                    },
                ],
                entrypoints: vec!["a".to_string()],
            },
            state: crate::ir::StateContract::default(),
            deps: None,
            limits: crate::ir::Limits::default(),
            metadata: None,
            ui: None,
        };
        config = canonicalize_graph_config(config);
        assert_eq!(config.graph.edges[0].to_node, "b");
        assert_eq!(config.graph.edges[1].to_node, "c");
    }
}
