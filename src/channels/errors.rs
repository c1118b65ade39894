//! Structured, non-fatal error events carried on the errors channel.
//!
//! A [`NodeError`](crate::node::NodeError) aborts a node's step outright.
//! An [`ErrorEvent`] is a recoverable diagnostic a node chooses to record
//! and keep going; the runtime never treats these as step failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ErrorEvent {
    #[serde(default = "chrono::Utc::now")]
    pub when: DateTime<Utc>,
    #[serde(default)]
    pub scope: ErrorScope,
    #[serde(default)]
    pub error: LadderError,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl ErrorEvent {
    pub fn node<S: Into<String>>(kind: S, step: u64, error: LadderError) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Node {
                kind: kind.into(),
                step,
            },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    pub fn runner<S: Into<String>>(run_id: S, step: u64, error: LadderError) -> Self {
        Self {
            when: Utc::now(),
            scope: ErrorScope::Runner {
                run_id: run_id.into(),
                step,
            },
            error,
            tags: Vec::new(),
            context: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ErrorScope {
    Node {
        kind: String,
        step: u64,
    },
    Runner {
        run_id: String,
        step: u64,
    },
    #[default]
    Runtime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LadderError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<LadderError>>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl Default for LadderError {
    fn default() -> Self {
        LadderError {
            message: String::new(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }
}

impl std::fmt::Display for LadderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LadderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c as &dyn std::error::Error)
    }
}

impl LadderError {
    pub fn msg<M: Into<String>>(m: M) -> Self {
        LadderError {
            message: m.into(),
            cause: None,
            details: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_cause(mut self, cause: LadderError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

/// Render error events as plain, human-readable lines (one block per event).
pub fn pretty_print(events: &[ErrorEvent]) -> String {
    let mut out = String::new();
    for (i, e) in events.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("[{}] {} | {:?}\n", i, e.when, e.scope));
        out.push_str(&format!("  error: {}\n", e.error.message));
        let mut cause = e.error.cause.as_deref();
        let mut indent = 1;
        while let Some(c) = cause {
            out.push_str(&format!("{}cause: {}\n", "  ".repeat(indent + 1), c.message));
            cause = c.cause.as_deref();
            indent += 1;
        }
        if !e.tags.is_empty() {
            out.push_str(&format!("  tags: {:?}\n", e.tags));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_constructor_sets_scope() {
        let e = ErrorEvent::node("validator", 2, LadderError::msg("bad edge"));
        assert_eq!(e.scope, ErrorScope::Node { kind: "validator".into(), step: 2 });
    }

    #[test]
    fn pretty_print_includes_cause_chain() {
        let inner = LadderError::msg("root cause");
        let err = LadderError::msg("outer").with_cause(inner);
        let e = ErrorEvent::node("x", 0, err);
        let rendered = pretty_print(&[e]);
        assert!(rendered.contains("outer"));
        assert!(rendered.contains("root cause"));
    }
}
