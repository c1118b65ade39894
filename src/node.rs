//! The compiled step contract.
//!
//! The [`compiler`](crate::compiler) lowers each IR node into an
//! `Arc<dyn Node>` step function. Runtime execution (see [`crate::runtime`])
//! invokes these concurrently within a superstep and merges their
//! [`NodePartial`] outputs at the following barrier.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::channels::errors::ErrorEvent;
use crate::message::Message;
use crate::state::StateSnapshot;

/// Runtime-provided context for a single node invocation.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// The IR node id this invocation corresponds to.
    pub node_id: String,
    /// The superstep number this invocation occurred in.
    pub step: u64,
}

impl NodeContext {
    #[must_use]
    pub fn new(node_id: impl Into<String>, step: u64) -> Self {
        Self {
            node_id: node_id.into(),
            step,
        }
    }
}

/// Partial state update a node step wants merged at the next barrier.
///
/// All fields are optional: a node that only wants to route doesn't need to
/// populate any of them.
///
/// # Examples
/// ```
/// use flowforge::node::NodePartial;
/// use flowforge::message::Message;
///
/// let partial = NodePartial::new().with_messages(vec![Message::assistant("done")]);
/// assert!(partial.extra.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct NodePartial {
    pub messages: Option<Vec<Message>>,
    pub extra: Option<FxHashMap<String, Value>>,
    pub errors: Option<Vec<ErrorEvent>>,
}

impl NodePartial {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: FxHashMap<String, Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<ErrorEvent>) -> Self {
        self.errors = Some(errors);
        self
    }
}

/// Fatal errors that abort a node's step and, per the runtime's exit
/// conditions, the whole run with `node_failed`.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    #[error("missing expected input: {what}")]
    #[diagnostic(code(flowforge::node::missing_input))]
    MissingInput { what: &'static str },

    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(flowforge::node::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error(transparent)]
    #[diagnostic(code(flowforge::node::serde_json))]
    Serde(#[from] serde_json::Error),

    #[error("validation failed: {0}")]
    #[diagnostic(code(flowforge::node::validation))]
    ValidationFailed(String),
}

/// A compiled, executable unit of work. One instance per IR node.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError>;
}
