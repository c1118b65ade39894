//! Versioned execution state shared across a graph run.
//!
//! [`ExecutionState`] is the mutable container the runtime owns between
//! supersteps. Nodes never see it directly; they receive a [`StateSnapshot`]
//! taken at the start of a superstep and return a [`crate::node::NodePartial`]
//! describing the change they want applied. See [`crate::runtime::apply_barrier`]
//! for how partials from a batch are merged back in.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::channels::errors::ErrorEvent;
use crate::channels::{Channel, ErrorsChannel, ExtraMap, ExtrasChannel, MessagesChannel};
use crate::message::{Message, Role};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionState {
    pub messages: MessagesChannel,
    pub extra: ExtrasChannel,
    pub errors: ErrorsChannel,
}

/// Immutable, point-in-time view of [`ExecutionState`] passed to node steps.
#[derive(Clone, Debug)]
pub struct StateSnapshot {
    pub messages: Vec<Message>,
    pub messages_version: u32,
    pub extra: FxHashMap<String, Value>,
    pub extra_version: u32,
    pub errors: Vec<ErrorEvent>,
    pub errors_version: u32,
}

impl ExecutionState {
    /// The state a fresh run starts from: a single user message, empty
    /// `extra`/`errors`, every channel at version 1.
    pub fn new_with_user_message(user_text: &str) -> Self {
        Self::new_with_messages(vec![Message::with_role(Role::User, user_text)])
    }

    pub fn new_with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: MessagesChannel::new(messages, 1),
            extra: ExtrasChannel::default(),
            errors: ErrorsChannel::default(),
        }
    }

    pub fn builder() -> ExecutionStateBuilder {
        ExecutionStateBuilder::default()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            messages: self.messages.snapshot(),
            messages_version: self.messages.version(),
            extra: self.extra.snapshot(),
            extra_version: self.extra.version(),
            errors: self.errors.snapshot(),
            errors_version: self.errors.version(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ExecutionStateBuilder {
    messages: Vec<Message>,
    extra: ExtraMap,
}

impl ExecutionStateBuilder {
    #[must_use]
    pub fn with_user_message(mut self, content: &str) -> Self {
        self.messages.push(Message::with_role(Role::User, content));
        self
    }

    #[must_use]
    pub fn with_system_message(mut self, content: &str) -> Self {
        self.messages
            .push(Message::with_role(Role::System, content));
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn build(self) -> ExecutionState {
        ExecutionState {
            messages: MessagesChannel::new(self.messages, 1),
            extra: ExtrasChannel::new(self.extra, 1),
            errors: ErrorsChannel::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_with_user_message_seeds_one_message_at_version_one() {
        let state = ExecutionState::new_with_user_message("hi");
        let snap = state.snapshot();
        assert_eq!(snap.messages.len(), 1);
        assert_eq!(snap.messages_version, 1);
        assert!(snap.extra.is_empty());
    }

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let mut state = ExecutionState::new_with_user_message("hi");
        state
            .extra
            .get_mut()
            .insert("k".into(), serde_json::json!(1));
        let snap = state.snapshot();
        state.extra.get_mut().clear();
        assert_eq!(snap.extra.get("k"), Some(&serde_json::json!(1)));
        assert!(state.extra.snapshot().is_empty());
    }

    #[test]
    fn builder_composes_messages_and_extra() {
        let state = ExecutionState::builder()
            .with_system_message("sys")
            .with_user_message("hi")
            .with_extra("a", serde_json::json!(true))
            .build();
        let snap = state.snapshot();
        assert_eq!(snap.messages.len(), 2);
        assert_eq!(snap.extra.len(), 1);
    }
}
