//! Versioned state channels.
//!
//! Each channel owns one slice of [`crate::state::ExecutionState`] and
//! tracks a monotonic version bumped only when a barrier merge actually
//! changes its content (see [`crate::runtime::apply_barrier`]).

pub mod errors;

use crate::message::Message;
use errors::ErrorEvent;
use rustc_hash::FxHashMap;
use serde_json::Value;

/// Common interface shared by all state channels.
pub trait Channel {
    type Item;

    fn version(&self) -> u32;
    fn set_version(&mut self, version: u32);
    fn get_mut(&mut self) -> &mut Self::Item;
    fn snapshot(&self) -> Self::Item;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessagesChannel {
    messages: Vec<Message>,
    version: u32,
}

impl MessagesChannel {
    #[must_use]
    pub fn new(messages: Vec<Message>, version: u32) -> Self {
        Self { messages, version }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Channel for MessagesChannel {
    type Item = Vec<Message>;

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn get_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }

    fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }
}

pub type ExtraMap = FxHashMap<String, Value>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtrasChannel {
    extra: ExtraMap,
    version: u32,
}

impl ExtrasChannel {
    #[must_use]
    pub fn new(extra: ExtraMap, version: u32) -> Self {
        Self { extra, version }
    }
}

impl Channel for ExtrasChannel {
    type Item = ExtraMap;

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn get_mut(&mut self) -> &mut ExtraMap {
        &mut self.extra
    }

    fn snapshot(&self) -> ExtraMap {
        self.extra.clone()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorsChannel {
    errors: Vec<ErrorEvent>,
    version: u32,
}

impl ErrorsChannel {
    #[must_use]
    pub fn new(errors: Vec<ErrorEvent>, version: u32) -> Self {
        Self { errors, version }
    }
}

impl Channel for ErrorsChannel {
    type Item = Vec<ErrorEvent>;

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }

    fn get_mut(&mut self) -> &mut Vec<ErrorEvent> {
        &mut self.errors
    }

    fn snapshot(&self) -> Vec<ErrorEvent> {
        self.errors.clone()
    }
}

/// Construct an empty extras map using the crate's preferred hasher.
#[must_use]
pub fn new_extra_map() -> ExtraMap {
    FxHashMap::default()
}
