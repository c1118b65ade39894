//! Message and role types used throughout graph execution.
//!
//! Messages are the primary unit of conversational state passed between
//! `llm` and `component` nodes. Roles are a closed, well-known set plus an
//! escape hatch for custom tags (e.g. `"tool"`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The sender of a [`Message`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    /// Any role outside the closed set (e.g. `"tool"`, `"function"`).
    Custom(String),
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Custom(s) => s.as_str(),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            other => Role::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message in a conversation, containing a role and text content.
///
/// Messages carry an optional stable `id`, used by the `add_messages`
/// reducer to deduplicate re-delivered messages across batches.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Message {
    pub const USER: &'static str = "user";
    pub const ASSISTANT: &'static str = "assistant";
    pub const SYSTEM: &'static str = "system";

    #[must_use]
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            id: None,
        }
    }

    #[must_use]
    pub fn with_role(role: Role, content: &str) -> Self {
        Self::new(role.as_str(), content)
    }

    #[must_use]
    pub fn user(content: &str) -> Self {
        Self::new(Self::USER, content)
    }

    #[must_use]
    pub fn assistant(content: &str) -> Self {
        Self::new(Self::ASSISTANT, content)
    }

    #[must_use]
    pub fn system(content: &str) -> Self {
        Self::new(Self::SYSTEM, content)
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convenience_constructors_set_role_and_content() {
        let msg = Message::user("hi");
        assert_eq!(msg.role, Message::USER);
        assert_eq!(msg.content, "hi");
        assert!(msg.id.is_none());
    }

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!(Role::from("assistant"), Role::Assistant);
        assert_eq!(Role::from("tool").as_str(), "tool");
    }

    #[test]
    fn has_role_checks_exact_match() {
        let msg = Message::system("go");
        assert!(msg.has_role(Message::SYSTEM));
        assert!(!msg.has_role(Message::USER));
    }

    #[test]
    fn serialization_round_trip_preserves_id() {
        let msg = Message::assistant("done").with_id("m-1");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
