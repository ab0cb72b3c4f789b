//! Conversation turn model shared with the annotator

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One message in the conversation sent to the annotator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Accept loosely-typed history entries: objects with string `role` and `content`
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let role = obj.get("role")?.as_str()?;
        let content = obj.get("content")?.as_str()?;
        Some(Self::new(role, content))
    }
}

/// What the annotator said: a reply for the user plus raw, unvalidated signals
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotatorReply {
    pub assistant_message: String,
    /// Question id → whatever the annotator emitted; normalize before use
    pub signals: Map<String, Value>,
}
