//! UI-agnostic conversation data types
//!
//! Messages are kept exactly as the server sent them so that the history
//! echoed back on the next send is the server's own. Presentation code goes
//! through [`ChatMessage::display_role`] and [`ChatMessage::display_content`]
//! (or [`render_history`]), which never fail and always yield plain strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A chat message in the conversation, as stored by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub role: Value,
    #[serde(default)]
    pub content: Value,
    /// Fields we don't model, kept so the message round-trips unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The role of a chat message sender, as far as rendering is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: Value::String(role.as_str().to_string()),
            content: Value::String(content.into()),
            extra: Map::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    /// Anything other than the exact string `"user"` renders as the assistant.
    pub fn display_role(&self) -> ChatRole {
        match self.role.as_str() {
            Some("user") => ChatRole::User,
            _ => ChatRole::Assistant,
        }
    }

    pub fn display_content(&self) -> String {
        display_text(&self.content)
    }
}

/// Coerce an arbitrary JSON value into display text.
///
/// `null` becomes the empty string, strings are used as-is and everything
/// else is rendered as compact JSON (`42` -> `"42"`).
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Stable key for a rendered message: the server id when there is one,
/// otherwise the position in the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Id(i64),
    Index(usize),
}

/// A message ready for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub key: MessageKey,
    pub role: ChatRole,
    pub content: String,
}

pub fn render_history(history: &[ChatMessage]) -> Vec<RenderedMessage> {
    history
        .iter()
        .enumerate()
        .map(|(idx, message)| RenderedMessage {
            key: message
                .id
                .map(MessageKey::Id)
                .unwrap_or(MessageKey::Index(idx)),
            role: message.display_role(),
            content: message.display_content(),
        })
        .collect()
}
