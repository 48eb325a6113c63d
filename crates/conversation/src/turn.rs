//! Turn types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Assistant,
    User,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Assistant => "assistant",
            Role::User => "user",
            Role::Tool => "tool",
        };
        f.write_str(s)
    }
}

/// The body of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
    Structured { value: Value },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn structured(value: Value) -> Self {
        Self::Structured { value }
    }

    /// Render the content as text. Structured values are serialized as JSON.
    pub fn render(&self) -> String {
        match self {
            Content::Text { text } => text.clone(),
            Content::Structured { value } => value.to_string(),
        }
    }
}

/// One entry in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Content,
    /// Identifier the model assigned to this item, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// Tool call this turn answers. Only set on tool turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: Content) -> Self {
        Self {
            role,
            content,
            item_id: None,
            call_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Content::text(text))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Content::text(text))
    }

    /// A tool-role turn answering `call_id`.
    pub fn tool(call_id: impl Into<String>, content: Content) -> Self {
        Self {
            call_id: Some(call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    pub fn with_item_id(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    /// Text rendering of the content.
    pub fn text(&self) -> String {
        self.content.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn tool_turn_carries_call_id() {
        let turn = Turn::tool("call_1", Content::text("sunny"));
        assert_eq!(turn.role, Role::Tool);
        assert_eq!(turn.call_id.as_deref(), Some("call_1"));
        assert_eq!(turn.text(), "sunny");
    }

    #[test]
    fn structured_content_renders_as_json() {
        let turn = Turn::tool("call_2", Content::structured(json!({"temp": 21})));
        assert_eq!(turn.text(), r#"{"temp":21}"#);
    }

    #[test]
    fn content_is_tagged() {
        let value = serde_json::to_value(Content::text("hi")).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "hi"}));
    }
}
