//! Tool-related types.

use conversation::{Content, Turn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{FieldViolation, ToolError};

/// A tool definition exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    /// Arguments exactly as the model sent them (a JSON object, as text).
    pub arguments: String,
}

/// What a tool produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolOutput {
    Text { text: String },
    Structured { value: Value },
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn structured(value: Value) -> Self {
        Self::Structured { value }
    }
}

impl From<ToolOutput> for Content {
    fn from(output: ToolOutput) -> Self {
        match output {
            ToolOutput::Text { text } => Content::Text { text },
            ToolOutput::Structured { value } => Content::Structured { value },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Duplicate,
    InvalidSchema,
    UnknownTool,
    InvalidArguments,
    ExecutionFailed,
    TimedOut,
}

/// Summary of a failed dispatch, in the shape the model receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldViolation>,
}

impl From<&ToolError> for ToolFailure {
    fn from(error: &ToolError) -> Self {
        let (kind, upstream_status, violations) = match error {
            ToolError::Duplicate(_) => (FailureKind::Duplicate, None, Vec::new()),
            ToolError::InvalidSchema { .. } => (FailureKind::InvalidSchema, None, Vec::new()),
            ToolError::Unknown(_) => (FailureKind::UnknownTool, None, Vec::new()),
            ToolError::InvalidArguments { violations, .. } => {
                (FailureKind::InvalidArguments, None, violations.clone())
            }
            ToolError::Execution { source, .. } => (FailureKind::ExecutionFailed, source.status, Vec::new()),
            ToolError::Timeout { .. } => (FailureKind::TimedOut, None, Vec::new()),
        };
        Self {
            kind,
            message: error.to_string(),
            upstream_status,
            violations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { output: ToolOutput },
    Error { error: ToolFailure },
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: &'a ToolFailure,
}

impl ToolOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error { .. })
    }

    /// Text handed to the model as the function call output.
    ///
    /// Failures are rendered as `{"error": {...}}` so the model can tell them
    /// apart from tool text.
    pub fn render(&self) -> String {
        match self {
            ToolOutcome::Success {
                output: ToolOutput::Text { text },
            } => text.clone(),
            ToolOutcome::Success {
                output: ToolOutput::Structured { value },
            } => value.to_string(),
            ToolOutcome::Error { error } => serde_json::to_string(&ErrorEnvelope { error })
                .unwrap_or_else(|_| error.message.clone()),
        }
    }
}

/// Result of one dispatch, correlated with the model's call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn success(call_id: impl Into<String>, output: ToolOutput) -> Self {
        Self {
            call_id: call_id.into(),
            outcome: ToolOutcome::Success { output },
        }
    }

    pub fn error(call_id: impl Into<String>, error: &ToolError) -> Self {
        Self {
            call_id: call_id.into(),
            outcome: ToolOutcome::Error {
                error: error.into(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome.is_error()
    }

    /// The tool-role turn this result represents.
    pub fn to_turn(&self) -> Turn {
        let content = match &self.outcome {
            ToolOutcome::Success { output } => output.clone().into(),
            ToolOutcome::Error { error } => serde_json::to_value(ErrorEnvelope { error })
                .map(Content::structured)
                .unwrap_or_else(|_| Content::text(error.message.clone())),
        };
        Turn::tool(self.call_id.clone(), content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ExecutionError;
    use conversation::Role;
    use serde_json::json;

    #[test]
    fn success_renders_text() {
        let result = ToolResult::success("call_1", ToolOutput::text("sunny"));
        assert!(!result.is_error());
        assert_eq!(result.outcome.render(), "sunny");

        let turn = result.to_turn();
        assert_eq!(turn.role, Role::Tool);
        assert_eq!(turn.call_id.as_deref(), Some("call_1"));
        assert_eq!(turn.text(), "sunny");
    }

    #[test]
    fn execution_failure_keeps_upstream_status() {
        let error = ToolError::Execution {
            tool: "weather".into(),
            source: ExecutionError::upstream(503, "Service Unavailable"),
        };
        let result = ToolResult::error("call_2", &error);
        let ToolOutcome::Error { error: failure } = &result.outcome else {
            panic!("expected error outcome");
        };
        assert_eq!(failure.kind, FailureKind::ExecutionFailed);
        assert_eq!(failure.upstream_status, Some(503));

        let rendered: Value = serde_json::from_str(&result.outcome.render()).unwrap();
        assert_eq!(rendered["error"]["kind"], "execution_failed");
        assert_eq!(rendered["error"]["upstream_status"], 503);
    }

    #[test]
    fn error_turn_is_structured() {
        let result = ToolResult::error("call_3", &ToolError::Unknown("teleport".into()));
        let turn = result.to_turn();
        assert_eq!(
            turn.content,
            Content::structured(json!({
                "error": {"kind": "unknown_tool", "message": "unknown tool: teleport"}
            }))
        );
    }
}
