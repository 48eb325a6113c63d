use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from registering or dispatching a tool.
///
/// Everything except the registration errors is recoverable: the bridge turns it into a
/// tool result so the model can explain the failure to the participant.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("tool already registered: {0}")]
    Duplicate(String),

    #[error("invalid parameter schema for {tool}: {reason}")]
    InvalidSchema { tool: String, reason: String },

    #[error("unknown tool: {0}")]
    Unknown(String),

    #[error("invalid arguments for {tool}: {}", join(.violations))]
    InvalidArguments {
        tool: String,
        violations: Vec<FieldViolation>,
    },

    #[error("{tool} failed: {source}")]
    Execution {
        tool: String,
        source: ExecutionError,
    },

    #[error("{tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },
}

fn join(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure reported by an executor, with the upstream status when the
/// failure came from an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub status: Option<u16>,
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = &self.message;
        match self.status {
            Some(status) => write!(f, "upstream returned {status}: {message}"),
            None => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ExecutionError {}

/// One field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field name, or `$` for the arguments object itself.
    pub field: String,
    #[serde(flatten)]
    pub problem: Problem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "problem", rename_all = "snake_case")]
pub enum Problem {
    Missing,
    WrongType { expected: String, found: String },
    NotInEnum { allowed: Vec<String>, found: String },
    NotAnObject { found: String },
    Malformed { reason: String },
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, problem: Problem) -> Self {
        Self {
            field: field.into(),
            problem,
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, Problem::Missing)
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::new(
            "$",
            Problem::Malformed {
                reason: reason.into(),
            },
        )
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let field = &self.field;
        match &self.problem {
            Problem::Missing => write!(f, "{field}: missing required field"),
            Problem::WrongType { expected, found } => {
                write!(f, "{field}: expected {expected}, found {found}")
            }
            Problem::NotInEnum { allowed, found } => {
                write!(f, "{field}: {found:?} is not one of {allowed:?}")
            }
            Problem::NotAnObject { found } => write!(f, "{field}: expected object, found {found}"),
            Problem::Malformed { reason } => write!(f, "{field}: {reason}"),
        }
    }
}

/// JSON type name used in violation messages.
pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn violation_serializes_flat() {
        let v = FieldViolation::new(
            "unit",
            Problem::NotInEnum {
                allowed: vec!["c".into(), "f".into()],
                found: "k".into(),
            },
        );
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!({"field": "unit", "problem": "not_in_enum", "allowed": ["c", "f"], "found": "k"})
        );
    }

    #[test]
    fn invalid_arguments_message_lists_fields() {
        let err = ToolError::InvalidArguments {
            tool: "weather".into(),
            violations: vec![FieldViolation::missing("location")],
        };
        assert_eq!(
            err.to_string(),
            "invalid arguments for weather: location: missing required field"
        );
    }

    #[test]
    fn execution_error_display_includes_status() {
        let err = ExecutionError::upstream(503, "Service Unavailable");
        assert_eq!(err.to_string(), "upstream returned 503: Service Unavailable");
        assert_eq!(ExecutionError::new("dns failure").to_string(), "dns failure");
    }
}
