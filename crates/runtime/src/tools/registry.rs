//! Name-indexed tool registry and dispatch.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;

use super::errors::{FieldViolation, ToolError};
use super::schema::Validator;
use super::tool::{CallError, ToolDefinition};
use super::types::{ToolCall, ToolOutput, ToolResult, ToolSpec};

/// Tools available to one agent, keyed by name.
///
/// Immutable once handed to an orchestrator; dispatch takes `&self` so one
/// registry can serve concurrent calls.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Registered>,
    call_timeout: Option<Duration>,
}

#[derive(Debug)]
struct Registered {
    definition: ToolDefinition,
    validator: Validator,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each executor run. `None` leaves calls unbounded.
    pub fn with_call_timeout(mut self, call_timeout: Option<Duration>) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Add a tool, compiling its parameter schema.
    pub fn register(&mut self, definition: ToolDefinition) -> Result<(), ToolError> {
        if self.tools.contains_key(definition.name()) {
            return Err(ToolError::Duplicate(definition.name().to_string()));
        }
        let validator = definition
            .parameters()
            .compile()
            .map_err(|reason| ToolError::InvalidSchema {
                tool: definition.name().to_string(),
                reason,
            })?;
        self.tools.insert(
            definition.name().to_string(),
            Registered {
                definition,
                validator,
            },
        );
        Ok(())
    }

    /// Specs of every registered tool, sorted by name.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<_> = self.tools.values().map(|t| t.definition.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|t| &t.definition)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate `raw_arguments` and run the named tool.
    ///
    /// An empty argument string is read as `{}`.
    pub async fn dispatch(&self, name: &str, raw_arguments: &str) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::Unknown(name.to_string()))?;

        let invalid = |violations| ToolError::InvalidArguments {
            tool: name.to_string(),
            violations,
        };

        let raw = raw_arguments.trim();
        let value: Value = if raw.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(raw)
                .map_err(|e| invalid(vec![FieldViolation::malformed(e.to_string())]))?
        };
        let arguments = tool.validator.validate(&value).map_err(invalid)?;

        let call = tool.definition.executor.execute(arguments);
        let result = match self.call_timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| ToolError::Timeout {
                    tool: name.to_string(),
                    after,
                })?,
            None => call.await,
        };

        result.map_err(|e| match e {
            CallError::Arguments(reason) => invalid(vec![FieldViolation::malformed(reason)]),
            CallError::Failed(source) => ToolError::Execution {
                tool: name.to_string(),
                source,
            },
        })
    }

    /// Dispatch a model call. Never fails: errors become an error outcome
    /// the model can react to.
    pub async fn dispatch_call(&self, call: &ToolCall) -> ToolResult {
        match self.dispatch(&call.name, &call.arguments).await {
            Ok(output) => {
                tracing::debug!(call_id = %call.call_id, tool = %call.name, "tool call succeeded");
                ToolResult::success(call.call_id.clone(), output)
            }
            Err(e) => {
                tracing::warn!(call_id = %call.call_id, tool = %call.name, error = %e, "tool call failed");
                ToolResult::error(call.call_id.clone(), &e)
            }
        }
    }
}
