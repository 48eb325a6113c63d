//! Tool registry, parameter schemas and built-in tools.

pub mod errors;
mod registry;
mod schema;
mod tool;
pub mod types;
mod weather;

pub use errors::{ExecutionError, FieldViolation, Problem, ToolError};
pub use registry::ToolRegistry;
pub use schema::{Field, FieldType, ParameterSchema, Validator};
pub use tool::{Tool, ToolDefinition};
pub use types::{FailureKind, ToolCall, ToolFailure, ToolOutcome, ToolOutput, ToolResult, ToolSpec};
pub use weather::{WTTR_URL, WeatherArgs, WeatherTool};
