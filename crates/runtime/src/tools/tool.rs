//! Tool trait and type-erased definitions.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::errors::ExecutionError;
use super::schema::ParameterSchema;
use super::types::{ToolOutput, ToolSpec};

/// A function the model can call.
///
/// `call` only ever receives arguments that passed `parameters()`
/// validation, deserialized into `Args`. Executors must report every failure
/// as an [`ExecutionError`]; the registry never sees a panic or a raw
/// transport error.
pub trait Tool: Send + Sync + 'static {
    type Args: DeserializeOwned + Send;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> ParameterSchema;

    fn call(
        &self,
        args: Self::Args,
    ) -> impl Future<Output = Result<ToolOutput, ExecutionError>> + Send;
}

pub(crate) enum CallError {
    /// Validated arguments did not deserialize into the tool's `Args`.
    Arguments(String),
    Failed(ExecutionError),
}

#[async_trait]
pub(crate) trait Executor: Send + Sync {
    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolOutput, CallError>;
}

struct TypedExecutor<T>(T);

#[async_trait]
impl<T: Tool> Executor for TypedExecutor<T> {
    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolOutput, CallError> {
        let args: T::Args = serde_json::from_value(Value::Object(arguments))
            .map_err(|e| CallError::Arguments(e.to_string()))?;
        self.0.call(args).await.map_err(CallError::Failed)
    }
}

struct FnExecutor<F>(F);

#[async_trait]
impl<F, Fut> Executor for FnExecutor<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ToolOutput, ExecutionError>> + Send,
{
    async fn execute(&self, arguments: Map<String, Value>) -> Result<ToolOutput, CallError> {
        (self.0)(arguments).await.map_err(CallError::Failed)
    }
}

/// A named tool ready to register.
#[derive(Clone)]
pub struct ToolDefinition {
    name: String,
    description: String,
    parameters: ParameterSchema,
    pub(crate) executor: Arc<dyn Executor>,
}

impl ToolDefinition {
    pub fn from_tool<T: Tool>(tool: T) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
            executor: Arc::new(TypedExecutor(tool)),
        }
    }

    /// Build a definition from a closure over the validated argument map.
    pub fn from_fn<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ParameterSchema,
        f: F,
    ) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput, ExecutionError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            executor: Arc::new(FnExecutor(f)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &ParameterSchema {
        &self.parameters
    }

    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.to_json_schema(),
        }
    }
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}
