//! Parley runtime: voice agent jobs, model sessions and the tool-call bridge.
//!
//! A worker takes jobs from a scheduler. Each job joins one room, waits for a
//! participant, opens a live session with a hosted model and relays between
//! the two until the participant leaves. Function calls issued by the model
//! are dispatched to a [`ToolRegistry`], and their results are returned to
//! the session as tool turns. A failing tool never ends the session.
//!
//! # Overview
//!
//! - **ToolRegistry**: named tools with parameter schemas. Each schema is
//!   compiled to JSON Schema at registration and arguments are validated
//!   against it before a tool runs. Every failure is reported as a
//!   structured result.
//! - **ModelSession**: lifecycle, pending tool calls and transcript of one
//!   model conversation, driven through a [`ModelProvider`].
//! - **Orchestrator**: runs one job end to end.
//! - **Worker**: runs many jobs concurrently from a [`JobSource`].
//!
//! # Example
//!
//! ```ignore
//! use runtime::{
//!     JobQueue, Job, OpenAiProvider, Orchestrator, RoomRef, ToolDefinition, ToolRegistry,
//!     WeatherTool, Worker, WorkerConfig,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(transport: impl runtime::RoomTransport + 'static) -> Result<(), runtime::ToolError> {
//! let mut registry = ToolRegistry::new();
//! registry.register(ToolDefinition::from_tool(WeatherTool::default()))?;
//!
//! let provider = OpenAiProvider::new(realtime::ClientConfig::new("sk-..."));
//! let orchestrator = Orchestrator::new(WorkerConfig::default(), registry, transport, provider);
//! let worker = Worker::new(orchestrator);
//!
//! let (queue, mut source) = JobQueue::channel();
//! queue.submit(Job::new(RoomRef::new("lobby")));
//! drop(queue);
//! worker.run(&mut source, CancellationToken::new()).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
pub mod job;
pub mod model;
mod orchestrator;
pub mod room;
pub mod tools;
mod worker;

pub use config::{AgentSettings, Timeouts, WorkerConfig};
pub use error::{Error, Result};
pub use job::{
    EndReason, Job, JobAssignment, JobId, JobOutcome, JobQueue, JobSource, JobState, QueueSource,
};
pub use model::{
    AgentConfig, CloseReason, Drain, ModelError, ModelLink, ModelProvider, ModelSession,
    OpenAiProvider, SessionBinding, SessionEvent, SessionEvents, SessionState, Submission,
};
pub use orchestrator::Orchestrator;
pub use room::{Participant, Room, RoomError, RoomEvent, RoomRef, RoomTransport};
pub use tools::{
    ExecutionError, Field, FieldType, ParameterSchema, Tool, ToolCall, ToolDefinition, ToolError,
    ToolOutcome, ToolOutput, ToolRegistry, ToolResult, ToolSpec, Validator, WeatherTool,
};
pub use worker::Worker;
