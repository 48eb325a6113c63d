//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration is invalid or missing required fields.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A built-in tool could not be registered.
    #[error(transparent)]
    Tool(#[from] runtime::ToolError),

    /// The job ran and failed.
    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// The worker stopped before the job was run.
    #[error("job {job_id} was never run")]
    JobNotRun { job_id: String },

    /// The in-process scheduler went away before the job was queued.
    #[error("job queue closed")]
    QueueClosed,

    /// Another TLS crypto provider was already installed.
    #[error("failed to install TLS crypto provider")]
    CryptoProvider,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
