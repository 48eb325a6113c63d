//! Model session: lifecycle, tool-call bookkeeping and providers.

pub mod errors;
mod openai;
mod provider;
mod session;
pub mod types;

pub use errors::ModelError;
pub use openai::OpenAiProvider;
pub use provider::{ModelLink, ModelProvider};
pub use session::{ModelSession, SessionEvents};
pub use types::{
    AgentConfig, CloseReason, Drain, ModelCommand, ProviderEvent, SessionBinding, SessionEvent,
    SessionState, Submission,
};
