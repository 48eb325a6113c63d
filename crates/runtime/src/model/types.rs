//! Model session types.

use conversation::Turn;

use crate::room::{Participant, RoomRef};
use crate::tools::{ToolCall, ToolResult, ToolSpec};

/// Lifecycle of a model session.
///
/// `Uninitialized -> Connecting -> Active -> Closing -> Closed`, and any
/// state may drop straight to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Uninitialized,
    Connecting,
    Active,
    Closing,
    Closed,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Uninitialized, Connecting)
                | (Connecting, Active)
                | (Active, Closing)
                | (Closing, Closed)
                | (Uninitialized | Connecting | Active, Closed)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Instructions and tools for one session. Built once per job.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub instructions: String,
    pub tools: Vec<ToolSpec>,
}

/// The room and participant a session serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBinding {
    pub room: RoomRef,
    pub participant: Participant,
}

/// Operations sent to the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelCommand {
    CreateTurn(Turn),
    SubmitToolResult(ToolResult),
    RequestResponse,
    Close,
}

/// What a provider reports from the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    ToolCall(ToolCall),
    Turn(Turn),
    /// A non-fatal error reported by the model.
    Error(String),
    /// The remote side ended the session.
    Closed(CloseReason),
}

/// Events a session emits to its owner, in model order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ToolCallRequested(ToolCall),
    TurnProduced(Turn),
    /// The session ended without being asked to.
    Closed(CloseReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    TransportLost,
    Remote(String),
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::TransportLost => f.write_str("transport lost"),
            CloseReason::Remote(reason) => write!(f, "closed by model: {reason}"),
        }
    }
}

/// Result of `submit_tool_result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Sent to the model. `remaining` calls are still unanswered.
    Delivered { remaining: usize },
    /// The call was unknown, already answered, or the session is closed.
    /// Nothing was sent.
    Stale,
}

/// How `close` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Every pending call was answered first.
    Graceful,
    /// The drain timeout elapsed with calls still pending.
    Forced { abandoned: usize },
    AlreadyClosed,
}
