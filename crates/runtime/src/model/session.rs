//! Live model session.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use conversation::{SessionId, Transcript, Turn};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::timeout;

use super::errors::ModelError;
use super::provider::{ModelLink, ModelProvider};
use super::types::{
    AgentConfig, CloseReason, Drain, ModelCommand, ProviderEvent, SessionBinding, SessionEvent,
    SessionState, Submission,
};
use crate::room::Participant;
use crate::tools::{ToolCall, ToolResult};

const EVENT_CAPACITY: usize = 64;

/// Tool calls the model is waiting on.
#[derive(Debug, Default)]
struct Pending {
    calls: HashSet<String>,
    /// Results claimed from `calls` but not yet handed to the provider.
    delivering: usize,
}

impl Pending {
    fn is_drained(&self) -> bool {
        self.calls.is_empty() && self.delivering == 0
    }
}

struct Inner {
    id: SessionId,
    binding: SessionBinding,
    state: watch::Sender<SessionState>,
    pending: watch::Sender<Pending>,
    commands: OnceLock<mpsc::Sender<ModelCommand>>,
    transcript: Mutex<Transcript>,
}

impl Inner {
    /// Force `Closed`, forgetting pending calls. Returns the previous state.
    fn mark_closed(&self) -> SessionState {
        let mut previous = SessionState::Closed;
        self.state.send_if_modified(|state| {
            previous = *state;
            *state = SessionState::Closed;
            previous != SessionState::Closed
        });
        self.pending.send_modify(|pending| pending.calls.clear());
        if previous != SessionState::Closed {
            tracing::debug!(session_id = %self.id, from = %previous, "session closed");
        }
        previous
    }
}

/// Receives the session's events in the order the model produced them.
///
/// A tool call becomes pending only once it is read here, so a call that
/// was queued but never read does not hold up `close`.
pub struct SessionEvents {
    inner: Arc<Inner>,
    events: mpsc::Receiver<SessionEvent>,
}

impl std::fmt::Debug for SessionEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEvents")
            .field("session_id", &self.inner.id)
            .finish_non_exhaustive()
    }
}

impl SessionEvents {
    /// `None` once the session has closed and every event was read.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        let event = self.events.recv().await?;
        Some(self.take(event))
    }

    /// The next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        let event = self.events.try_recv().ok()?;
        Some(self.take(event))
    }

    fn take(&self, event: SessionEvent) -> SessionEvent {
        if let SessionEvent::ToolCallRequested(call) = &event {
            if *self.inner.state.borrow() != SessionState::Closed {
                self.inner.pending.send_modify(|pending| {
                    pending.calls.insert(call.call_id.clone());
                });
            }
        }
        event
    }
}

/// Handle to one model session. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct ModelSession {
    inner: Arc<Inner>,
}

impl ModelSession {
    pub fn new(binding: SessionBinding) -> Self {
        let id = SessionId::new();
        let (state, _) = watch::channel(SessionState::Uninitialized);
        let (pending, _) = watch::channel(Pending::default());
        Self {
            inner: Arc::new(Inner {
                id,
                binding,
                state,
                pending,
                commands: OnceLock::new(),
                transcript: Mutex::new(Transcript::new(id)),
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn participant(&self) -> &Participant {
        &self.inner.binding.participant
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the transcript: every turn the model stream produced, in
    /// receipt order.
    pub async fn transcript(&self) -> Transcript {
        self.inner.transcript.lock().await.clone()
    }

    /// Connect through `provider` and start relaying events.
    ///
    /// The handshake is bounded by `connect_timeout`. On failure the session
    /// ends up `Closed`.
    pub async fn start<P: ModelProvider>(
        &self,
        provider: &P,
        config: &AgentConfig,
        connect_timeout: Duration,
    ) -> Result<SessionEvents, ModelError> {
        self.transition("start", SessionState::Connecting)?;
        tracing::info!(
            session_id = %self.inner.id,
            room = %self.inner.binding.room,
            participant = %self.inner.binding.participant.identity,
            "starting model session"
        );

        let connect = provider.connect(config, &self.inner.binding);
        let link = match timeout(connect_timeout, connect).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                self.inner.mark_closed();
                return Err(e);
            }
            Err(_) => {
                self.inner.mark_closed();
                return Err(ModelError::HandshakeTimeout(connect_timeout));
            }
        };

        let ModelLink { commands, events } = link;
        if self.inner.commands.set(commands).is_err() {
            return Err(ModelError::InvalidState {
                op: "start",
                state: self.state(),
            });
        }
        self.transition("start", SessionState::Active)?;

        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        tokio::spawn(pump(self.inner.clone(), events, tx));
        Ok(SessionEvents {
            inner: self.inner.clone(),
            events: rx,
        })
    }

    /// Inject a turn into the conversation.
    pub async fn create_turn(&self, turn: Turn) -> Result<(), ModelError> {
        self.require_active("create a turn")?;
        self.send(ModelCommand::CreateTurn(turn)).await
    }

    /// Ask the model to generate a response from the current context.
    pub async fn request_response(&self) -> Result<(), ModelError> {
        self.require_active("request a response")?;
        self.send(ModelCommand::RequestResponse).await
    }

    /// Answer a pending tool call.
    ///
    /// Results for calls that are unknown, already answered, or belong to a
    /// closed session are dropped with a warning.
    pub async fn submit_tool_result(&self, result: ToolResult) -> Submission {
        let mut remaining = None;
        self.inner.pending.send_if_modified(|pending| {
            if pending.calls.remove(&result.call_id) {
                pending.delivering += 1;
                remaining = Some(pending.calls.len());
                true
            } else {
                false
            }
        });

        let Some(remaining) = remaining else {
            tracing::warn!(
                session_id = %self.inner.id,
                call_id = %result.call_id,
                state = %self.state(),
                "discarding stale tool result"
            );
            return Submission::Stale;
        };

        let sent = self
            .send(ModelCommand::SubmitToolResult(result))
            .await
            .is_ok();
        self.inner
            .pending
            .send_modify(|pending| pending.delivering -= 1);

        if sent {
            Submission::Delivered { remaining }
        } else {
            tracing::warn!(session_id = %self.inner.id, "model went away before tool result was sent");
            Submission::Stale
        }
    }

    /// Close the session, waiting up to `drain_timeout` for pending tool
    /// calls to be answered.
    pub async fn close(&self, drain_timeout: Duration) -> Drain {
        if let Err(e) = self.transition("close", SessionState::Closing) {
            return match self.state() {
                SessionState::Closing | SessionState::Closed => Drain::AlreadyClosed,
                _ => {
                    tracing::debug!(error = %e, "closing session that never became active");
                    self.inner.mark_closed();
                    Drain::Graceful
                }
            };
        }

        let mut pending = self.inner.pending.subscribe();
        let drained = timeout(drain_timeout, async {
            pending.wait_for(Pending::is_drained).await.map(|_| ())
        })
        .await;

        let drain = match drained {
            Ok(_) => Drain::Graceful,
            Err(_) => {
                let abandoned = self.inner.pending.borrow().calls.len();
                tracing::warn!(
                    session_id = %self.inner.id,
                    abandoned,
                    "drain timed out, forcing close"
                );
                Drain::Forced { abandoned }
            }
        };

        self.inner.mark_closed();
        if let Some(commands) = self.inner.commands.get() {
            let _ = commands.send(ModelCommand::Close).await;
        }
        tracing::info!(session_id = %self.inner.id, ?drain, "model session closed");
        drain
    }

    fn transition(&self, op: &'static str, next: SessionState) -> Result<(), ModelError> {
        let mut result = Ok(());
        self.inner.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                result = Err(ModelError::InvalidState { op, state: *state });
                false
            }
        });
        if result.is_ok() {
            tracing::debug!(session_id = %self.inner.id, state = %next, "session state changed");
        }
        result
    }

    fn require_active(&self, op: &'static str) -> Result<(), ModelError> {
        match self.state() {
            SessionState::Active => Ok(()),
            state => Err(ModelError::InvalidState { op, state }),
        }
    }

    async fn send(&self, command: ModelCommand) -> Result<(), ModelError> {
        let commands = self.inner.commands.get().ok_or(ModelError::Closed)?;
        commands.send(command).await.map_err(|_| ModelError::Closed)
    }
}

/// Relay provider events to the session owner until the provider goes away.
async fn pump(
    inner: Arc<Inner>,
    mut provider: mpsc::Receiver<ProviderEvent>,
    events: mpsc::Sender<SessionEvent>,
) {
    let reason = loop {
        let Some(event) = provider.recv().await else {
            break CloseReason::TransportLost;
        };
        match event {
            ProviderEvent::ToolCall(call) => accept_call(&inner, call, &events).await,
            ProviderEvent::Turn(turn) => {
                let state = *inner.state.borrow();
                if !matches!(state, SessionState::Active | SessionState::Closing) {
                    continue;
                }
                inner.transcript.lock().await.push(turn.clone());
                let _ = events.send(SessionEvent::TurnProduced(turn)).await;
            }
            ProviderEvent::Error(message) => {
                tracing::warn!(session_id = %inner.id, %message, "model reported an error");
            }
            ProviderEvent::Closed(reason) => break reason,
        }
    };

    let previous = inner.mark_closed();
    if matches!(previous, SessionState::Connecting | SessionState::Active) {
        tracing::warn!(session_id = %inner.id, %reason, "model session lost");
        let _ = events.send(SessionEvent::Closed(reason)).await;
    }
}

async fn accept_call(inner: &Inner, call: ToolCall, events: &mpsc::Sender<SessionEvent>) {
    let state = *inner.state.borrow();
    if state != SessionState::Active {
        tracing::warn!(
            session_id = %inner.id,
            call_id = %call.call_id,
            tool = %call.name,
            %state,
            "ignoring tool call"
        );
        return;
    }
    tracing::debug!(session_id = %inner.id, call_id = %call.call_id, tool = %call.name, "tool call requested");
    let _ = events.send(SessionEvent::ToolCallRequested(call)).await;
}
