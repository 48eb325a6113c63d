//! In-memory room transport and model provider for driving the runtime in
//! tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use conversation::Turn;
use runtime::{
    AgentConfig, ModelError, ModelLink, ModelProvider, Participant, Room, RoomError, RoomEvent,
    RoomRef, RoomTransport, SessionBinding, ToolCall,
};
use runtime::model::{ModelCommand, ProviderEvent};
use tokio::sync::{mpsc, watch};

const WAIT: Duration = Duration::from_secs(5);

/// Await `future`, failing the test if it takes longer than a few seconds.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("timed out waiting for test event")
}

// ---- model ----

/// What `connect` does.
#[derive(Clone)]
pub enum FakeProvider {
    Accept(mpsc::UnboundedSender<Remote>),
    Refuse,
    /// Never completes the handshake.
    Hang,
}

/// The model side of every session opened through an accepting
/// [`FakeProvider`].
pub struct FakeModel {
    remotes: mpsc::UnboundedReceiver<Remote>,
}

pub fn fake_model() -> (FakeProvider, FakeModel) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FakeProvider::Accept(tx), FakeModel { remotes: rx })
}

impl FakeModel {
    pub async fn accept(&mut self) -> Remote {
        within(self.remotes.recv())
            .await
            .expect("provider dropped")
    }

    pub fn try_accept(&mut self) -> Option<Remote> {
        self.remotes.try_recv().ok()
    }
}

impl ModelProvider for FakeProvider {
    async fn connect(
        &self,
        config: &AgentConfig,
        binding: &SessionBinding,
    ) -> Result<ModelLink, ModelError> {
        match self {
            FakeProvider::Accept(remotes) => {
                let (commands_tx, commands_rx) = mpsc::channel(64);
                let (events_tx, events_rx) = mpsc::channel(64);
                let remote = Remote {
                    config: config.clone(),
                    binding: binding.clone(),
                    commands: commands_rx,
                    events: events_tx,
                };
                remotes
                    .send(remote)
                    .map_err(|_| ModelError::Connect("model gone".into()))?;
                Ok(ModelLink {
                    commands: commands_tx,
                    events: events_rx,
                })
            }
            FakeProvider::Refuse => Err(ModelError::Connect("connection refused".into())),
            FakeProvider::Hang => std::future::pending().await,
        }
    }
}

/// One live fake model session.
pub struct Remote {
    pub config: AgentConfig,
    pub binding: SessionBinding,
    commands: mpsc::Receiver<ModelCommand>,
    events: mpsc::Sender<ProviderEvent>,
}

impl Remote {
    pub async fn next_command(&mut self) -> ModelCommand {
        within(self.commands.recv())
            .await
            .expect("session dropped its command channel")
    }

    /// Next command, or `None` if nothing arrives within `wait`.
    pub async fn command_within(&mut self, wait: Duration) -> Option<ModelCommand> {
        tokio::time::timeout(wait, self.commands.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn emit(&self, event: ProviderEvent) {
        self.events.send(event).await.expect("session stopped listening");
    }

    pub async fn say(&self, text: &str) {
        self.emit(ProviderEvent::Turn(Turn::assistant(text))).await;
    }

    pub async fn call_tool(&self, call_id: &str, name: &str, arguments: &str) {
        self.emit(ProviderEvent::ToolCall(ToolCall {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }))
        .await;
    }

    /// Consume the opening assistant turn and response request.
    pub async fn expect_greeting(&mut self) -> Turn {
        let turn = match self.next_command().await {
            ModelCommand::CreateTurn(turn) => turn,
            other => panic!("expected greeting turn, got {other:?}"),
        };
        assert_eq!(self.next_command().await, ModelCommand::RequestResponse);
        turn
    }
}

// ---- rooms ----

/// Rooms that exist on the fake transport. Each room can be joined once.
#[derive(Clone, Default)]
pub struct FakeTransport {
    rooms: Arc<Mutex<HashMap<String, FakeRoom>>>,
}

impl FakeTransport {
    pub fn add_room(&self, name: &str) -> RoomController {
        let (participant_tx, participant_rx) = watch::channel(None);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (published_tx, published_rx) = mpsc::unbounded_channel();
        let disconnected = Arc::new(AtomicBool::new(false));

        let room = FakeRoom {
            participant: participant_rx,
            events: events_rx,
            published: published_tx,
            disconnected: disconnected.clone(),
        };
        self.rooms.lock().unwrap().insert(name.to_string(), room);

        RoomController {
            participant: participant_tx,
            events: events_tx,
            published: published_rx,
            disconnected,
        }
    }
}

impl RoomTransport for FakeTransport {
    type Room = FakeRoom;

    async fn connect(&self, room: &RoomRef) -> Result<FakeRoom, RoomError> {
        let joined = self.rooms.lock().unwrap().remove(room.as_str());
        joined.ok_or_else(|| RoomError::Rejected(format!("no such room: {room}")))
    }
}

pub struct FakeRoom {
    participant: watch::Receiver<Option<Participant>>,
    events: mpsc::UnboundedReceiver<RoomEvent>,
    published: mpsc::UnboundedSender<Turn>,
    disconnected: Arc<AtomicBool>,
}

impl Room for FakeRoom {
    async fn wait_for_participant(&mut self) -> Result<Participant, RoomError> {
        let present = self
            .participant
            .wait_for(Option::is_some)
            .await
            .map_err(|_| RoomError::Closed)?;
        Option::clone(&present).ok_or(RoomError::Closed)
    }

    async fn next_event(&mut self) -> RoomEvent {
        self.events.recv().await.unwrap_or(RoomEvent::Closed)
    }

    async fn publish(&mut self, turn: &Turn) -> Result<(), RoomError> {
        self.published
            .send(turn.clone())
            .map_err(|_| RoomError::Closed)
    }

    async fn disconnect(self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

/// Test-side handle for one fake room.
pub struct RoomController {
    participant: watch::Sender<Option<Participant>>,
    events: mpsc::UnboundedSender<RoomEvent>,
    published: mpsc::UnboundedReceiver<Turn>,
    disconnected: Arc<AtomicBool>,
}

impl RoomController {
    pub fn join(&self, identity: &str) {
        self.participant.send_replace(Some(Participant::new(identity)));
    }

    pub fn say(&self, identity: &str, text: &str) {
        let _ = self.events.send(RoomEvent::ParticipantText {
            identity: identity.into(),
            text: text.into(),
        });
    }

    pub fn leave(&self, identity: &str) {
        let _ = self.events.send(RoomEvent::ParticipantLeft {
            identity: identity.into(),
        });
    }

    pub fn close(&self) {
        let _ = self.events.send(RoomEvent::Closed);
    }

    pub async fn next_published(&mut self) -> Turn {
        within(self.published.recv())
            .await
            .expect("room dropped")
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}
