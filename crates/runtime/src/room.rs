//! Room transport interface.
//!
//! The worker never touches media tracks. It needs to join a room, learn who
//! the human participant is, hear their text, mirror model turns back, and
//! leave.

use std::future::Future;

use chrono::{DateTime, Utc};
use conversation::Turn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of a room on the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomRef(pub String);

impl RoomRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A remote peer in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub identity: String,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            joined_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A participant sent text (typed, or transcribed by the transport).
    ParticipantText { identity: String, text: String },
    ParticipantLeft { identity: String },
    /// The room ended; no further events follow.
    Closed,
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("join rejected: {0}")]
    Rejected(String),

    #[error("room closed")]
    Closed,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Joins rooms.
pub trait RoomTransport: Send + Sync {
    type Room: Room;

    fn connect(&self, room: &RoomRef) -> impl Future<Output = Result<Self::Room, RoomError>> + Send;
}

/// Membership in one room.
pub trait Room: Send {
    /// Resolve once a participant is present. Must be cancel-safe.
    fn wait_for_participant(&mut self) -> impl Future<Output = Result<Participant, RoomError>> + Send;

    /// Next room event. Must be cancel-safe; it is polled inside `select!`.
    fn next_event(&mut self) -> impl Future<Output = RoomEvent> + Send;

    /// Mirror a conversation turn into the room.
    fn publish(&mut self, turn: &Turn) -> impl Future<Output = Result<(), RoomError>> + Send;

    /// Leave the room and release transport resources.
    fn disconnect(self) -> impl Future<Output = ()> + Send;
}
