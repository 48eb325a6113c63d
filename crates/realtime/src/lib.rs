//! Client for the hosted realtime conversation model.
//!
//! The model speaks JSON events over a WebSocket. [`Connection::open`]
//! performs the handshake (wait for `session.created`, then push the session
//! configuration) and hands the socket to a background task. Callers talk to
//! that task through an [`EventSender`] and read decoded [`ServerEvent`]s from
//! a bounded channel.
//!
//! Only the events the worker acts on are modelled. Everything else decodes
//! to [`ServerEvent::Unknown`] and can be ignored.

mod client;
mod error;
mod protocol;

pub use client::{ClientConfig, Connection, DEFAULT_MODEL, EventSender, HANDSHAKE_TIMEOUT, OPENAI_REALTIME_URL};
pub use error::{Error, Result};
pub use protocol::{
    ApiError, ClientEvent, ContentPart, ConversationItem, InputAudioTranscription, ResponseConfig,
    ResponseInfo, ServerEvent, SessionConfig, SessionInfo, ToolDef,
};
