//! Realtime client error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("timeout waiting for session")]
    Timeout,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("api error: {0}")]
    Api(String),

    #[error("connection closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;
