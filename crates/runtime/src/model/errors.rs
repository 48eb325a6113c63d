use std::time::Duration;

use thiserror::Error;

use super::types::SessionState;

/// Errors from starting or driving a model session.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// The provider could not establish the channel.
    #[error("failed to connect to model: {0}")]
    Connect(String),

    /// The handshake did not complete in time.
    #[error("model handshake did not complete within {0:?}")]
    HandshakeTimeout(Duration),

    /// The operation is not valid in the session's current state.
    #[error("cannot {op} while session is {state}")]
    InvalidState {
        op: &'static str,
        state: SessionState,
    },

    /// The channel to the model is gone.
    #[error("model session closed")]
    Closed,
}
