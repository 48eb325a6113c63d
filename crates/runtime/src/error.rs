use std::time::Duration;

use thiserror::Error;

use crate::job::JobId;
use crate::model::{CloseReason, ModelError};
use crate::room::{RoomError, RoomRef};

/// Errors that end a job.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to join room {room}: {source}")]
    Connect { room: RoomRef, source: RoomError },

    #[error("job {0} cancelled before the session started")]
    JobCancelled(JobId),

    #[error("no participant joined within {0:?}")]
    ParticipantTimeout(Duration),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error("failed to start model session: {0}")]
    SessionStart(#[source] ModelError),

    #[error("model session lost: {0}")]
    SessionLost(CloseReason),
}

pub type Result<T> = std::result::Result<T, Error>;
