//! Per-job orchestration: join the room, bind a participant, run the model
//! session and bridge its tool calls to the registry.

use std::sync::Arc;

use conversation::Turn;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;
use crate::job::{EndReason, Job, JobState};
use crate::model::{
    AgentConfig, CloseReason, ModelError, ModelProvider, ModelSession, SessionBinding,
    SessionEvent, SessionEvents, Submission,
};
use crate::room::{Participant, Room, RoomEvent, RoomTransport};
use crate::tools::{ToolCall, ToolRegistry};
use crate::{Error, Result};

/// Runs jobs one at a time per call; share it between jobs through an `Arc`.
pub struct Orchestrator<T, P> {
    config: WorkerConfig,
    registry: Arc<ToolRegistry>,
    transport: T,
    provider: P,
}

impl<T: RoomTransport, P: ModelProvider> Orchestrator<T, P> {
    pub fn new(config: WorkerConfig, registry: ToolRegistry, transport: T, provider: P) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
            transport,
            provider,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            instructions: self.config.agent.instructions.clone(),
            tools: self.registry.specs(),
        }
    }

    /// Run `job` until the participant leaves, the room closes, or `cancel`
    /// fires.
    ///
    /// The room is always left before this returns. Errors are fatal for
    /// the job and are not retried here.
    pub async fn run(&self, job: &mut Job, cancel: CancellationToken) -> Result<EndReason> {
        tracing::info!(job_id = %job.id, room = %job.room, "starting job");
        job.state = JobState::Active;

        let result = self.run_in_room(job, &cancel).await;

        job.state = match &result {
            Ok(_) => JobState::Completed,
            Err(_) => JobState::Failed,
        };
        result
    }

    async fn run_in_room(&self, job: &Job, cancel: &CancellationToken) -> Result<EndReason> {
        let mut room = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::JobCancelled(job.id.clone())),
            room = self.transport.connect(&job.room) => room.map_err(|source| Error::Connect {
                room: job.room.clone(),
                source,
            })?,
        };

        let result = self.drive(job, &mut room, cancel).await;
        room.disconnect().await;
        tracing::debug!(job_id = %job.id, room = %job.room, "left room");
        result
    }

    async fn drive(
        &self,
        job: &Job,
        room: &mut T::Room,
        cancel: &CancellationToken,
    ) -> Result<EndReason> {
        tracing::info!(job_id = %job.id, "waiting for participant");
        let participant = self.await_participant(job, room, cancel).await?;
        tracing::info!(
            job_id = %job.id,
            participant = %participant.identity,
            "starting agent for participant"
        );

        let session = ModelSession::new(SessionBinding {
            room: job.room.clone(),
            participant,
        });
        let drain = self.config.timeouts.close_drain();
        let agent = self.agent_config();
        let start = session.start(
            &self.provider,
            &agent,
            self.config.timeouts.session_connect(),
        );
        let mut events = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job.id, "job cancelled while starting model session");
                session.close(drain).await;
                return Err(Error::JobCancelled(job.id.clone()));
            }
            started = start => started.map_err(Error::SessionStart)?,
        };

        if let Err(e) = self.seed(&session).await {
            session.close(drain).await;
            return Err(Error::SessionStart(e));
        }

        let result = self.relay(&session, &mut events, room, cancel).await;
        session.close(drain).await;
        result
    }

    async fn await_participant(
        &self,
        job: &Job,
        room: &mut T::Room,
        cancel: &CancellationToken,
    ) -> Result<Participant> {
        let limit = self.config.timeouts.participant_wait();
        let wait = async {
            let participant = room.wait_for_participant();
            match limit {
                Some(limit) => match timeout(limit, participant).await {
                    Ok(joined) => joined.map_err(Error::from),
                    Err(_) => Err(Error::ParticipantTimeout(limit)),
                },
                None => participant.await.map_err(Error::from),
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %job.id, "job cancelled while waiting for participant");
                Err(Error::JobCancelled(job.id.clone()))
            }
            participant = wait => participant,
        }
    }

    /// Opening assistant turn, then one response request so the model speaks
    /// first.
    async fn seed(&self, session: &ModelSession) -> std::result::Result<(), ModelError> {
        session
            .create_turn(Turn::assistant(&self.config.agent.greeting))
            .await?;
        session.request_response().await
    }

    async fn relay(
        &self,
        session: &ModelSession,
        events: &mut SessionEvents,
        room: &mut T::Room,
        cancel: &CancellationToken,
    ) -> Result<EndReason> {
        let identity = session.participant().identity.clone();
        let mut dispatches = JoinSet::new();

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Ok(EndReason::Cancelled),

                event = events.recv() => match event {
                    Some(SessionEvent::ToolCallRequested(call)) => {
                        dispatches.spawn(bridge(self.registry.clone(), session.clone(), call));
                    }
                    Some(SessionEvent::TurnProduced(turn)) => {
                        if let Err(e) = room.publish(&turn).await {
                            tracing::warn!(error = %e, "failed to publish turn to room");
                        }
                    }
                    Some(SessionEvent::Closed(reason)) => break Err(Error::SessionLost(reason)),
                    None => break Err(Error::SessionLost(CloseReason::TransportLost)),
                },

                event = room.next_event() => match event {
                    RoomEvent::ParticipantText { identity: from, text } => {
                        tracing::debug!(participant = %from, "participant text");
                        let sent = match session.create_turn(Turn::user(text)).await {
                            Ok(()) => session.request_response().await,
                            Err(e) => Err(e),
                        };
                        if let Err(e) = sent {
                            tracing::warn!(error = %e, "failed to forward participant text");
                        }
                    }
                    RoomEvent::ParticipantLeft { identity: left } if left == identity => {
                        tracing::info!(participant = %left, "participant left");
                        break Ok(EndReason::ParticipantLeft);
                    }
                    RoomEvent::ParticipantLeft { identity: left } => {
                        tracing::debug!(participant = %left, "other participant left");
                    }
                    RoomEvent::Closed => break Ok(EndReason::RoomClosed),
                },

                Some(joined) = dispatches.join_next() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "tool dispatch task failed");
                    }
                }
            }
        };

        // Calls the model made before the loop ended still get an answer.
        if result.is_ok() {
            while let Some(event) = events.try_recv() {
                if let SessionEvent::ToolCallRequested(call) = event {
                    dispatches.spawn(bridge(self.registry.clone(), session.clone(), call));
                }
            }
        }

        // In-flight dispatches run to completion; a result that arrives
        // after close is discarded by the session.
        dispatches.detach_all();
        result
    }
}

/// Dispatch one model call and hand the result back to the session.
async fn bridge(registry: Arc<ToolRegistry>, session: ModelSession, call: ToolCall) {
    let result = registry.dispatch_call(&call).await;
    match session.submit_tool_result(result).await {
        Submission::Delivered { remaining: 0 } => {
            if let Err(e) = session.request_response().await {
                tracing::debug!(call_id = %call.call_id, error = %e, "no response requested after tool result");
            }
        }
        Submission::Delivered { .. } | Submission::Stale => {}
    }
}
