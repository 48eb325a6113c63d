//! Jobs and the scheduler interface.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::room::RoomRef;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn generate() -> Self {
        Self(format!("job-{}", Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Active,
    Completed,
    Failed,
}

/// A unit of work binding the worker to one room.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub room: RoomRef,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(room: RoomRef) -> Self {
        Self::with_id(JobId::generate(), room)
    }

    pub fn with_id(id: JobId, room: RoomRef) -> Self {
        Self {
            id,
            room,
            state: JobState::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Why a job ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    ParticipantLeft,
    RoomClosed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(EndReason),
    Failed(String),
}

/// A job handed out by the scheduler together with its cancellation signal.
#[derive(Debug, Clone)]
pub struct JobAssignment {
    pub job: Job,
    pub cancel: CancellationToken,
}

/// The external scheduler.
pub trait JobSource: Send {
    /// Next job to run, or `None` once the source is exhausted. Must be
    /// cancel-safe.
    fn next_job(&mut self) -> impl Future<Output = Option<JobAssignment>> + Send;

    fn report(&mut self, job: &Job, outcome: &JobOutcome) -> impl Future<Output = ()> + Send;
}

/// Submits jobs to a [`QueueSource`].
#[derive(Debug, Clone)]
pub struct JobQueue {
    jobs: mpsc::UnboundedSender<JobAssignment>,
}

impl JobQueue {
    /// An in-process scheduler: jobs submitted on the queue are handed out by
    /// the source in order.
    pub fn channel() -> (JobQueue, QueueSource) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            JobQueue { jobs: tx },
            QueueSource {
                jobs: rx,
                reports: Vec::new(),
            },
        )
    }

    /// Queue `job`. Returns its cancellation token, or `None` if the source
    /// is gone.
    pub fn submit(&self, job: Job) -> Option<CancellationToken> {
        let cancel = CancellationToken::new();
        self.jobs
            .send(JobAssignment {
                job,
                cancel: cancel.clone(),
            })
            .ok()?;
        Some(cancel)
    }
}

/// Receiving half of [`JobQueue::channel`]. Keeps every reported outcome.
#[derive(Debug)]
pub struct QueueSource {
    jobs: mpsc::UnboundedReceiver<JobAssignment>,
    reports: Vec<(Job, JobOutcome)>,
}

impl QueueSource {
    pub fn reports(&self) -> &[(Job, JobOutcome)] {
        &self.reports
    }

    pub fn outcome(&self, id: &JobId) -> Option<&JobOutcome> {
        self.reports
            .iter()
            .find(|(job, _)| &job.id == id)
            .map(|(_, outcome)| outcome)
    }
}

impl JobSource for QueueSource {
    async fn next_job(&mut self) -> Option<JobAssignment> {
        self.jobs.recv().await
    }

    async fn report(&mut self, job: &Job, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Completed(reason) => {
                tracing::info!(job_id = %job.id, room = %job.room, ?reason, "job completed")
            }
            JobOutcome::Failed(error) => {
                tracing::warn!(job_id = %job.id, room = %job.room, %error, "job failed")
            }
        }
        self.reports.push((job.clone(), outcome.clone()));
    }
}
