//! Job loop: pull assignments from a scheduler and run them concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::job::{EndReason, Job, JobAssignment, JobId, JobOutcome, JobSource};
use crate::model::ModelProvider;
use crate::orchestrator::Orchestrator;
use crate::room::RoomTransport;

pub struct Worker<T, P> {
    orchestrator: Arc<Orchestrator<T, P>>,
    max_concurrent_jobs: usize,
}

impl<T, P> Worker<T, P>
where
    T: RoomTransport + 'static,
    P: ModelProvider + 'static,
{
    pub fn new(orchestrator: Orchestrator<T, P>) -> Self {
        let max_concurrent_jobs = orchestrator.config().max_concurrent_jobs.max(1);
        Self {
            orchestrator: Arc::new(orchestrator),
            max_concurrent_jobs,
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator<T, P> {
        &self.orchestrator
    }

    /// Run jobs from `source` until it is exhausted or `shutdown` fires, then
    /// wait for every running job to report.
    ///
    /// Returns the number of jobs reported.
    pub async fn run<S: JobSource>(&self, source: &mut S, shutdown: CancellationToken) -> usize {
        let mut running: JoinSet<(Job, Result<EndReason>)> = JoinSet::new();
        let mut jobs: HashMap<task::Id, Job> = HashMap::new();
        let mut cancels: HashMap<JobId, CancellationToken> = HashMap::new();
        let mut exhausted = false;
        let mut stopping = false;
        let mut reported = 0;

        tracing::info!(max_concurrent_jobs = self.max_concurrent_jobs, "worker started");

        loop {
            if (exhausted || stopping) && running.is_empty() {
                break;
            }
            let accepting = !exhausted && !stopping && running.len() < self.max_concurrent_jobs;

            tokio::select! {
                _ = shutdown.cancelled(), if !stopping => {
                    tracing::info!(running = running.len(), "shutting down, cancelling jobs");
                    stopping = true;
                    for cancel in cancels.values() {
                        cancel.cancel();
                    }
                }

                assignment = source.next_job(), if accepting => match assignment {
                    Some(JobAssignment { job, cancel }) => {
                        let handle = running.spawn(run_job(
                            self.orchestrator.clone(),
                            job.clone(),
                            cancel.clone(),
                        ));
                        tracing::debug!(job_id = %job.id, running = running.len(), "job accepted");
                        cancels.insert(job.id.clone(), cancel);
                        jobs.insert(handle.id(), job);
                    }
                    None => {
                        tracing::debug!("job source exhausted");
                        exhausted = true;
                    }
                },

                Some(joined) = running.join_next_with_id() => {
                    let (job, outcome) = match joined {
                        Ok((id, (job, result))) => {
                            jobs.remove(&id);
                            (job, outcome_of(result))
                        }
                        Err(e) => {
                            let Some(job) = jobs.remove(&e.id()) else {
                                tracing::error!(error = %e, "untracked job task failed");
                                continue;
                            };
                            tracing::error!(job_id = %job.id, error = %e, "job task failed");
                            (job, JobOutcome::Failed(format!("job task failed: {e}")))
                        }
                    };
                    cancels.remove(&job.id);
                    source.report(&job, &outcome).await;
                    reported += 1;
                }

                else => break,
            }
        }

        tracing::info!(reported, "worker stopped");
        reported
    }
}

async fn run_job<T, P>(
    orchestrator: Arc<Orchestrator<T, P>>,
    mut job: Job,
    cancel: CancellationToken,
) -> (Job, Result<EndReason>)
where
    T: RoomTransport,
    P: ModelProvider,
{
    let result = orchestrator.run(&mut job, cancel).await;
    (job, result)
}

fn outcome_of(result: Result<EndReason>) -> JobOutcome {
    match result {
        Ok(reason) => JobOutcome::Completed(reason),
        Err(e) => JobOutcome::Failed(e.to_string()),
    }
}
