//! Polling worker: claim a job, execute it, report the outcome.

use crate::client::{ClientError, JobSource};
use crate::executor::Executor;
use common::{JobId, ResultInfo};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    /// Nothing to do; the queue was empty.
    Idle,
    /// A job was executed and its result reported.
    Processed(JobId),
}

pub struct Worker<S, E> {
    source: S,
    executor: E,
    poll_interval: Duration,
}

impl<S: JobSource, E: Executor> Worker<S, E> {
    pub fn new(source: S, executor: E, poll_interval: Duration) -> Self {
        Self {
            source,
            executor,
            poll_interval,
        }
    }

    /// One claim/execute/report cycle. Execution failures become an ERROR
    /// report; only dispatcher errors are returned.
    pub async fn poll_once(&self) -> Result<Poll, ClientError> {
        let Some(job) = self.source.claim().await? else {
            return Ok(Poll::Idle);
        };
        log::info!("Running job {}: {} {}", job.id, job.job_type, job.job_arg);

        let started = Instant::now();
        let outcome = self.executor.execute(job.job_type, &job.job_arg).await;
        let run_time = started.elapsed().as_secs_f64();
        let result = match outcome {
            Ok(info) => {
                log::info!("Job {} passed: {}", job.id, info);
                ResultInfo::pass(info, run_time)
            }
            Err(e) => {
                log::warn!("Job {} failed: {}", job.id, e);
                ResultInfo::error(e.to_string(), run_time)
            }
        };

        if let Err(e) = self.source.report(&job, &result).await {
            log::error!("Failed to report result of job {}; it stays in_progress: {}", job.id, e);
            return Err(e);
        }
        Ok(Poll::Processed(job.id))
    }

    /// Poll until `shutdown` is cancelled. A job that is already running is
    /// always finished and reported before the loop exits.
    pub async fn run(&self, shutdown: CancellationToken) {
        log::info!("Worker started, polling every {:?}", self.poll_interval);
        while !shutdown.is_cancelled() {
            let pause = match self.poll_once().await {
                Ok(Poll::Processed(_)) => false,
                Ok(Poll::Idle) => {
                    log::debug!("No jobs available");
                    true
                }
                Err(e) => {
                    log::error!("Polling failed: {}", e);
                    true
                }
            };

            if pause {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
        log::info!("Worker stopped");
    }
}
