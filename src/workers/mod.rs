use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::models::Job;
use crate::state::AppState;

pub mod case_study;
pub mod rendition;

const MAX_ATTEMPTS: i32 = 5;
const RETRY_DELAY: Duration = Duration::from_secs(30);

pub enum JobExecution {
    Success,
    Retry { delay: Duration, error: anyhow::Error },
    Failed { error: anyhow::Error },
}

#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    fn job_types(&self) -> &'static [&'static str];
    async fn handle(&self, state: &AppState, job: &Job) -> JobExecution;
}

/// Requeues transient failures with a delay until the attempt budget runs
/// out, then gives up on the job.
pub fn retry_or_fail(job: &Job, error: anyhow::Error) -> JobExecution {
    if job.attempts < MAX_ATTEMPTS {
        JobExecution::Retry {
            delay: RETRY_DELAY,
            error,
        }
    } else {
        JobExecution::Failed { error }
    }
}

/// Polls the durable queue for the handler's job types and dispatches each
/// reserved job. One worker processes one job at a time; concurrency comes
/// from running several workers against the same queue.
pub struct Worker {
    state: AppState,
    handler: Arc<dyn JobHandler>,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(state: AppState, handler: Arc<dyn JobHandler>, poll_interval: Duration) -> Self {
        Self {
            state,
            handler,
            poll_interval,
        }
    }

    pub async fn run(self) {
        info!(job_types = ?self.handler.job_types(), "worker started");
        loop {
            match self.run_once().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(self.poll_interval).await,
                Err(err) => {
                    error!(error = %format!("{err:#}"), "worker tick failed");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Reserves and processes at most one job. Returns whether a job was
    /// found.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(job) = self.state.repo.reserve_job(self.handler.job_types()).await? else {
            return Ok(false);
        };

        info!(job_id = %job.id, job_type = %job.job_type, attempt = job.attempts, "processing job");
        match self.handler.handle(&self.state, &job).await {
            JobExecution::Success => {
                self.state.repo.mark_job_succeeded(job.id).await?;
            }
            JobExecution::Retry { delay, error } => {
                warn!(
                    job_id = %job.id,
                    delay_secs = delay.as_secs(),
                    error = %format!("{error:#}"),
                    "job failed, retrying"
                );
                self.state
                    .repo
                    .retry_job_after(job.id, delay, &format!("{error:#}"))
                    .await?;
            }
            JobExecution::Failed { error } => {
                error!(job_id = %job.id, error = %format!("{error:#}"), "job failed permanently");
                self.state
                    .repo
                    .mark_job_failed(job.id, &format!("{error:#}"))
                    .await?;
            }
        }
        Ok(true)
    }
}
