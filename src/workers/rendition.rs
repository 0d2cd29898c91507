use anyhow::Context;
use async_trait::async_trait;

use crate::jobs::{RenditionPayload, JOB_GENERATE_RENDITION};
use crate::models::Job;
use crate::pipeline::rendition::run_rendition;
use crate::state::AppState;

use super::{retry_or_fail, JobExecution, JobHandler};

/// Handles `generate-rendition` jobs for PDF and SUMMARY artifacts.
pub struct RenditionHandler;

#[async_trait]
impl JobHandler for RenditionHandler {
    fn job_types(&self) -> &'static [&'static str] {
        &[JOB_GENERATE_RENDITION]
    }

    async fn handle(&self, state: &AppState, job: &Job) -> JobExecution {
        let payload: RenditionPayload = match serde_json::from_value(job.payload.clone())
            .context("invalid rendition job payload")
        {
            Ok(payload) => payload,
            Err(error) => return JobExecution::Failed { error },
        };

        match run_rendition(state, payload.document_version_id, payload.kind, None).await {
            Ok(()) => JobExecution::Success,
            Err(error) => retry_or_fail(job, error),
        }
    }
}
