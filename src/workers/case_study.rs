use anyhow::{anyhow, Context};
use async_trait::async_trait;

use crate::jobs::{FormatPayload, ValidatePayload, JOB_FORMAT_CASE_STUDY, JOB_VALIDATE_CASE_STUDY};
use crate::models::{Job, RenditionKind};
use crate::pipeline::rendition::run_rendition;
use crate::pipeline::validation::run_validation;
use crate::state::AppState;

use super::{retry_or_fail, JobExecution, JobHandler};

/// Handles the validation cascade: scoring a case study version and, for
/// invalid verdicts, the follow-up reformatting job.
pub struct CaseStudyHandler;

#[async_trait]
impl JobHandler for CaseStudyHandler {
    fn job_types(&self) -> &'static [&'static str] {
        &[JOB_VALIDATE_CASE_STUDY, JOB_FORMAT_CASE_STUDY]
    }

    async fn handle(&self, state: &AppState, job: &Job) -> JobExecution {
        let outcome = match job.job_type.as_str() {
            JOB_VALIDATE_CASE_STUDY => {
                match serde_json::from_value::<ValidatePayload>(job.payload.clone())
                    .context("invalid validation job payload")
                {
                    Ok(payload) => run_validation(state, payload.document_version_id).await,
                    Err(error) => return JobExecution::Failed { error },
                }
            }
            JOB_FORMAT_CASE_STUDY => {
                match serde_json::from_value::<FormatPayload>(job.payload.clone())
                    .context("invalid formatting job payload")
                {
                    Ok(payload) => {
                        run_rendition(
                            state,
                            payload.document_version_id,
                            RenditionKind::Formatted,
                            Some(payload.content),
                        )
                        .await
                    }
                    Err(error) => return JobExecution::Failed { error },
                }
            }
            other => {
                return JobExecution::Failed {
                    error: anyhow!("unexpected job type: {other}"),
                }
            }
        };

        match outcome {
            Ok(()) => JobExecution::Success,
            Err(error) => retry_or_fail(job, error),
        }
    }
}
