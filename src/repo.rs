use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde_json::Value;
use tokio::task;
use uuid::Uuid;

use crate::acl::Permission;
use crate::db::PgPool;
use crate::models::{
    CaseStudyAgent, CaseStudyValidationResult, Document, DocumentVersion, Job,
    NewCaseStudyAgent, NewCaseStudyValidationResult, NewDocument, NewDocumentVersion, NewJob,
    NewRendition, Rendition, RenditionKind, RenditionStatus, User,
};
use crate::schema::{
    acl_entries, case_study_agents, case_study_validation_results, document_versions, documents,
    jobs, renditions, users,
};

pub const JOB_STATUS_QUEUED: &str = "queued";
pub const JOB_STATUS_PROCESSING: &str = "processing";
pub const JOB_STATUS_SUCCEEDED: &str = "succeeded";
pub const JOB_STATUS_FAILED: &str = "failed";

/// Outcome of atomically claiming the (document version, kind) slot before a
/// pipeline run. COMPLETED rows are never replaced; any other row is deleted
/// and a fresh PENDING row takes its place, all in one transaction.
#[derive(Debug)]
pub enum PreparedRendition {
    AlreadyCompleted(Rendition),
    Created(Rendition),
}

/// Persistence operations behind the pipelines and routes. The production
/// implementation is Postgres; tests substitute an in-memory fake the same
/// way they substitute `ObjectStorage`.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn insert_document_with_version(
        &self,
        document: NewDocument,
        version: NewDocumentVersion,
    ) -> Result<(Document, DocumentVersion)>;
    async fn find_document(&self, id: Uuid) -> Result<Option<Document>>;
    async fn find_version(&self, id: Uuid) -> Result<Option<DocumentVersion>>;
    async fn current_version(&self, document_id: Uuid) -> Result<Option<DocumentVersion>>;

    async fn find_rendition(
        &self,
        document_version_id: Uuid,
        kind: RenditionKind,
    ) -> Result<Option<Rendition>>;
    async fn list_renditions(&self, document_version_id: Uuid) -> Result<Vec<Rendition>>;
    async fn prepare_rendition(
        &self,
        document_version_id: Uuid,
        kind: RenditionKind,
    ) -> Result<PreparedRendition>;
    async fn set_rendition_processing(&self, id: Uuid) -> Result<()>;
    async fn complete_rendition(&self, id: Uuid, file_path: &str, file_size: i64) -> Result<()>;
    async fn fail_rendition(&self, id: Uuid, error_message: &str) -> Result<()>;
    async fn delete_rendition(&self, id: Uuid) -> Result<()>;

    async fn insert_agent(&self, agent: NewCaseStudyAgent) -> Result<CaseStudyAgent>;
    async fn list_agents(&self) -> Result<Vec<CaseStudyAgent>>;
    async fn find_agent(&self, id: Uuid) -> Result<Option<CaseStudyAgent>>;
    async fn active_agent(&self) -> Result<Option<CaseStudyAgent>>;
    async fn activate_agent(&self, id: Uuid) -> Result<Option<CaseStudyAgent>>;
    async fn deactivate_agent(&self, id: Uuid) -> Result<Option<CaseStudyAgent>>;

    async fn insert_validation_result(
        &self,
        result: NewCaseStudyValidationResult,
    ) -> Result<CaseStudyValidationResult>;
    async fn latest_validation_result(
        &self,
        document_version_id: Uuid,
    ) -> Result<Option<CaseStudyValidationResult>>;

    async fn max_granted_permission(
        &self,
        user_id: Uuid,
        resource_type: &str,
        resource_id: Uuid,
    ) -> Result<Option<Permission>>;

    async fn enqueue_job(&self, job_type: &str, payload: Value) -> Result<Job>;
    async fn reserve_job(&self, job_types: &[&str]) -> Result<Option<Job>>;
    async fn mark_job_succeeded(&self, id: Uuid) -> Result<()>;
    async fn mark_job_failed(&self, id: Uuid, error_message: &str) -> Result<()>;
    async fn retry_job_after(&self, id: Uuid, delay: Duration, error_message: &str) -> Result<()>;
}

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("database pool error: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("database task panicked")?
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let username = username.to_string();
        self.blocking(move |conn| {
            users::table
                .filter(users::username.eq(&username))
                .first(conn)
                .optional()
                .context("failed to load user")
        })
        .await
    }

    async fn insert_document_with_version(
        &self,
        document: NewDocument,
        version: NewDocumentVersion,
    ) -> Result<(Document, DocumentVersion)> {
        self.blocking(move |conn| {
            conn.transaction(|conn| {
                diesel::insert_into(documents::table)
                    .values(&document)
                    .execute(conn)?;
                diesel::insert_into(document_versions::table)
                    .values(&version)
                    .execute(conn)?;
                let document: Document = documents::table.find(document.id).first(conn)?;
                let version: DocumentVersion =
                    document_versions::table.find(version.id).first(conn)?;
                Ok::<_, diesel::result::Error>((document, version))
            })
            .context("failed to insert document with version")
        })
        .await
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>> {
        self.blocking(move |conn| {
            documents::table
                .find(id)
                .first(conn)
                .optional()
                .context("failed to load document")
        })
        .await
    }

    async fn find_version(&self, id: Uuid) -> Result<Option<DocumentVersion>> {
        self.blocking(move |conn| {
            document_versions::table
                .find(id)
                .first(conn)
                .optional()
                .context("failed to load document version")
        })
        .await
    }

    async fn current_version(&self, document_id: Uuid) -> Result<Option<DocumentVersion>> {
        self.blocking(move |conn| {
            let document: Option<Document> = documents::table
                .find(document_id)
                .first(conn)
                .optional()
                .context("failed to load document")?;
            let Some(document) = document else {
                return Ok(None);
            };
            document_versions::table
                .filter(document_versions::document_id.eq(document.id))
                .filter(document_versions::version_number.eq(document.current_version_number))
                .first(conn)
                .optional()
                .context("failed to load current document version")
        })
        .await
    }

    async fn find_rendition(
        &self,
        document_version_id: Uuid,
        kind: RenditionKind,
    ) -> Result<Option<Rendition>> {
        self.blocking(move |conn| {
            renditions::table
                .filter(renditions::document_version_id.eq(document_version_id))
                .filter(renditions::kind.eq(kind.as_str()))
                .first(conn)
                .optional()
                .context("failed to load rendition")
        })
        .await
    }

    async fn list_renditions(&self, document_version_id: Uuid) -> Result<Vec<Rendition>> {
        self.blocking(move |conn| {
            renditions::table
                .filter(renditions::document_version_id.eq(document_version_id))
                .order(renditions::created_at.asc())
                .load(conn)
                .context("failed to list renditions")
        })
        .await
    }

    async fn prepare_rendition(
        &self,
        document_version_id: Uuid,
        kind: RenditionKind,
    ) -> Result<PreparedRendition> {
        self.blocking(move |conn| {
            conn.transaction(|conn| {
                // Row lock serializes concurrent runs for the same
                // (version, kind) pair.
                let existing: Option<Rendition> = renditions::table
                    .filter(renditions::document_version_id.eq(document_version_id))
                    .filter(renditions::kind.eq(kind.as_str()))
                    .for_update()
                    .first(conn)
                    .optional()?;

                if let Some(existing) = existing {
                    if existing.is_completed() {
                        return Ok(PreparedRendition::AlreadyCompleted(existing));
                    }
                    diesel::delete(renditions::table.find(existing.id)).execute(conn)?;
                }

                let new_rendition = NewRendition {
                    id: Uuid::new_v4(),
                    document_version_id,
                    kind: kind.as_str().to_string(),
                    status: RenditionStatus::Pending.as_str().to_string(),
                };
                diesel::insert_into(renditions::table)
                    .values(&new_rendition)
                    .execute(conn)?;
                let row = renditions::table.find(new_rendition.id).first(conn)?;
                Ok::<_, diesel::result::Error>(PreparedRendition::Created(row))
            })
            .context("failed to prepare rendition row")
        })
        .await
    }

    async fn set_rendition_processing(&self, id: Uuid) -> Result<()> {
        self.blocking(move |conn| {
            diesel::update(renditions::table.find(id))
                .set((
                    renditions::status.eq(RenditionStatus::Processing.as_str()),
                    renditions::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)
                .context("failed to mark rendition processing")?;
            Ok(())
        })
        .await
    }

    async fn complete_rendition(&self, id: Uuid, file_path: &str, file_size: i64) -> Result<()> {
        let file_path = file_path.to_string();
        self.blocking(move |conn| {
            diesel::update(renditions::table.find(id))
                .set((
                    renditions::status.eq(RenditionStatus::Completed.as_str()),
                    renditions::file_path.eq(Some(file_path)),
                    renditions::file_size.eq(Some(file_size)),
                    renditions::error_message.eq::<Option<String>>(None),
                    renditions::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)
                .context("failed to mark rendition completed")?;
            Ok(())
        })
        .await
    }

    async fn fail_rendition(&self, id: Uuid, error_message: &str) -> Result<()> {
        let error_message = error_message.to_string();
        self.blocking(move |conn| {
            diesel::update(renditions::table.find(id))
                .set((
                    renditions::status.eq(RenditionStatus::Failed.as_str()),
                    renditions::error_message.eq(Some(error_message)),
                    renditions::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)
                .context("failed to mark rendition failed")?;
            Ok(())
        })
        .await
    }

    async fn delete_rendition(&self, id: Uuid) -> Result<()> {
        self.blocking(move |conn| {
            diesel::delete(renditions::table.find(id))
                .execute(conn)
                .context("failed to delete rendition")?;
            Ok(())
        })
        .await
    }

    async fn insert_agent(&self, agent: NewCaseStudyAgent) -> Result<CaseStudyAgent> {
        self.blocking(move |conn| {
            diesel::insert_into(case_study_agents::table)
                .values(&agent)
                .execute(conn)
                .context("failed to insert case study agent")?;
            case_study_agents::table
                .find(agent.id)
                .first(conn)
                .context("failed to reload case study agent")
        })
        .await
    }

    async fn list_agents(&self) -> Result<Vec<CaseStudyAgent>> {
        self.blocking(move |conn| {
            case_study_agents::table
                .order(case_study_agents::created_at.asc())
                .load(conn)
                .context("failed to list case study agents")
        })
        .await
    }

    async fn find_agent(&self, id: Uuid) -> Result<Option<CaseStudyAgent>> {
        self.blocking(move |conn| {
            case_study_agents::table
                .find(id)
                .first(conn)
                .optional()
                .context("failed to load case study agent")
        })
        .await
    }

    async fn active_agent(&self) -> Result<Option<CaseStudyAgent>> {
        self.blocking(move |conn| {
            case_study_agents::table
                .filter(case_study_agents::is_active.eq(true))
                .first(conn)
                .optional()
                .context("failed to load active case study agent")
        })
        .await
    }

    async fn activate_agent(&self, id: Uuid) -> Result<Option<CaseStudyAgent>> {
        self.blocking(move |conn| {
            conn.transaction(|conn| {
                let target: Option<CaseStudyAgent> =
                    case_study_agents::table.find(id).first(conn).optional()?;
                if target.is_none() {
                    return Ok(None);
                }

                let now = Utc::now().naive_utc();
                // One transaction: no reader ever observes zero or two
                // active agents.
                diesel::update(
                    case_study_agents::table.filter(case_study_agents::is_active.eq(true)),
                )
                .set((
                    case_study_agents::is_active.eq(false),
                    case_study_agents::updated_at.eq(now),
                ))
                .execute(conn)?;

                diesel::update(case_study_agents::table.find(id))
                    .set((
                        case_study_agents::is_active.eq(true),
                        case_study_agents::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                let row = case_study_agents::table.find(id).first(conn)?;
                Ok::<_, diesel::result::Error>(Some(row))
            })
            .context("failed to activate case study agent")
        })
        .await
    }

    async fn deactivate_agent(&self, id: Uuid) -> Result<Option<CaseStudyAgent>> {
        self.blocking(move |conn| {
            let target: Option<CaseStudyAgent> = case_study_agents::table
                .find(id)
                .first(conn)
                .optional()
                .context("failed to load case study agent")?;
            if target.is_none() {
                return Ok(None);
            }

            diesel::update(case_study_agents::table.find(id))
                .set((
                    case_study_agents::is_active.eq(false),
                    case_study_agents::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)
                .context("failed to deactivate case study agent")?;

            case_study_agents::table
                .find(id)
                .first(conn)
                .optional()
                .context("failed to reload case study agent")
        })
        .await
    }

    async fn insert_validation_result(
        &self,
        result: NewCaseStudyValidationResult,
    ) -> Result<CaseStudyValidationResult> {
        self.blocking(move |conn| {
            diesel::insert_into(case_study_validation_results::table)
                .values(&result)
                .execute(conn)
                .context("failed to insert validation result")?;
            case_study_validation_results::table
                .find(result.id)
                .first(conn)
                .context("failed to reload validation result")
        })
        .await
    }

    async fn latest_validation_result(
        &self,
        document_version_id: Uuid,
    ) -> Result<Option<CaseStudyValidationResult>> {
        self.blocking(move |conn| {
            case_study_validation_results::table
                .filter(
                    case_study_validation_results::document_version_id.eq(document_version_id),
                )
                .order(case_study_validation_results::created_at.desc())
                .first(conn)
                .optional()
                .context("failed to load latest validation result")
        })
        .await
    }

    async fn max_granted_permission(
        &self,
        user_id: Uuid,
        resource_type: &str,
        resource_id: Uuid,
    ) -> Result<Option<Permission>> {
        let resource_type = resource_type.to_string();
        self.blocking(move |conn| {
            let grants: Vec<String> = acl_entries::table
                .filter(acl_entries::user_id.eq(user_id))
                .filter(acl_entries::resource_type.eq(&resource_type))
                .filter(acl_entries::resource_id.eq(resource_id))
                .select(acl_entries::permission)
                .load(conn)
                .context("failed to load acl entries")?;
            Ok(grants
                .iter()
                .filter_map(|grant| Permission::parse(grant))
                .max())
        })
        .await
    }

    async fn enqueue_job(&self, job_type: &str, payload: Value) -> Result<Job> {
        let job_type = job_type.to_string();
        self.blocking(move |conn| {
            let new_job = NewJob {
                id: Uuid::new_v4(),
                job_type,
                payload,
                status: JOB_STATUS_QUEUED.to_string(),
                run_after: Utc::now().naive_utc(),
            };
            diesel::insert_into(jobs::table)
                .values(&new_job)
                .execute(conn)
                .context("failed to enqueue job")?;
            jobs::table
                .find(new_job.id)
                .first(conn)
                .context("failed to reload job")
        })
        .await
    }

    async fn reserve_job(&self, job_types: &[&str]) -> Result<Option<Job>> {
        let job_types: Vec<String> = job_types.iter().map(|ty| ty.to_string()).collect();
        self.blocking(move |conn| {
            let now = Utc::now().naive_utc();
            conn.transaction(|conn| {
                let job_opt = jobs::table
                    .filter(jobs::status.eq(JOB_STATUS_QUEUED))
                    .filter(jobs::run_after.le(now))
                    .filter(jobs::job_type.eq_any(&job_types))
                    .order(jobs::run_after.asc())
                    .for_update()
                    .skip_locked()
                    .first::<Job>(conn)
                    .optional()?;

                if let Some(job) = job_opt {
                    diesel::update(jobs::table.find(job.id))
                        .set((
                            jobs::status.eq(JOB_STATUS_PROCESSING),
                            jobs::attempts.eq(job.attempts + 1),
                            jobs::updated_at.eq(now),
                        ))
                        .execute(conn)?;
                    let refreshed = jobs::table.find(job.id).first(conn)?;
                    Ok::<Option<Job>, diesel::result::Error>(Some(refreshed))
                } else {
                    Ok::<Option<Job>, diesel::result::Error>(None)
                }
            })
            .context("failed to reserve job")
        })
        .await
    }

    async fn mark_job_succeeded(&self, id: Uuid) -> Result<()> {
        self.blocking(move |conn| {
            diesel::update(jobs::table.find(id))
                .set((
                    jobs::status.eq(JOB_STATUS_SUCCEEDED),
                    jobs::last_error.eq::<Option<String>>(None),
                    jobs::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)
                .context("failed to mark job succeeded")?;
            Ok(())
        })
        .await
    }

    async fn mark_job_failed(&self, id: Uuid, error_message: &str) -> Result<()> {
        let error_message = error_message.to_string();
        self.blocking(move |conn| {
            diesel::update(jobs::table.find(id))
                .set((
                    jobs::status.eq(JOB_STATUS_FAILED),
                    jobs::last_error.eq(Some(error_message)),
                    jobs::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)
                .context("failed to mark job failed")?;
            Ok(())
        })
        .await
    }

    async fn retry_job_after(&self, id: Uuid, delay: Duration, error_message: &str) -> Result<()> {
        let error_message = error_message.to_string();
        self.blocking(move |conn| {
            let next_run = Utc::now()
                + ChronoDuration::from_std(delay).unwrap_or_else(|_| ChronoDuration::seconds(30));
            diesel::update(jobs::table.find(id))
                .set((
                    jobs::status.eq(JOB_STATUS_QUEUED),
                    jobs::run_after.eq(next_run.naive_utc()),
                    jobs::last_error.eq(Some(error_message)),
                    jobs::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)
                .context("failed to requeue job")?;
            Ok(())
        })
        .await
    }
}
