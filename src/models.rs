use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::*;

/// Artifact kinds tracked by the rendition pipeline. Stored as text in the
/// renditions table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RenditionKind {
    Pdf,
    Summary,
    Formatted,
}

impl RenditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenditionKind::Pdf => "PDF",
            RenditionKind::Summary => "SUMMARY",
            RenditionKind::Formatted => "FORMATTED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "PDF" => Some(RenditionKind::Pdf),
            "SUMMARY" => Some(RenditionKind::Summary),
            "FORMATTED" => Some(RenditionKind::Formatted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RenditionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RenditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenditionStatus::Pending => "PENDING",
            RenditionStatus::Processing => "PROCESSING",
            RenditionStatus::Completed => "COMPLETED",
            RenditionStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(RenditionStatus::Pending),
            "PROCESSING" => Some(RenditionStatus::Processing),
            "COMPLETED" => Some(RenditionStatus::Completed),
            "FAILED" => Some(RenditionStatus::Failed),
            _ => None,
        }
    }
}

pub const DOCUMENT_STATUS_ACTIVE: &str = "ACTIVE";

pub const ROLE_ADMIN: &str = "ADMIN";

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = documents)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub current_version_number: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub current_version_number: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = document_versions)]
#[diesel(belongs_to(Document))]
pub struct DocumentVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub version_number: i32,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub checksum: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = document_versions)]
pub struct NewDocumentVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub version_number: i32,
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = renditions)]
#[diesel(belongs_to(DocumentVersion, foreign_key = document_version_id))]
pub struct Rendition {
    pub id: Uuid,
    pub document_version_id: Uuid,
    pub kind: String,
    pub status: String,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Rendition {
    pub fn status(&self) -> Option<RenditionStatus> {
        RenditionStatus::parse(&self.status)
    }

    pub fn is_completed(&self) -> bool {
        self.status == RenditionStatus::Completed.as_str()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = renditions)]
pub struct NewRendition {
    pub id: Uuid,
    pub document_version_id: Uuid,
    pub kind: String,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = case_study_agents)]
pub struct CaseStudyAgent {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub template_config: serde_json::Value,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = case_study_agents)]
pub struct NewCaseStudyAgent {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub template_config: serde_json::Value,
    pub is_active: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = case_study_validation_results)]
#[diesel(belongs_to(DocumentVersion, foreign_key = document_version_id))]
pub struct CaseStudyValidationResult {
    pub id: Uuid,
    pub document_version_id: Uuid,
    pub agent_id: Uuid,
    pub is_valid: bool,
    pub validation_details: serde_json::Value,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = case_study_validation_results)]
pub struct NewCaseStudyValidationResult {
    pub id: Uuid,
    pub document_version_id: Uuid,
    pub agent_id: Uuid,
    pub is_valid: bool,
    pub validation_details: serde_json::Value,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = jobs)]
pub struct Job {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub run_after: NaiveDateTime,
    pub last_error: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = jobs)]
pub struct NewJob {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub run_after: NaiveDateTime,
}
