use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::RenditionKind;

pub const JOB_GENERATE_RENDITION: &str = "generate-rendition";
pub const JOB_VALIDATE_CASE_STUDY: &str = "validate-case-study";
pub const JOB_FORMAT_CASE_STUDY: &str = "format-case-study";

/// Payload for `generate-rendition` jobs. FORMATTED renditions are never
/// requested through this job type; they go through `format-case-study`,
/// which carries the extracted section content alongside the version id.
#[derive(Debug, Serialize, Deserialize)]
pub struct RenditionPayload {
    pub document_version_id: Uuid,
    pub kind: RenditionKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidatePayload {
    pub document_version_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FormatPayload {
    pub document_version_id: Uuid,
    pub content: Value,
}
