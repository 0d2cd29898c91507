use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::convert::CONTENT_TYPE_PPTX;
use crate::error::AppError;
use crate::jobs::{
    RenditionPayload, ValidatePayload, JOB_GENERATE_RENDITION, JOB_VALIDATE_CASE_STUDY,
};
use crate::models::{
    Document, DocumentVersion, NewDocument, NewDocumentVersion, RenditionKind,
    DOCUMENT_STATUS_ACTIVE,
};
use crate::state::AppState;
use crate::storage::object_key;
use crate::template::TemplateConfig;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStudyRequest {
    pub title: String,
    #[serde(default)]
    pub customer_overview: Option<String>,
    #[serde(default)]
    pub challenges: Option<Vec<String>>,
    #[serde(default)]
    pub solution: Option<String>,
    #[serde(default)]
    pub technologies: Option<Vec<String>>,
    #[serde(default)]
    pub results: Option<Vec<String>>,
    #[serde(default)]
    pub enhance: bool,
}

/// Generates a case study deck from wizard input: renders the active agent's
/// template with the supplied content, stores the deck as a new document with
/// one version and queues the PDF rendition and validation for it. Content
/// enhancement is best effort and never fails the request.
pub async fn generate_case_study(
    state: &AppState,
    request: CaseStudyRequest,
) -> Result<(Document, DocumentVersion), AppError> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }

    let Some(agent) = state.repo.active_agent().await? else {
        return Err(AppError::new(
            StatusCode::CONFLICT,
            "no active case study agent configured",
        ));
    };
    let template = TemplateConfig::from_value(&agent.template_config).map_err(|_| {
        AppError::new(
            StatusCode::CONFLICT,
            "active agent template configuration is invalid",
        )
    })?;

    let mut content = build_content(&title, &request);
    if request.enhance {
        match state
            .content_enhancer
            .enhance_content(&content.to_string())
            .await
            .and_then(|enhanced| {
                serde_json::from_str::<Value>(&enhanced).map_err(anyhow::Error::from)
            }) {
            Ok(enhanced) => content = enhanced,
            Err(error) => {
                warn!(error = %format!("{error:#}"), "content enhancement failed, using original content");
            }
        }
    }

    let pptx = state.renderer.build_presentation(&template, &content).await?;

    let document_id = Uuid::new_v4();
    let version_id = Uuid::new_v4();
    let file_name = format!("{}.pptx", sanitize_file_stem(&title));
    let file_size = pptx.len() as i64;
    let checksum = hex::encode(Sha256::digest(&pptx));

    let path = format!("{document_id}/1/{file_name}");
    let file_path = object_key(&state.config.container_documents, &path);
    state
        .storage
        .put_object(
            &state.config.container_documents,
            &path,
            pptx,
            Some(CONTENT_TYPE_PPTX.to_string()),
        )
        .await?;

    let (document, version) = state
        .repo
        .insert_document_with_version(
            NewDocument {
                id: document_id,
                title,
                status: DOCUMENT_STATUS_ACTIVE.to_string(),
                current_version_number: 1,
            },
            NewDocumentVersion {
                id: version_id,
                document_id,
                version_number: 1,
                file_path,
                file_name,
                file_size,
                content_type: CONTENT_TYPE_PPTX.to_string(),
                checksum,
            },
        )
        .await?;

    let pdf_payload = RenditionPayload {
        document_version_id: version.id,
        kind: RenditionKind::Pdf,
    };
    state
        .repo
        .enqueue_job(JOB_GENERATE_RENDITION, serde_json::to_value(&pdf_payload)?)
        .await?;
    let validate_payload = ValidatePayload {
        document_version_id: version.id,
    };
    state
        .repo
        .enqueue_job(
            JOB_VALIDATE_CASE_STUDY,
            serde_json::to_value(&validate_payload)?,
        )
        .await?;

    info!(document_id = %document.id, version_id = %version.id, "case study generated");
    Ok((document, version))
}

fn build_content(title: &str, request: &CaseStudyRequest) -> Value {
    json!({
        "title": title,
        "customerOverview": request.customer_overview,
        "challenges": request.challenges,
        "solution": request.solution,
        "technologies": request.technologies,
        "results": request.results,
    })
}

/// Reduces a document title to a storage-safe file stem.
pub(crate) fn sanitize_file_stem(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut last_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            stem.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash && !stem.is_empty() {
            stem.push('-');
            last_dash = true;
        }
    }
    while stem.ends_with('-') {
        stem.pop();
    }
    if stem.is_empty() {
        "case-study".to_string()
    } else {
        stem
    }
}
