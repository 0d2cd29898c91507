use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    jobs::{RenditionPayload, JOB_GENERATE_RENDITION},
    models::{RenditionKind, RenditionStatus},
    state::AppState,
    storage::split_object_key,
};

#[derive(Serialize)]
pub struct SummaryResponse {
    pub document_id: Uuid,
    pub document_version_id: Uuid,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Summary status for a document's current version. A missing rendition row
/// kicks off generation; a COMPLETED one is served inline from storage.
pub async fn get_summary(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<SummaryResponse>> {
    let version = state
        .repo
        .current_version(document_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    let rendition = state
        .repo
        .find_rendition(version.id, RenditionKind::Summary)
        .await?;

    let Some(rendition) = rendition else {
        enqueue_summary(&state, version.id).await?;
        return Ok(Json(SummaryResponse {
            document_id,
            document_version_id: version.id,
            status: RenditionStatus::Pending.as_str().to_string(),
            summary: None,
            message: Some("summary generation has been started".to_string()),
        }));
    };

    let response = match rendition.status() {
        Some(RenditionStatus::Completed) => {
            let file_path = rendition
                .file_path
                .as_deref()
                .ok_or_else(|| AppError::bad_request("completed summary has no stored file"))?;
            let (container, path) = split_object_key(file_path)
                .ok_or_else(|| AppError::bad_request("malformed summary storage path"))?;
            let bytes = state.storage.get_object(container, path).await?;
            SummaryResponse {
                document_id,
                document_version_id: version.id,
                status: rendition.status.clone(),
                summary: Some(String::from_utf8_lossy(&bytes).into_owned()),
                message: None,
            }
        }
        Some(RenditionStatus::Failed) => SummaryResponse {
            document_id,
            document_version_id: version.id,
            status: rendition.status.clone(),
            summary: None,
            message: Some(format!(
                "summary generation failed: {}",
                rendition.error_message.as_deref().unwrap_or("unknown error")
            )),
        },
        _ => SummaryResponse {
            document_id,
            document_version_id: version.id,
            status: rendition.status.clone(),
            summary: None,
            message: Some("summary generation is in progress".to_string()),
        },
    };

    Ok(Json(response))
}

/// Drops any existing summary row and enqueues a fresh run.
pub async fn regenerate_summary(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<SummaryResponse>> {
    let version = state
        .repo
        .current_version(document_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    if let Some(existing) = state
        .repo
        .find_rendition(version.id, RenditionKind::Summary)
        .await?
    {
        state.repo.delete_rendition(existing.id).await?;
    }
    enqueue_summary(&state, version.id).await?;

    Ok(Json(SummaryResponse {
        document_id,
        document_version_id: version.id,
        status: RenditionStatus::Pending.as_str().to_string(),
        summary: None,
        message: Some("summary regeneration has been started".to_string()),
    }))
}

async fn enqueue_summary(state: &AppState, document_version_id: Uuid) -> AppResult<()> {
    let payload = RenditionPayload {
        document_version_id,
        kind: RenditionKind::Summary,
    };
    state
        .repo
        .enqueue_job(JOB_GENERATE_RENDITION, serde_json::to_value(&payload)?)
        .await?;
    Ok(())
}
