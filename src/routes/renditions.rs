use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    jobs::{RenditionPayload, JOB_GENERATE_RENDITION},
    models::{Rendition, RenditionKind},
    state::AppState,
};

#[derive(Serialize)]
pub struct RenditionResponse {
    pub id: Uuid,
    pub document_version_id: Uuid,
    pub kind: String,
    pub status: String,
    pub file_path: Option<String>,
    pub file_size: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Rendition> for RenditionResponse {
    fn from(rendition: Rendition) -> Self {
        Self {
            id: rendition.id,
            document_version_id: rendition.document_version_id,
            kind: rendition.kind,
            status: rendition.status,
            file_path: rendition.file_path,
            file_size: rendition.file_size,
            error_message: rendition.error_message,
            created_at: rendition.created_at.to_string(),
            updated_at: rendition.updated_at.to_string(),
        }
    }
}

fn parse_kind(raw: &str) -> Result<RenditionKind, AppError> {
    RenditionKind::parse(raw)
        .ok_or_else(|| AppError::bad_request(format!("unknown rendition kind: {raw}")))
}

pub async fn list_renditions(
    State(state): State<AppState>,
    Path(version_id): Path<Uuid>,
) -> AppResult<Json<Vec<RenditionResponse>>> {
    state
        .repo
        .find_version(version_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    let renditions = state.repo.list_renditions(version_id).await?;
    Ok(Json(renditions.into_iter().map(Into::into).collect()))
}

pub async fn get_rendition(
    State(state): State<AppState>,
    Path((version_id, kind)): Path<(Uuid, String)>,
) -> AppResult<Json<RenditionResponse>> {
    let kind = parse_kind(&kind)?;
    let rendition = state
        .repo
        .find_rendition(version_id, kind)
        .await?
        .ok_or_else(AppError::not_found)?;
    Ok(Json(rendition.into()))
}

/// Enqueues (re-)generation of a PDF or SUMMARY rendition. A COMPLETED
/// rendition short-circuits inside the pipeline; a FAILED one is replaced.
/// FORMATTED renditions only come out of the validation cascade.
pub async fn trigger_rendition(
    State(state): State<AppState>,
    Path((version_id, kind)): Path<(Uuid, String)>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let kind = parse_kind(&kind)?;
    if kind == RenditionKind::Formatted {
        return Err(AppError::bad_request(
            "formatted renditions are produced by the validation pipeline",
        ));
    }

    state
        .repo
        .find_version(version_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    let payload = RenditionPayload {
        document_version_id: version_id,
        kind,
    };
    state
        .repo
        .enqueue_job(JOB_GENERATE_RENDITION, serde_json::to_value(&payload)?)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "document_version_id": version_id,
            "kind": kind.as_str(),
            "status": "PENDING",
        })),
    ))
}
