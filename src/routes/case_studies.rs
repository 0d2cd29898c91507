use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    acl::{Permission, ResourceType},
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    jobs::{ValidatePayload, JOB_VALIDATE_CASE_STUDY},
    models::CaseStudyValidationResult,
    pipeline::generate::{generate_case_study, CaseStudyRequest},
    state::AppState,
};

#[derive(Serialize)]
pub struct GenerateResponse {
    pub document_id: Uuid,
    pub document_version_id: Uuid,
    pub title: String,
    pub file_name: String,
}

pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<CaseStudyRequest>,
) -> AppResult<(StatusCode, Json<GenerateResponse>)> {
    let (document, version) = generate_case_study(&state, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            document_id: document.id,
            document_version_id: version.id,
            title: document.title,
            file_name: version.file_name,
        }),
    ))
}

pub async fn trigger_validation(
    State(state): State<AppState>,
    Path(version_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Value>)> {
    state
        .repo
        .find_version(version_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    let payload = ValidatePayload {
        document_version_id: version_id,
    };
    state
        .repo
        .enqueue_job(JOB_VALIDATE_CASE_STUDY, serde_json::to_value(&payload)?)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "document_version_id": version_id, "status": "QUEUED" })),
    ))
}

#[derive(Serialize)]
pub struct ValidationResultResponse {
    pub id: Uuid,
    pub document_version_id: Uuid,
    pub agent_id: Uuid,
    pub is_valid: bool,
    pub validation_details: Value,
    pub created_at: String,
}

impl From<CaseStudyValidationResult> for ValidationResultResponse {
    fn from(result: CaseStudyValidationResult) -> Self {
        Self {
            id: result.id,
            document_version_id: result.document_version_id,
            agent_id: result.agent_id,
            is_valid: result.is_valid,
            validation_details: result.validation_details,
            created_at: result.created_at.to_string(),
        }
    }
}

/// Latest validation verdict for a version. Existence is checked before
/// authorization, so an unknown version is a 404 even for callers who would
/// have been denied. Non-admin callers need READ on the owning document.
pub async fn get_validation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(version_id): Path<Uuid>,
) -> AppResult<Json<ValidationResultResponse>> {
    let version = state
        .repo
        .find_version(version_id)
        .await?
        .ok_or_else(AppError::not_found)?;

    if !user.is_admin() {
        let allowed = state
            .access
            .has_permission(
                user.user_id,
                ResourceType::Document,
                version.document_id,
                Permission::Read,
            )
            .await?;
        if !allowed {
            return Err(AppError::forbidden(
                "insufficient permissions to read validation results",
            ));
        }
    }

    let result = state
        .repo
        .latest_validation_result(version_id)
        .await?
        .ok_or_else(AppError::not_found)?;
    Ok(Json(result.into()))
}
