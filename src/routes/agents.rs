use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    models::{CaseStudyAgent, NewCaseStudyAgent},
    state::AppState,
    template::TemplateConfig,
};

#[derive(Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub template_config: Value,
}

#[derive(Serialize)]
pub struct AgentResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub template_config: Value,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CaseStudyAgent> for AgentResponse {
    fn from(agent: CaseStudyAgent) -> Self {
        Self {
            id: agent.id,
            name: agent.name,
            description: agent.description,
            template_config: agent.template_config,
            is_active: agent.is_active,
            created_at: agent.created_at.to_string(),
            updated_at: agent.updated_at.to_string(),
        }
    }
}

fn require_admin(user: &AuthenticatedUser) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("administrator role required"))
    }
}

/// New agents start inactive; activation is an explicit step.
pub async fn create_agent(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateAgentRequest>,
) -> AppResult<(StatusCode, Json<AgentResponse>)> {
    require_admin(&user)?;
    if request.name.trim().is_empty() {
        return Err(AppError::bad_request("agent name must not be empty"));
    }
    TemplateConfig::from_value(&request.template_config)
        .map_err(|err| AppError::bad_request(format!("invalid template configuration: {err}")))?;

    let agent = state
        .repo
        .insert_agent(NewCaseStudyAgent {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            description: request.description,
            template_config: request.template_config,
            is_active: false,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(agent.into())))
}

pub async fn list_agents(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AgentResponse>>> {
    let agents = state.repo.list_agents().await?;
    Ok(Json(agents.into_iter().map(Into::into).collect()))
}

pub async fn get_active_agent(
    State(state): State<AppState>,
) -> AppResult<Json<AgentResponse>> {
    let agent = state
        .repo
        .active_agent()
        .await?
        .ok_or_else(AppError::not_found)?;
    Ok(Json(agent.into()))
}

pub async fn activate_agent(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AgentResponse>> {
    require_admin(&user)?;
    let agent = state
        .repo
        .activate_agent(id)
        .await?
        .ok_or_else(AppError::not_found)?;
    Ok(Json(agent.into()))
}

pub async fn deactivate_agent(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AgentResponse>> {
    require_admin(&user)?;
    let agent = state
        .repo
        .deactivate_agent(id)
        .await?
        .ok_or_else(AppError::not_found)?;
    Ok(Json(agent.into()))
}
