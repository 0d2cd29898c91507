use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::jobs::{FormatPayload, JOB_FORMAT_CASE_STUDY};
use crate::models::NewCaseStudyValidationResult;
use crate::state::AppState;
use crate::storage::split_object_key;
use crate::template::TemplateConfig;

/// Minimum overall score the validator must report for content to count as
/// valid. Anything below, and any verdict without a usable score, is invalid.
const VALIDATION_THRESHOLD: f64 = 0.7;

pub(crate) fn is_passing(verdict: &Value) -> bool {
    verdict
        .get("overallScore")
        .and_then(Value::as_f64)
        .map(|score| score >= VALIDATION_THRESHOLD)
        .unwrap_or(false)
}

/// Validates a case study version against the active agent's template. The
/// verdict is appended to the version's validation history; an invalid
/// verdict additionally enqueues reformatting with the extracted content.
/// Without an active agent, or with an unusable or empty template, the run is
/// a no-op.
pub async fn run_validation(state: &AppState, document_version_id: Uuid) -> Result<()> {
    let Some(version) = state.repo.find_version(document_version_id).await? else {
        warn!(%document_version_id, "document version vanished before validation ran");
        return Ok(());
    };

    let Some(agent) = state.repo.active_agent().await? else {
        info!(%document_version_id, "no active case study agent, skipping validation");
        return Ok(());
    };

    let template = match TemplateConfig::from_value(&agent.template_config) {
        Ok(template) => template,
        Err(error) => {
            warn!(
                agent_id = %agent.id,
                %error,
                "active agent template configuration is invalid, skipping validation"
            );
            return Ok(());
        }
    };
    if template.sections.is_empty() {
        info!(agent_id = %agent.id, "active agent template has no sections, skipping validation");
        return Ok(());
    }

    let (container, path) = match split_object_key(&version.file_path) {
        Some(parts) => parts,
        None => {
            warn!(%document_version_id, file_path = %version.file_path, "malformed storage path");
            return Ok(());
        }
    };
    let source = state
        .storage
        .get_object(container, path)
        .await
        .context("failed to download source file")?;
    let text = state
        .text_extractor
        .extract_text(source, &version.content_type)
        .await?;

    let Some(text) = text else {
        // Nothing to score and nothing to reformat from. Record the failure
        // so the history shows why this version never passed.
        state
            .repo
            .insert_validation_result(NewCaseStudyValidationResult {
                id: Uuid::new_v4(),
                document_version_id,
                agent_id: agent.id,
                is_valid: false,
                validation_details: json!({
                    "error": "no text could be extracted from the document"
                }),
            })
            .await?;
        return Ok(());
    };

    let extracted_raw = state
        .section_extractor
        .extract_sections(&text, &template.section_keys())
        .await?;
    let extracted: Value = serde_json::from_str(&extracted_raw)
        .context("section extraction returned invalid JSON")?;

    let rules = template
        .rules_json()
        .context("failed to serialize template rules")?;
    let verdict_raw = state
        .content_validator
        .validate_content(&extracted_raw, &rules)
        .await?;
    let verdict: Value = serde_json::from_str(&verdict_raw)
        .unwrap_or_else(|_| json!({ "error": "validator returned invalid JSON" }));

    let is_valid = is_passing(&verdict);
    state
        .repo
        .insert_validation_result(NewCaseStudyValidationResult {
            id: Uuid::new_v4(),
            document_version_id,
            agent_id: agent.id,
            is_valid,
            validation_details: verdict,
        })
        .await?;
    info!(%document_version_id, is_valid, "validation verdict recorded");

    if !is_valid {
        let payload = FormatPayload {
            document_version_id,
            content: extracted,
        };
        state
            .repo
            .enqueue_job(JOB_FORMAT_CASE_STUDY, serde_json::to_value(&payload)?)
            .await?;
        info!(%document_version_id, "reformatting enqueued for invalid case study");
    }

    Ok(())
}
