use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::convert::{CONTENT_TYPE_PDF, CONTENT_TYPE_PPTX};
use crate::models::{DocumentVersion, RenditionKind};
use crate::repo::PreparedRendition;
use crate::state::AppState;
use crate::storage::{object_key, split_object_key};
use crate::template::TemplateConfig;

const CONTENT_TYPE_TEXT: &str = "text/plain";

/// Kind-specific production logic. The orchestrator owns the
/// PENDING/PROCESSING/terminal bookkeeping once; producers only turn a source
/// version into artifact bytes and say where the artifact lives.
#[async_trait]
trait ArtifactProducer: Send + Sync {
    async fn produce(&self, state: &AppState, version: &DocumentVersion) -> Result<Vec<u8>>;

    fn content_type(&self) -> &'static str;

    /// (container, container-relative path) for the finished artifact.
    fn destination(&self, state: &AppState, version_id: Uuid) -> (String, String);
}

fn producer_for(kind: RenditionKind, content: Option<Value>) -> Box<dyn ArtifactProducer> {
    match kind {
        RenditionKind::Pdf => Box::new(PdfProducer),
        RenditionKind::Summary => Box::new(SummaryProducer),
        RenditionKind::Formatted => Box::new(FormattedProducer { content }),
    }
}

/// Drives one rendition of `kind` for a document version through the shared
/// state machine: claim the (version, kind) slot, produce the artifact,
/// upload it and record the outcome on the row. A COMPLETED row short-circuits
/// the whole run. Production failures land on the row as FAILED; only
/// infrastructure errors around the row itself bubble up to the job queue.
///
/// `content` carries pre-extracted section content and is only consulted for
/// FORMATTED renditions.
pub async fn run_rendition(
    state: &AppState,
    document_version_id: Uuid,
    kind: RenditionKind,
    content: Option<Value>,
) -> Result<()> {
    let Some(version) = state.repo.find_version(document_version_id).await? else {
        warn!(%document_version_id, "document version vanished before rendition ran");
        return Ok(());
    };

    let rendition = match state.repo.prepare_rendition(document_version_id, kind).await? {
        PreparedRendition::AlreadyCompleted(_) => {
            info!(%document_version_id, kind = kind.as_str(), "rendition already completed");
            return Ok(());
        }
        PreparedRendition::Created(rendition) => rendition,
    };

    state.repo.set_rendition_processing(rendition.id).await?;

    let producer = producer_for(kind, content);
    let bytes = match producer.produce(state, &version).await {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(
                %document_version_id,
                kind = kind.as_str(),
                error = %format!("{error:#}"),
                "rendition production failed"
            );
            state
                .repo
                .fail_rendition(rendition.id, &format!("{error:#}"))
                .await?;
            return Ok(());
        }
    };

    let (container, path) = producer.destination(state, version.id);
    let file_size = bytes.len() as i64;
    let file_path = object_key(&container, &path);
    if let Err(error) = state
        .storage
        .put_object(
            &container,
            &path,
            bytes,
            Some(producer.content_type().to_string()),
        )
        .await
    {
        state
            .repo
            .fail_rendition(rendition.id, &format!("{error:#}"))
            .await?;
        return Ok(());
    }

    state
        .repo
        .complete_rendition(rendition.id, &file_path, file_size)
        .await?;
    info!(
        %document_version_id,
        kind = kind.as_str(),
        file_path,
        file_size,
        "rendition completed"
    );
    Ok(())
}

async fn fetch_source(state: &AppState, version: &DocumentVersion) -> Result<Vec<u8>> {
    let (container, path) = split_object_key(&version.file_path)
        .ok_or_else(|| anyhow!("malformed storage path: {}", version.file_path))?;
    state
        .storage
        .get_object(container, path)
        .await
        .context("failed to download source file")
}

struct PdfProducer;

#[async_trait]
impl ArtifactProducer for PdfProducer {
    async fn produce(&self, state: &AppState, version: &DocumentVersion) -> Result<Vec<u8>> {
        let source = fetch_source(state, version).await?;
        let pdf = state
            .pdf_converter
            .convert_to_pdf(source, &version.content_type)
            .await?;
        Ok(pdf)
    }

    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_PDF
    }

    fn destination(&self, state: &AppState, version_id: Uuid) -> (String, String) {
        (
            state.config.container_renditions.clone(),
            format!("{version_id}/document.pdf"),
        )
    }
}

struct SummaryProducer;

#[async_trait]
impl ArtifactProducer for SummaryProducer {
    async fn produce(&self, state: &AppState, version: &DocumentVersion) -> Result<Vec<u8>> {
        let source = fetch_source(state, version).await?;
        let text = state
            .text_extractor
            .extract_text(source, &version.content_type)
            .await?;
        let Some(text) = text else {
            bail!("no text could be extracted from the document");
        };

        let title = match state.repo.find_document(version.document_id).await? {
            Some(document) => document.title,
            None => version.file_name.clone(),
        };
        let summary = state.summarizer.summarize(&text, &title).await?;
        Ok(summary.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_TEXT
    }

    fn destination(&self, state: &AppState, version_id: Uuid) -> (String, String) {
        (
            state.config.container_summaries.clone(),
            format!("{version_id}/summary.txt"),
        )
    }
}

struct FormattedProducer {
    content: Option<Value>,
}

#[async_trait]
impl ArtifactProducer for FormattedProducer {
    async fn produce(&self, state: &AppState, _version: &DocumentVersion) -> Result<Vec<u8>> {
        let content = self
            .content
            .as_ref()
            .ok_or_else(|| anyhow!("missing formatted content payload"))?;
        let agent = state
            .repo
            .active_agent()
            .await?
            .ok_or_else(|| anyhow!("no active case study agent configured"))?;
        let template = TemplateConfig::from_value(&agent.template_config)
            .context("active agent template configuration is invalid")?;

        state.renderer.build_presentation(&template, content).await
    }

    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_PPTX
    }

    fn destination(&self, state: &AppState, version_id: Uuid) -> (String, String) {
        (
            state.config.container_renditions.clone(),
            format!("{version_id}/formatted.pptx"),
        )
    }
}
