use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::template::TemplateConfig;

/// Template-driven presentation construction. The production implementation
/// delegates to the slide-render service; this crate never draws slides
/// itself.
#[async_trait]
pub trait PresentationRenderer: Send + Sync + 'static {
    async fn build_presentation(
        &self,
        template: &TemplateConfig,
        content: &serde_json::Value,
    ) -> Result<Vec<u8>>;
}

pub struct RenderServiceClient {
    client: Client,
    endpoint: String,
}

impl RenderServiceClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PresentationRenderer for RenderServiceClient {
    async fn build_presentation(
        &self,
        template: &TemplateConfig,
        content: &serde_json::Value,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/render/pptx", self.endpoint.trim_end_matches('/'));
        let body = json!({
            "template": template,
            "content": content,
        });

        debug!(sections = template.sections.len(), "requesting presentation render");
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("presentation render request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("presentation render failed with status {status}: {body}");
        }

        let bytes = response
            .bytes()
            .await
            .context("failed to read rendered presentation")?;
        Ok(bytes.to_vec())
    }
}
