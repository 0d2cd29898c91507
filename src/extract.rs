use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Plain-text extraction from binary documents. Returns None when the
/// service finds no text at all.
#[async_trait]
pub trait TextExtractor: Send + Sync + 'static {
    async fn extract_text(&self, bytes: Vec<u8>, content_type: &str) -> Result<Option<String>>;
}

/// Client for the managed document-intelligence service.
pub struct DocumentIntelligenceExtractor {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl DocumentIntelligenceExtractor {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextExtractor for DocumentIntelligenceExtractor {
    async fn extract_text(&self, bytes: Vec<u8>, content_type: &str) -> Result<Option<String>> {
        let url = format!("{}/analyze", self.endpoint.trim_end_matches('/'));
        debug!(content_type, size = bytes.len(), "submitting document for text extraction");

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .header("content-type", content_type)
            .body(bytes)
            .send()
            .await
            .context("text extraction request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("text extraction failed with status {status}: {body}");
        }

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .context("failed to decode text extraction response")?;

        Ok(parsed
            .content
            .filter(|content| !content.trim().is_empty()))
    }
}
