use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

const API_VERSION: &str = "2024-02-01";
const MAX_TEXT_LENGTH: usize = 100_000;

#[async_trait]
pub trait Summarizer: Send + Sync + 'static {
    async fn summarize(&self, text: &str, document_title: &str) -> Result<String>;
}

#[async_trait]
pub trait SectionExtractor: Send + Sync + 'static {
    /// Extracts structured content for the given comma-separated section keys
    /// and returns one JSON blob mapping keys to content.
    async fn extract_sections(&self, source_text: &str, section_keys: &str) -> Result<String>;
}

#[async_trait]
pub trait ContentValidator: Send + Sync + 'static {
    /// Scores extracted content against the serialized section rules. The
    /// response is JSON containing at least an `overallScore` in [0,1].
    async fn validate_content(&self, extracted_json: &str, rules_json: &str) -> Result<String>;
}

#[async_trait]
pub trait ContentEnhancer: Send + Sync + 'static {
    async fn enhance_content(&self, content_json: &str) -> Result<String>;
}

/// Chat-completions client for an Azure-hosted OpenAI deployment. One client
/// backs all four prompt surfaces.
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    chat_deployment: String,
}

impl OpenAiClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        chat_deployment: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            chat_deployment: chat_deployment.into(),
        }
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.chat_deployment,
            API_VERSION
        );

        let body = json!({
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.2,
        });

        debug!(deployment = %self.chat_deployment, "sending chat completion request");
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("chat completion failed with status {status}: {body}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("failed to decode chat completion response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("chat completion returned no choices")
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

fn truncate_for_prompt(text: &str) -> String {
    if text.len() <= MAX_TEXT_LENGTH {
        return text.to_string();
    }
    let mut cut = MAX_TEXT_LENGTH;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}\n\n[Note: document was truncated; the summary covers the first {MAX_TEXT_LENGTH} characters.]",
        &text[..cut]
    )
}

#[async_trait]
impl Summarizer for OpenAiClient {
    async fn summarize(&self, text: &str, document_title: &str) -> Result<String> {
        info!(title = %document_title, chars = text.len(), "summarizing document");
        let system = "You write concise executive summaries of presales documents. \
                      Summarize the key customer, problem, solution and outcome in a \
                      few short paragraphs.";
        let user = format!(
            "Document title: {document_title}\n\nDocument text:\n{}",
            truncate_for_prompt(text)
        );
        self.chat(system, &user).await
    }
}

#[async_trait]
impl SectionExtractor for OpenAiClient {
    async fn extract_sections(&self, source_text: &str, section_keys: &str) -> Result<String> {
        let system = "You are an expert at analyzing case study presentations and \
                      extracting structured content. Extract the content into sections \
                      and return valid JSON with the section keys provided. For bullet \
                      list sections, return an array of strings. For text sections, \
                      return a single string. If a section is not found in the text, \
                      use null for its value.";
        let user = format!(
            "Extract structured content from this case study text into the following \
             sections: {section_keys}\n\nText:\n{}",
            truncate_for_prompt(source_text)
        );
        self.chat(system, &user).await
    }
}

#[async_trait]
impl ContentValidator for OpenAiClient {
    async fn validate_content(&self, extracted_json: &str, rules_json: &str) -> Result<String> {
        let system = "You validate case study content against template rules. Return \
                      JSON with an overallScore between 0 and 1, plus per-section \
                      findings explaining any rule violations.";
        let user = format!(
            "Rules:\n{rules_json}\n\nExtracted content:\n{extracted_json}"
        );
        self.chat(system, &user).await
    }
}

#[async_trait]
impl ContentEnhancer for OpenAiClient {
    async fn enhance_content(&self, content_json: &str) -> Result<String> {
        let system = "You polish case study content for customer-facing decks. Improve \
                      clarity and impact without inventing facts. Return the same JSON \
                      structure with enhanced values.";
        self.chat(system, content_json).await
    }
}
