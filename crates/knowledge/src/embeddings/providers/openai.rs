//! OpenAI-compatible embeddings provider.
//!
//! Speaks `POST {base_url}/embeddings`, which OpenAI, OpenRouter and most
//! self-hosted gateways implement.

use crate::embeddings::provider::EmbeddingProvider;
use ragbot_core::{AppError, AppResult};
use ragbot_llm::http;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Remote embeddings over an OpenAI-compatible API.
#[derive(Debug)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiProvider {
    pub const DEFAULT_URL: &'static str = "https://openrouter.ai/api/v1";

    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        dimensions: usize,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[tracing::instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| http::send_error("Embeddings", e))?;

        let response = http::check_status("Embeddings", response).await?;
        let mut body: EmbeddingResponse = http::decode_json("embeddings", response).await?;

        if body.data.len() != texts.len() {
            return Err(AppError::fatal_provider(format!(
                "Embeddings API returned {} vectors for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);
        tracing::debug!("Received {} embeddings", body.data.len());

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}
