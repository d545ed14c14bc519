//! Ollama embedding provider.
//!
//! Calls the local `/api/embeddings` endpoint once per text; models such as
//! `nomic-embed-text` produce 768-dimensional vectors.

use crate::embeddings::provider::EmbeddingProvider;
use ragbot_core::AppResult;
use ragbot_llm::http;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const EMBEDDING_ENDPOINT: &str = "/api/embeddings";

/// Ollama embedding provider using the local API
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

/// Request payload for Ollama embeddings API
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Response from Ollama embeddings API
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaProvider {
    pub const DEFAULT_URL: &'static str = "http://localhost:11434";

    pub fn new(base_url: &str, model: &str, dimensions: usize, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimensions,
        })
    }

    #[instrument(skip(self, text), fields(text_len = text.len()))]
    async fn embed_single(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| http::send_error("Ollama", e))?;

        let response = http::check_status("Ollama", response).await?;
        let body: EmbeddingResponse = http::decode_json("Ollama", response).await?;

        Ok(body.embedding)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        debug!("Embedding {} texts with Ollama model '{}'", texts.len(), self.model);

        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed_single(text).await?);
        }
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_embed_batch_one_request_per_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_partial_json(serde_json::json!({"model": "nomic-embed-text"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embedding": [0.5, 0.5]})),
            )
            .expect(3)
            .mount(&server)
            .await;

        let provider =
            OllamaProvider::new(&server.uri(), "nomic-embed-text", 2, Duration::from_secs(5))
                .unwrap();
        let texts: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let vectors = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[2], vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_missing_model_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"error": "model not found"})),
            )
            .mount(&server)
            .await;

        let provider =
            OllamaProvider::new(&server.uri(), "missing", 768, Duration::from_secs(5)).unwrap();
        let err = provider.embed("hello").await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("model not found"));
    }
}
