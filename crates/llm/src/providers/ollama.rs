//! Ollama completion provider.
//!
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::http;
use ragbot_core::AppResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    options: GenerateOptions,
    stream: bool,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama completion client.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a client against `base_url` with every request bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http::build_client(timeout)?,
        })
    }

    fn to_generate_request(&self, request: &LlmRequest) -> GenerateRequest {
        GenerateRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: false,
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::debug!("Sending completion request to Ollama (model={})", request.model);

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&self.to_generate_request(request))
            .send()
            .await
            .map_err(|e| http::send_error("Ollama", e))?;

        let response = http::check_status("Ollama", response).await?;
        let generated: GenerateResponse = http::decode_json("Ollama", response).await?;

        tracing::debug!(
            "Received completion from Ollama ({} chars)",
            generated.response.len()
        );

        Ok(LlmResponse {
            content: generated.response,
            model: generated.model,
            usage: LlmUsage::new(
                generated.prompt_eval_count.unwrap_or(0),
                generated.eval_count.unwrap_or(0),
            ),
        })
    }
}
