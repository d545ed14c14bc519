//! LLM provider factory.
//!
//! Resolves a provider name from configuration into a shared client.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use ragbot_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "openrouter", "ollama")
/// * `endpoint` - Optional base URL; the provider default is used otherwise
/// * `api_key` - API key, required by OpenAI-compatible providers
/// * `timeout` - Bound applied to every completion call
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required key is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown LLM provider: {}", provider)))?;
    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());

    tracing::debug!("Creating {} client at {}", provider_type.as_str(), base_url);

    match provider_type {
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::new(base_url, timeout)?)),
        ProviderType::OpenAi => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("OpenAI-compatible provider requires API key".to_string())
            })?;
            Ok(Arc::new(OpenAiClient::new(base_url, api_key, timeout)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None, TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_openai_client() {
        let client = create_client("openrouter", None, Some("sk-or"), TIMEOUT).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None, TIMEOUT) {
            Err(err) => assert!(err.to_string().contains("requires API key")),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", None, None, TIMEOUT) {
            Err(err) => assert!(err.to_string().contains("Unknown LLM provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
