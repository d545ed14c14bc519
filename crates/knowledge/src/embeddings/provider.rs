//! Embedding provider trait and factory.

use ragbot_core::config::EmbeddingSettings;
use ragbot_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

use super::providers::{MockProvider, OllamaProvider, OpenAiProvider};

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openai", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, one vector per text, in order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::fatal_provider("No embedding returned"))
    }
}

/// Create an embedding provider from configuration.
pub fn create_provider(
    settings: &EmbeddingSettings,
    timeout: Duration,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    tracing::debug!(
        "Creating embedding provider: provider={}, model={}, dimensions={}",
        settings.provider,
        settings.model,
        settings.dimensions
    );

    match settings.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(settings.dimensions))),

        "openai" => {
            let api_key = settings.api_key.as_deref().ok_or_else(|| {
                AppError::Config("OpenAI embedding provider requires an API key".to_string())
            })?;
            let endpoint = settings
                .endpoint
                .as_deref()
                .unwrap_or(OpenAiProvider::DEFAULT_URL);
            Ok(Arc::new(OpenAiProvider::new(
                endpoint,
                api_key,
                &settings.model,
                settings.dimensions,
                timeout,
            )?))
        }

        "ollama" => {
            let endpoint = settings
                .endpoint
                .as_deref()
                .unwrap_or(OllamaProvider::DEFAULT_URL);
            Ok(Arc::new(OllamaProvider::new(
                endpoint,
                &settings.model,
                settings.dimensions,
                timeout,
            )?))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, openai, ollama",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn mock_settings() -> EmbeddingSettings {
        EmbeddingSettings {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            ..EmbeddingSettings::default()
        }
    }

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&mock_settings(), TIMEOUT).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.model_name(), "trigram-v1");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_unknown_provider() {
        let settings = EmbeddingSettings {
            provider: "unknown".to_string(),
            ..mock_settings()
        };

        let result = create_provider(&settings, TIMEOUT);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[test]
    fn test_openai_requires_key() {
        let settings = EmbeddingSettings {
            provider: "openai".to_string(),
            api_key: None,
            ..mock_settings()
        };
        assert!(matches!(
            create_provider(&settings, TIMEOUT),
            Err(AppError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&mock_settings(), TIMEOUT).unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
