//! Provider identifiers.

/// Supported completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// OpenAI-compatible chat completions (OpenAI, OpenRouter, vLLM, ...)
    OpenAi,
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "openrouter" => Some(Self::OpenAi),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    /// Get the canonical provider name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    /// Endpoint used when none is configured.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://openrouter.ai/api/v1",
            Self::Ollama => "http://localhost:11434",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::parse("openai"), Some(ProviderType::OpenAi));
        assert_eq!(ProviderType::parse("OpenRouter"), Some(ProviderType::OpenAi));
        assert_eq!(ProviderType::parse("ollama"), Some(ProviderType::Ollama));
        assert_eq!(ProviderType::parse("claude"), None);
    }
}
