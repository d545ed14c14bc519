//! Error types for ragbot.
//!
//! One enum covers the whole taxonomy used by the pipeline: configuration,
//! provider (embedder, vector store, language model), dimension mismatch,
//! not-found, validation, prompt rendering, I/O and serialization.

use thiserror::Error;

/// Unified error type for ragbot.
///
/// Every fallible function in the workspace returns `Result<T, AppError>`.
/// Provider failures carry a `retryable` tag so the calling layer can decide
/// on a backoff policy; the core never retries on its own.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid settings or missing credentials. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An embedding, vector store or language model call failed.
    #[error("Provider error: {message}")]
    Provider { message: String, retryable: bool },

    /// Index or vector dimensionality does not match the embedding model.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Requested document or source does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request, rejected before any external call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// A provider failure that a caller may retry (timeouts, network, 429, 5xx).
    pub fn retryable(message: impl Into<String>) -> Self {
        AppError::Provider {
            message: message.into(),
            retryable: true,
        }
    }

    /// A provider failure that will not succeed on retry (auth, bad request).
    pub fn fatal_provider(message: impl Into<String>) -> Self {
        AppError::Provider {
            message: message.into(),
            retryable: false,
        }
    }

    /// Timeout of an external call named `operation`.
    pub fn timeout(operation: &str, secs: u64) -> Self {
        AppError::retryable(format!("{} timed out after {}s", operation, secs))
    }

    /// Whether a calling layer may retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Provider { retryable: true, .. })
    }

    /// Short machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIGURATION_ERROR",
            AppError::Provider { .. } => "PROVIDER_ERROR",
            AppError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Prompt(_) => "PROMPT_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
