//! Shared HTTP plumbing for provider adapters.
//!
//! Every outbound call in the workspace goes through a client built here, so
//! timeouts and the retryable/fatal classification stay uniform across the
//! language model, embedding and vector store adapters.

use ragbot_core::{AppError, AppResult};
use reqwest::{Response, StatusCode};
use std::time::Duration;

/// Build a reqwest client whose requests are bounded by `timeout`.
pub fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Whether a response status is worth retrying.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Classify a transport failure.
///
/// Timeouts and connection failures are transient; anything else (bad URL,
/// body encoding) will fail the same way on retry.
pub fn send_error(service: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::retryable(format!("{} request timed out: {}", service, err))
    } else if err.is_connect() || err.is_request() {
        AppError::retryable(format!("Failed to reach {}: {}", service, err))
    } else {
        AppError::fatal_provider(format!("{} request failed: {}", service, err))
    }
}

/// Pass successful responses through; turn error statuses into provider errors.
pub async fn check_status(service: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    let message = format!("{} API error ({}): {}", service, status, error_text);

    Err(AppError::Provider {
        message,
        retryable: is_retryable_status(status),
    })
}

/// Decode a JSON body, reporting malformed payloads as fatal provider errors.
pub async fn decode_json<T>(service: &str, response: Response) -> AppResult<T>
where
    T: serde::de::DeserializeOwned,
{
    response
        .json::<T>()
        .await
        .map_err(|e| AppError::fatal_provider(format!("Failed to parse {} response: {}", service, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }
}
