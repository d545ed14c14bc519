//! Mapping of pipeline errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use ragbot_core::AppError;
use serde::{Deserialize, Serialize};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// An `AppError` on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Provider {
                retryable: true, ..
            } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Provider { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::warn!("Request rejected: {}", self.0);
        }

        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::Validation("q".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("f".into()), StatusCode::NOT_FOUND),
            (AppError::retryable("429"), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::fatal_provider("401"), StatusCode::BAD_GATEWAY),
            (
                AppError::DimensionMismatch {
                    expected: 1536,
                    actual: 768,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::Config("key".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
