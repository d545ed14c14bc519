//! Time bounds for external calls.

use ragbot_core::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;

/// Await `future`, failing with a retryable timeout error after `limit`.
pub async fn bounded<T, F>(operation: &str, limit: Duration, future: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{} exceeded {:?}", operation, limit);
            Err(AppError::timeout(operation, limit.as_secs()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_limit() {
        let value = bounded("noop", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_timeout_is_retryable() {
        let err = bounded("sleep", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(err.is_retryable());
        assert!(err.to_string().contains("sleep timed out"));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let err = bounded::<(), _>("fail", Duration::from_secs(1), async {
            Err(AppError::Validation("bad".to_string()))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
