use std::future::Future;
use std::time::Duration;

use acervo_core::{AppError, AppResult};

/// Run a transport call under a deadline. Expiry becomes `AppError::Timeout`.
pub async fn with_deadline<F, T>(operation: &str, after: Duration, future: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation = operation, after_ms = after.as_millis() as u64, "Deadline exceeded");
            Err(AppError::Timeout {
                operation: operation.to_string(),
                after,
            })
        }
    }
}
