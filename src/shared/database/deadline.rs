// src/shared/database/deadline.rs

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::errors::DatabaseError;

/// Runs `op` under an optional deadline. On expiry the future is dropped,
/// which cancels the in-flight statement. A zero deadline has already
/// passed, so `op` is never polled.
pub async fn run_with_deadline<T, F>(
    deadline: Option<Duration>,
    context: &'static str,
    op: F,
) -> Result<T, DatabaseError>
where
    F: Future<Output = Result<T, DatabaseError>>,
{
    let Some(limit) = deadline else {
        return op.await;
    };

    if !limit.is_zero() {
        if let Ok(result) = tokio::time::timeout(limit, op).await {
            return result;
        }
    }

    warn!(
        context,
        deadline_ms = limit.as_millis() as u64,
        "database operation exceeded deadline"
    );
    Err(DatabaseError::deadline_exceeded(context, limit))
}
