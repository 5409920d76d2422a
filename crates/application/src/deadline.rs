use std::future::Future;
use std::time::Duration;

use scholaris_core::{RbacError, RbacResult};

/// Runs an operation under a caller-supplied deadline.
///
/// The operation future is dropped on timeout, which cancels the in-flight
/// store call and rolls back its transaction.
pub async fn with_deadline<T, F>(timeout: Duration, operation: F) -> RbacResult<T>
where
    F: Future<Output = RbacResult<T>>,
{
    tokio::time::timeout(timeout, operation)
        .await
        .map_err(|_| {
            RbacError::DeadlineExceeded(format!(
                "operation did not complete within {} ms",
                timeout.as_millis()
            ))
        })?
}
