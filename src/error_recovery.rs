// src/error_recovery.rs
//! Retry with exponential backoff for transient API failures, and panic
//! payload rendering for the isolation boundaries that catch them.

use crate::error::AppError;
use std::any::Any;
use std::time::Duration;

/// Retries an async operation with exponential backoff.
///
/// Only errors for which [`AppError::is_retryable`] holds are retried; any
/// other error is returned immediately so permission denials and client
/// errors surface on the first attempt.
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut delay = initial_delay;
    let mut last_error = None;

    for attempt in 1..=max_attempts.max(1) {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt < max_attempts {
                    log::warn!(
                        "Attempt {} failed ({}), retrying after {:?}",
                        attempt,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;

                    // Exponential backoff with cap
                    delay = std::cmp::min(delay * 2, max_delay);
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::InternalError {
        message: "Retry failed with no error".to_string(),
        source: None,
    }))
}

/// Renders a caught panic payload as text.
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
