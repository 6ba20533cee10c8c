//! Exponential backoff for transient WooCommerce failures.
//!
//! Only 429 responses and network-level errors are retried. With the default
//! `max_retries = 0` every request is attempted exactly once.

use std::future::Future;
use std::time::Duration;

use crate::error::WooError;

fn is_retriable(err: &WooError) -> bool {
    matches!(err, WooError::RateLimited { .. } | WooError::Http(_))
}

/// Runs `operation`, retrying retriable errors up to `max_retries` more times.
///
/// The sleep before retry `n` (1-based) is `backoff_base_secs * 2^(n-1)`
/// seconds. Non-retriable errors are returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, WooError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, WooError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient WooCommerce error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}
