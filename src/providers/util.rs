use crate::core::series::FetchError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries an async fetch while it fails with a retryable error
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result, the first non-retryable error, or the error
/// after all attempts
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries || !err.is_retryable() {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
