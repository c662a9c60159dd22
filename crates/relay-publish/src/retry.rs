//! Retry policy wrapper for publisher adapter calls, per the downstream
//! interface's §4.F retry rules.
//!
//! - 429: retry up to 3 times, sleeping `Retry-After + rand(1..3)` seconds.
//! - 5xx / transport timeout: retry up to 2 times, sleeping
//!   `attempt + rand(0..2)` seconds.
//! - Any other 4xx: no retry, surfaced immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::adapter::PublishError;

const MAX_RATE_LIMIT_RETRIES: u32 = 3;
const MAX_TRANSIENT_RETRIES: u32 = 2;

/// Runs `op` with the retry policy applied. `op_name` is used only for
/// tracing.
pub async fn with_retry<F, Fut, T>(op_name: &str, mut op: F) -> Result<T, PublishError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PublishError>>,
{
    let mut rate_limit_attempts = 0u32;
    let mut transient_attempts = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(PublishError::RateLimited { retry_after_secs }) => {
                if rate_limit_attempts >= MAX_RATE_LIMIT_RETRIES {
                    tracing::warn!(op_name, "rate limit retries exhausted");
                    return Err(PublishError::RateLimited { retry_after_secs });
                }
                rate_limit_attempts += 1;
                let jitter = rand::thread_rng().gen_range(1..=3);
                let sleep_secs = retry_after_secs.unwrap_or(0) + jitter;
                tracing::warn!(op_name, attempt = rate_limit_attempts, sleep_secs, "rate limited, retrying");
                tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
            }
            Err(PublishError::Transient(msg)) => {
                if transient_attempts >= MAX_TRANSIENT_RETRIES {
                    tracing::warn!(op_name, "transient retries exhausted");
                    return Err(PublishError::Transient(msg));
                }
                transient_attempts += 1;
                let jitter = rand::thread_rng().gen_range(0..=2);
                let sleep_secs = transient_attempts as u64 + jitter;
                tracing::warn!(op_name, attempt = transient_attempts, sleep_secs, error = %msg, "transient error, retrying");
                tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
            }
            Err(other) => return Err(other),
        }
    }
}
