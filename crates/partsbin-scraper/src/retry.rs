//! Exponential backoff with jitter for transient outbound failures.
//!
//! Shared by the web scraper and the supplier adapters: any error type that
//! implements [`Retriable`] can be driven through [`retry_with_backoff`].

use std::future::Future;
use std::time::Duration;

/// Upper bound on a single backoff sleep.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Classifies an error as transient (worth retrying) or permanent.
pub trait Retriable: std::fmt::Display {
    fn is_retriable(&self) -> bool;

    /// Server-requested wait before the next attempt (`Retry-After`), if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// The sleep before retry `n` (1-based) is `backoff_base_secs * 2^(n-1)` with
/// ±25 % jitter, raised to the error's `Retry-After` when that is longer, and
/// capped at 60 s. Non-retriable errors are returned immediately.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// non-retriable error.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, E>
where
    E: Retriable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = backoff_delay(backoff_base_secs, attempt, err.retry_after());
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient error, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn backoff_delay(backoff_base_secs: u64, attempt: u32, retry_after: Option<Duration>) -> Duration {
    let base_ms = backoff_base_secs
        .saturating_mul(1000)
        .saturating_mul(1u64 << (attempt.saturating_sub(1)).min(10));
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered_ms = (base_ms as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    let computed = Duration::from_millis(jittered_ms);
    computed.max(retry_after.unwrap_or_default()).min(MAX_DELAY)
}
