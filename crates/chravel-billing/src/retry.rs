//! Retry with exponential backoff for billing calls.
//!
//! Backend calls can fail transiently (a cold edge function, a dropped
//! connection). [`with_retry_if`] retries only the errors a predicate marks
//! as retryable, backing off exponentially between attempts.
//!
//! # Example
//!
//! ```rust,no_run
//! use chravel_billing::retry::{with_retry_if, RetryConfig};
//!
//! #[derive(Debug)]
//! enum FetchError {
//!     Unavailable,
//!     Rejected,
//! }
//!
//! async fn example() -> Result<u32, FetchError> {
//!     with_retry_if(
//!         &RetryConfig::standard(),
//!         || async { Err(FetchError::Unavailable) },
//!         |err| matches!(err, FetchError::Unavailable),
//!     )
//!     .await
//! }
//! ```

use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Base for exponential backoff (typically 2.0)
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// Short delays, for calls made while the user is waiting on screen.
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
            exponential_base: 2.0,
        }
    }

    /// Balanced configuration for most calls.
    pub fn standard() -> Self {
        Self::default()
    }

    /// A single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            exponential_base: 1.0,
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::from_secs_f64(
            (delay.as_secs_f64() * self.exponential_base).min(self.max_delay.as_secs_f64()),
        )
    }
}

/// Execute `f`, retrying errors for which `is_retryable` returns true.
///
/// Non-retryable errors are returned immediately. After `max_attempts`
/// the last error is returned.
pub async fn with_retry_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    mut f: F,
    mut is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
    P: FnMut(&E) -> bool,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match f().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Billing call succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if !is_retryable(&e) => {
                tracing::debug!(error = ?e, "Billing error is not retryable");
                return Err(e);
            }
            Err(e) if attempt >= config.max_attempts => {
                tracing::warn!(attempts = attempt, error = ?e, "Billing call retries exhausted");
                return Err(e);
            }
            Err(e) => {
                tracing::debug!(
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = ?e,
                    "Billing call failed, retrying"
                );

                sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}
