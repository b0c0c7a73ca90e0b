//! Bounded retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::warn;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 250;
const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

/// Retry policy for transient collaborator failures.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 disables retries).
    #[serde(default = "RetryPolicy::default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff before the first retry, in milliseconds.
    #[serde(default = "RetryPolicy::default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for any single backoff, in milliseconds.
    #[serde(default = "RetryPolicy::default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    const fn default_max_attempts() -> u32 {
        DEFAULT_MAX_ATTEMPTS
    }

    const fn default_base_delay_ms() -> u64 {
        DEFAULT_BASE_DELAY_MS
    }

    const fn default_max_delay_ms() -> u64 {
        DEFAULT_MAX_DELAY_MS
    }

    /// Backoff before retry number `attempt` (zero-based): exponential,
    /// capped, with uniform jitter over the upper half of the window.
    fn delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay_ms
            .saturating_mul(1_u64 << attempt.min(16))
            .min(self.max_delay_ms);
        let jittered = rand::thread_rng().gen_range(exp / 2..=exp.max(1));
        Duration::from_millis(jittered)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

/// Run `op` under the policy, retrying only errors `is_retryable` accepts.
///
/// The last error is returned once attempts are exhausted; non-retryable
/// errors return immediately.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    is_retryable: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < policy.max_attempts.max(1) && is_retryable(&e) => {
                let delay = policy.delay(attempt);
                warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "retrying after transient failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
