//! Exponential backoff, bounded by attempt count rather than wall clock.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::VaultError;

/// `(base_interval, max_attempts)` as accepted from configuration.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(base_interval: Duration, max_attempts: u32) -> Self {
        Self { base_interval, max_attempts }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let jitter_millis = rand::random::<u64>() % 100;
        self.base_interval.saturating_mul(factor) + Duration::from_millis(jitter_millis)
    }

    /// Run `op` up to `max_attempts` times. `op` returns `Ok` on success,
    /// `Err((retryable, error))` on failure — a non-retryable error (4xx)
    /// short-circuits immediately without consuming further attempts.
    /// Cancellation is checked before every attempt, including the first.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T, VaultError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, (bool, VaultError)>>,
    {
        let mut last_err = VaultError::ServiceUnavailable("no attempts made".into());
        for attempt in 0..self.max_attempts.max(1) {
            if cancel.is_cancelled() {
                return Err(VaultError::Cancelled);
            }
            match op().await {
                Ok(v) => return Ok(v),
                Err((retryable, err)) => {
                    last_err = err;
                    if !retryable {
                        tracing::error!(attempt, error = %last_err, "non-retryable failure, giving up");
                        return Err(last_err);
                    }
                    if attempt + 1 < self.max_attempts {
                        let backoff = self.backoff_for(attempt);
                        tracing::warn!(attempt, error = %last_err, backoff_ms = backoff.as_millis() as u64, "retrying after transient failure");
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }
        tracing::error!(attempts = self.max_attempts, error = %last_err, "retry attempts exhausted");
        Err(last_err)
    }
}
