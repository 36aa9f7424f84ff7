use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::{TransferError, TransferResult};

/// Bounded exponential backoff for transient backend failures.
///
/// One policy instance is shared by the part-upload and range-read paths;
/// both see the same transient-failure modes from the backend, so they get
/// the same treatment. Errors whose [`TransferError::is_transient`] is false
/// fail immediately without consuming any retry budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first (so 3 means up to 2 retries)
    pub max_attempts: u32,

    /// Delay before the first retry; doubles per attempt
    pub base_delay: Duration,

    /// Cap applied to the computed delay
    pub max_delay: Duration,

    /// Scale each delay by a random factor in [0.5, 1.0] to spread load
    /// across clients sharing backend rate limits
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total attempt budget (minimum 1)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the delay before the first retry
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the backoff cap
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Disable jitter (useful for deterministic tests)
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Delay before the retry following `attempt` (1-based)
    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        if self.jitter {
            backoff.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
        } else {
            backoff
        }
    }

    /// Run `make_attempt` until it succeeds, fails permanently, or the
    /// attempt budget is exhausted. Each call produces a fresh future, so the
    /// operation must capture everything it needs to re-run.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut make_attempt: F) -> TransferResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TransferResult<T>>,
    {
        let mut attempt = 1u32;
        loop {
            match make_attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient backend failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Apply a per-call deadline to a backend operation.
///
/// A deadline miss is a transient failure: it surfaces as
/// `BackendUnavailable` so the retry policy can re-attempt it.
pub async fn with_deadline<T, Fut>(
    limit: Duration,
    operation: &str,
    fut: Fut,
) -> TransferResult<T>
where
    Fut: Future<Output = TransferResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(TransferError::backend_unavailable(format!(
            "{operation}: no response within {limit:?}"
        ))),
    }
}
