//! Retry-with-backoff combinator shared by item and ingredient calls.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

use crate::error::GenerationError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total calls are at most `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: u64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy without waiting, for tests.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 2,
            jitter: false,
        }
    }

    /// Delays between attempts: `base_delay * multiplier^n`, capped at
    /// `max_delay`, one per allowed retry.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let multiplier = self.multiplier.max(1);
        // ExponentialBackoff yields factor * multiplier^(n+1).
        let factor = self.base_delay.as_millis() as u64 / multiplier;
        ExponentialBackoff::from_millis(multiplier)
            .factor(factor)
            .max_delay(self.max_delay)
            .map(move |delay| self.jittered(delay))
            .take(self.max_retries as usize)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let jitter = rand::random::<f64>() * 0.3 + 0.85;
        Duration::from_millis((delay.as_millis() as f64 * jitter) as u64)
    }
}

/// Final result of a retried operation and how many attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, GenerationError>,
    pub attempts: u32,
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy runs out of retries. The closure receives the 1-based attempt
/// number.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let attempts = AtomicU32::new(0);

    let result = RetryIf::spawn(
        policy.delays(),
        || operation(attempts.fetch_add(1, Ordering::SeqCst) + 1),
        |err: &GenerationError| {
            let retryable = err.is_retryable();
            tracing::warn!(
                operation = operation_name,
                attempt = attempts.load(Ordering::SeqCst),
                retryable,
                error = %err,
                "Attempt failed"
            );
            retryable
        },
    )
    .await;

    RetryOutcome {
        result,
        attempts: attempts.load(Ordering::SeqCst),
    }
}
