use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observer::{RetryObserver, TracingObserver};

/// Retry policy for [`Retrier`].
///
/// An operation runs at most `max_retries + 1` times. The delay after failed
/// attempt `n` (0-indexed) is `min(base_delay * 2^n, max_delay)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Upper bound on the backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff delay after the given failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}

/// Every attempt of an operation failed.
#[derive(Debug, Error)]
#[error("{operation} failed after {attempts} attempts: {last_error}")]
pub struct RetryExhausted<E> {
    /// Name the caller gave the operation.
    pub operation: String,
    pub attempts: u32,
    pub last_error: E,
}

impl<E> RetryExhausted<E> {
    pub fn into_last_error(self) -> E {
        self.last_error
    }
}

/// Runs fallible async operations under a [`RetryPolicy`].
///
/// Backoff uses `tokio::time::sleep`, so only the calling task waits. There
/// is no cancellation: a started loop runs to success or exhaustion.
#[derive(Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    observer: Arc<dyn RetryObserver>,
}

impl fmt::Debug for Retrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retrier")
            .field("policy", &self.policy)
            .field("observer", &"...")
            .finish()
    }
}

impl Retrier {
    /// Create a retrier that reports through [`TracingObserver`].
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the observability hook.
    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `op` until it succeeds or the policy is exhausted.
    ///
    /// `op` is called once per attempt and must produce a fresh future each
    /// time.
    pub async fn execute<T, E, F, Fut>(
        &self,
        operation: &str,
        mut op: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            let number = attempt + 1;
            self.observer.on_attempt(operation, number, max_attempts);

            let delay = match op().await {
                Ok(value) => {
                    self.observer.on_success(operation, number);
                    return Ok(value);
                }
                Err(err) if number >= max_attempts => {
                    self.observer.on_exhausted(operation, number, &err);
                    return Err(RetryExhausted {
                        operation: operation.to_string(),
                        attempts: number,
                        last_error: err,
                    });
                }
                Err(err) => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    self.observer
                        .on_failure(operation, number, max_attempts, &err, delay);
                    delay
                }
            };

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Run `op` under `policy`, logging through [`TracingObserver`].
pub async fn retry_with_backoff<T, E, F, Fut>(
    operation: &str,
    policy: &RetryPolicy,
    op: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    Retrier::new(policy.clone()).execute(operation, op).await
}
