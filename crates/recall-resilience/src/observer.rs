use std::fmt;
use std::time::Duration;

/// Observability hook for retry loops.
///
/// Attempt numbers are 1-indexed. All methods default to no-ops so
/// implementations only override what they care about.
pub trait RetryObserver: Send + Sync {
    fn on_attempt(&self, _operation: &str, _attempt: u32, _max_attempts: u32) {}

    /// A non-final attempt failed; the next one starts after `retry_in`.
    fn on_failure(
        &self,
        _operation: &str,
        _attempt: u32,
        _max_attempts: u32,
        _error: &dyn fmt::Display,
        _retry_in: Duration,
    ) {
    }

    fn on_success(&self, _operation: &str, _attempt: u32) {}

    fn on_exhausted(&self, _operation: &str, _attempts: u32, _error: &dyn fmt::Display) {}
}

/// Reports retry events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RetryObserver for TracingObserver {
    fn on_attempt(&self, operation: &str, attempt: u32, max_attempts: u32) {
        tracing::debug!(operation, attempt, max_attempts, "attempt started");
    }

    fn on_failure(
        &self,
        operation: &str,
        attempt: u32,
        max_attempts: u32,
        error: &dyn fmt::Display,
        retry_in: Duration,
    ) {
        tracing::warn!(
            operation,
            attempt,
            max_attempts,
            retry_in_ms = retry_in.as_millis() as u64,
            error = %error,
            "attempt failed, retrying"
        );
    }

    fn on_success(&self, operation: &str, attempt: u32) {
        if attempt > 1 {
            tracing::info!(operation, attempt, "succeeded after retry");
        }
    }

    fn on_exhausted(&self, operation: &str, attempts: u32, error: &dyn fmt::Display) {
        tracing::error!(operation, attempts, error = %error, "retries exhausted");
    }
}
