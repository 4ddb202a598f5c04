//! Bounded retry with exponential backoff.
//!
//! Every outbound call to a remote backend goes through [`Retrier::execute`].
//! Exhaustion is reported as a value ([`RetryExhausted`]) so the caller picks
//! its own fallback: a degraded empty result for reads, a hard error for writes.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use recall_resilience::{Retrier, RetryPolicy};
//!
//! # async fn example() {
//! let retrier = Retrier::new(RetryPolicy::new(2, Duration::from_millis(500)));
//! let outcome = retrier
//!     .execute("ping", || async { Ok::<_, std::io::Error>(42) })
//!     .await;
//! assert_eq!(outcome.ok(), Some(42));
//! # }
//! ```

mod observer;
mod retry;

pub use observer::{RetryObserver, TracingObserver};
pub use retry::{retry_with_backoff, Retrier, RetryExhausted, RetryPolicy};
