//! Bounded retry with exponential backoff.
//!
//! Only errors that report themselves as [`Retryable`] are retried. Every
//! other error is returned on first occurrence, and the last transient error
//! is returned once the attempt budget is spent. The delay schedule and the
//! sleeping between attempts come from the `backoff` crate.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{error, warn};

/// Errors that can tell whether another attempt might succeed.
pub trait Retryable {
    /// Returns true if the failed operation is worth repeating.
    fn is_retryable(&self) -> bool;
}

/// Retry budget and backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// A policy that retries without sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1,
        }
    }

    /// Builds the delay schedule for one [`run`](Self::run).
    ///
    /// The schedule never gives up on its own; the attempt budget bounds it.
    pub fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            randomization_factor: 0.0,
            multiplier: f64::from(self.multiplier.max(1)),
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        backoff.reset();
        backoff
    }

    /// Runs `f` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    ///
    /// `f` is called once per attempt, so it must be safe to repeat for the
    /// same input.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let attempts = AtomicU32::new(0);

        let try_once = || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            let fut = f();
            async move {
                fut.await.map_err(|e| {
                    if !e.is_retryable() {
                        return backoff::Error::permanent(e);
                    }
                    if attempt >= max_attempts {
                        error!(operation, attempts = attempt, error = %e, "Retry budget exhausted");
                        return backoff::Error::permanent(e);
                    }
                    backoff::Error::transient(e)
                })
            }
        };
        let notify = |e: E, delay: Duration| {
            warn!(
                operation,
                attempt = attempts.load(Ordering::SeqCst),
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %e,
                "Transient failure, retrying"
            );
        };

        backoff::future::retry_notify(self.backoff(), try_once, notify).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    fn next_millis(backoff: &mut ExponentialBackoff) -> Option<u128> {
        backoff.next_backoff().map(|d| d.as_millis())
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            multiplier: 2,
        };
        let mut backoff = policy.backoff();

        assert_eq!(next_millis(&mut backoff), Some(100));
        assert_eq!(next_millis(&mut backoff), Some(200));
        assert_eq!(next_millis(&mut backoff), Some(350));
        for _ in 0..40 {
            assert_eq!(next_millis(&mut backoff), Some(350));
        }
    }

    #[test]
    fn test_immediate_schedule_has_no_delay() {
        let mut backoff = RetryPolicy::immediate(3).backoff();
        assert_eq!(next_millis(&mut backoff), Some(0));
        assert_eq!(next_millis(&mut backoff), Some(0));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::immediate(3)
            .run("op", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TestError::Transient)
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::immediate(5)
            .run("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Fatal)
            })
            .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_transient_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::immediate(3)
            .run("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            })
            .await;

        assert_eq!(result, Err(TestError::Transient));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_none_makes_single_attempt() {
        let calls = AtomicU32::new(0);
        let _: Result<(), _> = RetryPolicy::none()
            .run("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_between_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            multiplier: 2,
        };
        let start = tokio::time::Instant::now();

        let _: Result<(), _> = policy.run("op", || async { Err(TestError::Transient) }).await;

        assert!(start.elapsed() >= Duration::from_millis(300));
    }
}
