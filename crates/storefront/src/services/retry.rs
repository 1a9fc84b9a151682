//! Shared retry policy.
//!
//! One abstraction for every bounded retry in the payment pipeline:
//! blockhash lookup, balance lookup, submission, and confirmation polling
//! all run through [`RetryPolicy::run`] with their own retryable-error
//! predicate, instead of each carrying its own loop and sleep constant.

use std::time::Duration;

use tracing::debug;

/// A bounded retry schedule: up to `max_attempts` tries, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Must be at least 1.
    pub max_attempts: u32,
    /// Fixed spacing between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy for quick lookups: 3 attempts, 1 second apart.
    pub const LOOKUP: Self = Self::new(3, Duration::from_secs(1));

    /// Policy for confirmation polling: 30 attempts, 1 second apart.
    pub const CONFIRMATION: Self = Self::new(30, Duration::from_secs(1));

    /// Create a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op` until it succeeds, the error is not retryable, or the
    /// attempt budget runs out. Returns the last error on exhaustion.
    ///
    /// # Errors
    ///
    /// Propagates the operation's error.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut op: F,
        retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && retryable(&err) => {
                    debug!(attempt, error = %err, "attempt failed; retrying");
                    tokio::time::sleep(self.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
