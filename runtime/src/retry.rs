//! Exponential backoff for fallible async operations
//!
//! Environment collaborators that talk to the network fail now and then for
//! reasons that go away on their own. [`retry_with_predicate`] re-runs such an
//! operation with growing pauses, and lets the caller say which errors are
//! worth another attempt.
//!
//! ```rust
//! use cinestate_runtime::retry::{RetryPolicy, retry_with_backoff};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), String> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(2)
//!     .initial_delay(Duration::from_millis(50))
//!     .build();
//!
//! let hits = retry_with_backoff(&policy, || async { Ok::<_, String>(7) }).await?;
//! assert_eq!(hits, 7);
//! # Ok(())
//! # }
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// How many times to retry and how long to pause in between
///
/// Defaults: 2 retries, 200ms first pause, doubling, never above 5s.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: usize,
    /// Pause before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single pause
    pub max_delay: Duration,
    /// Growth factor applied to the pause after each retry
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Builder starting from [`RetryPolicy::default`]
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder(Self::default())
    }

    /// Pause before retry number `retry` (counting from 0):
    /// `initial_delay * multiplier^retry`, clamped to `max_delay`
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn delay_for_attempt(&self, retry: usize) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);

        if millis.is_finite() && millis < self.max_delay.as_millis() as f64 {
            Duration::from_millis(millis.round().max(0.0) as u64)
        } else {
            self.max_delay
        }
    }
}

/// Builder for [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder(RetryPolicy);

impl RetryPolicyBuilder {
    /// Retries allowed after the first attempt
    #[must_use]
    pub const fn max_retries(mut self, max_retries: usize) -> Self {
        self.0.max_retries = max_retries;
        self
    }

    /// Pause before the first retry
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.0.initial_delay = delay;
        self
    }

    /// Upper bound for any single pause
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.0.max_delay = delay;
        self
    }

    /// Growth factor between pauses
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.0.multiplier = multiplier;
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        self.0
    }
}

/// [`retry_with_predicate`] treating every error as retryable
///
/// # Errors
///
/// Returns the last error once the retries are used up.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_with_predicate(policy, operation, |_| true).await
}

/// Run `operation` until it succeeds, fails with an error `is_retryable`
/// rejects, or `policy.max_retries` retries have been spent
///
/// # Errors
///
/// Returns the rejected error as soon as it occurs, otherwise the error of
/// the final attempt.
///
/// ```rust
/// use cinestate_runtime::retry::{RetryPolicy, retry_with_predicate};
///
/// # async fn example() {
/// let result = retry_with_predicate(
///     &RetryPolicy::default(),
///     || async { Err::<u8, _>("invalid api key") },
///     |err: &&str| err.starts_with("timeout"),
/// ).await;
/// assert_eq!(result, Err("invalid api key"));
/// # }
/// ```
pub async fn retry_with_predicate<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut retry = 0;
    loop {
        let error = match operation().await {
            Ok(value) => {
                if retry > 0 {
                    tracing::info!(retries = retry, "Recovered after retrying");
                }
                return Ok(value);
            },
            Err(error) => error,
        };

        if !is_retryable(&error) {
            tracing::debug!(%error, "Permanent failure, not retrying");
            return Err(error);
        }
        if retry >= policy.max_retries {
            tracing::warn!(retries = retry, %error, "Giving up after retries");
            return Err(error);
        }

        let pause = policy.delay_for_attempt(retry);
        tracing::warn!(retry, pause_ms = pause.as_millis(), %error, "Transient failure, retrying");
        tokio::time::sleep(pause).await;
        retry += 1;
    }
}
