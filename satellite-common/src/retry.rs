use std::fmt;
use std::future::Future;
use std::time;

use tracing::warn;

/// Errors that know whether trying the same operation again could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Why `RetryPolicy::run` gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last_error: E },
    /// An attempt failed with an error that is not worth retrying.
    Permanent(E),
}

#[derive(Copy, Clone, Debug)]
/// Bounded exponential backoff: after failed attempt `n` we wait
/// `initial_interval * backoff_coefficient^(n - 1)`, capped at `maximum_interval`.
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    max_attempts: u32,
    /// Coefficient to multiply initial_interval with for every past attempt.
    backoff_coefficient: u32,
    /// The backoff interval for the first retry.
    initial_interval: time::Duration,
    /// The maximum possible backoff between retries.
    maximum_interval: Option<time::Duration>,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        backoff_coefficient: u32,
        initial_interval: time::Duration,
        maximum_interval: Option<time::Duration>,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_coefficient,
            initial_interval,
            maximum_interval,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Calculate how long to wait after the given (1-indexed) attempt failed.
    pub fn time_until_next_retry(&self, attempt: u32) -> time::Duration {
        let multiplier = self
            .backoff_coefficient
            .saturating_pow(attempt.saturating_sub(1));
        let candidate_interval = self.initial_interval.saturating_mul(multiplier);

        match self.maximum_interval {
            Some(max_interval) => std::cmp::min(candidate_interval, max_interval),
            None => candidate_interval,
        }
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or we run out
    /// of attempts. `operation` receives the 1-indexed attempt number.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_retryable() => return Err(RetryError::Permanent(error)),
                Err(error) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last_error: error,
                    })
                }
                Err(error) => {
                    let interval = self.time_until_next_retry(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        "attempt failed, retrying in {:?}: {}",
                        interval,
                        error
                    );
                    tokio::time::sleep(interval).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_coefficient: 2,
            initial_interval: time::Duration::from_secs(2),
            maximum_interval: None,
        }
    }
}
