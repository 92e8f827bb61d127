//! Retry policy with exponential backoff
//!
//! Retries [`Error::Network`] and [`Error::RateLimited`]; every other error
//! is returned immediately. A rate-limit response that says how long to wait
//! is always waited out in full; when that wait is longer than `max_backoff`
//! the error is returned instead so the caller can stop for the cycle.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{Error, PollConfig, Result};

/// Retry policy for calls to remote APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Backoff before the first retry, doubled on each further retry
    pub initial_backoff: Duration,

    /// Upper bound for any single wait
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(300),
        }
    }
}

impl From<&PollConfig> for RetryPolicy {
    fn from(config: &PollConfig) -> Self {
        Self::new(config.max_retries, config.initial_backoff, config.max_backoff)
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom settings
    pub fn new(max_retries: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        }
    }

    /// Execute `operation`, retrying transient failures
    ///
    /// Returns the last error once retries are exhausted.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "Operation succeeded after retrying");
                    }
                    return Ok(result);
                }
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let Some(wait) = self.delay_for(&err, attempt) else {
                        warn!(error = %err, "Requested wait exceeds max backoff, not retrying");
                        return Err(err);
                    };
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        wait_secs = wait.as_secs_f64(),
                        error = %err,
                        "Transient failure, retrying"
                    );
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(attempts = attempt + 1, error = %err, "Giving up after retries");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// How long to wait before retrying after `err`
    ///
    /// `None` when the API asked for a longer wait than `max_backoff`.
    pub fn delay_for(&self, err: &Error, attempt: u32) -> Option<Duration> {
        match err {
            Error::RateLimited {
                retry_after: Some(wait),
            } => (*wait <= self.max_backoff).then_some(*wait),
            _ => Some(self.backoff(attempt)),
        }
    }

    /// Exponential backoff for a given attempt: min(initial * 2^attempt, max)
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(60))
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1), Duration::from_secs(20));

        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(16));
        assert_eq!(policy.backoff(5), Duration::from_secs(20)); // capped
        assert_eq!(policy.backoff(40), Duration::from_secs(20));
    }

    #[test]
    fn test_rate_limit_delay_honoured_in_full() {
        let policy = policy();
        let asked = Error::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(policy.delay_for(&asked, 0), Some(Duration::from_secs(30)));

        let at_limit = Error::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert_eq!(policy.delay_for(&at_limit, 0), Some(Duration::from_secs(60)));

        let too_long = Error::RateLimited {
            retry_after: Some(Duration::from_secs(900)),
        };
        assert_eq!(policy.delay_for(&too_long, 0), None);

        let silent = Error::RateLimited { retry_after: None };
        assert_eq!(policy.delay_for(&silent, 2), Some(Duration::from_secs(4)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_does_not_retry_before_long_rate_limit_ends() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result: Result<()> = policy()
            .execute(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::RateLimited {
                        retry_after: Some(Duration::from_secs(900)),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(Error::RateLimited { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_waits_for_retry_after() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = policy()
            .execute(|| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(Error::RateLimited {
                            retry_after: Some(Duration::from_secs(30)),
                        })
                    } else {
                        Ok("posted")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "posted");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = policy()
            .execute(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::Network("connection reset".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 4); // first try + 3 retries
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<()> = policy()
            .execute(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::Auth("invalid token".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
