//! Retry - Bounded retry loop for remote calls
//!
//! An operation classifies each failure as retryable or not. Retryable
//! failures are retried with a doubling delay until the policy's time
//! budget runs out; the last underlying error is then returned unchanged.

use std::future::Future;
use std::time::Duration;

use log::warn;
use tokio::time::{Instant, sleep};

/// Failure of one attempt
#[derive(Debug)]
pub enum RetryError<E> {
    /// Transient failure, try again
    Retryable(E),
    /// Permanent failure, stop immediately
    NonRetryable(E),
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Retryable(e) | RetryError::NonRetryable(e) => e,
        }
    }
}

/// Time budget and backoff of a retry loop
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Default budget for create calls
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Run `op` until it succeeds, fails permanently, or the budget is spent
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
    E: std::fmt::Display,
{
    let deadline = Instant::now() + policy.timeout;
    let mut delay = policy.initial_delay;
    let mut attempt = 1u32;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(RetryError::NonRetryable(e)) => return Err(e),
            Err(RetryError::Retryable(e)) => e,
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(err);
        }

        let wait = delay.min(deadline - now);
        warn!(
            "attempt {} failed with a retryable error, retrying in {:?}: {}",
            attempt, wait, err
        );
        sleep(wait).await;

        delay = (delay * 2).min(policy.max_delay);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quick(timeout_ms: u64) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(timeout_ms),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[test]
    fn default_policy_has_one_minute_budget() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.timeout, Duration::from_secs(60));
        assert!(policy.initial_delay < policy.max_delay);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<&str, String> = retry(&quick(2_000), || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RetryError::Retryable("Invalid IAM Instance Profile".to_string()))
                } else {
                    Ok("sig-1")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("sig-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), String> = retry(&quick(2_000), || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RetryError::NonRetryable("GROUP_DOESNT_EXIST".to_string()))
            }
        })
        .await;

        assert_eq!(result, Err("GROUP_DOESNT_EXIST".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_returns_last_error_verbatim() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<(), String> = retry(&quick(20), || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err(RetryError::Retryable(format!("attempt {}", n)))
            }
        })
        .await;

        let attempts = calls.load(Ordering::SeqCst);
        assert!(attempts > 1);
        assert_eq!(result, Err(format!("attempt {}", attempts - 1)));
    }
}
