//! Retry Manager: runs an async operation under a [`RetryPolicy`](super::RetryPolicy).

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use smol_str::SmolStr;
use thiserror::Error;
use tracing::{debug, warn};

use super::condition::{MessageClassifier, RetryCondition};
use super::policy::RetryPolicy;
use crate::metrics;

/// Terminal failure of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The condition judged the failure permanent; no further attempts ran.
    #[error("{label} failed on attempt {attempt} with a non-retryable error: {source}")]
    NonRetryable {
        /// Operation label.
        label: SmolStr,
        /// Attempt that produced the error (1-based).
        attempt: u32,
        /// The permanent error.
        #[source]
        source: E,
    },

    /// Every allowed attempt failed with a transient error.
    #[error(
        "{label} failed after {attempts} attempts ({}ms of backoff): {}",
        .total_delay.as_millis(),
        last_message(.errors)
    )]
    Exhausted {
        /// Operation label.
        label: SmolStr,
        /// Number of attempts made.
        attempts: u32,
        /// Sum of all backoff delays slept.
        total_delay: Duration,
        /// Every error observed, oldest first.
        errors: Vec<E>,
    },
}

fn last_message<E: Display>(errors: &[E]) -> String {
    errors
        .last()
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl<E> RetryError<E> {
    /// Operation label.
    pub fn label(&self) -> &str {
        match self {
            RetryError::NonRetryable { label, .. } | RetryError::Exhausted { label, .. } => label,
        }
    }

    /// Number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::NonRetryable { attempt, .. } => *attempt,
            RetryError::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// Returns `true` if the attempt budget ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// The most recent underlying error.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::NonRetryable { source, .. } => Some(source),
            RetryError::Exhausted { errors, .. } => errors.last(),
        }
    }

    /// Consumes the error, returning the most recent underlying error.
    pub fn into_last_error(self) -> Option<E> {
        match self {
            RetryError::NonRetryable { source, .. } => Some(source),
            RetryError::Exhausted { mut errors, .. } => errors.pop(),
        }
    }
}

/// Bookkeeping for one `execute_with_retry` call.
struct RetryState<E> {
    attempt: u32,
    total_delay: Duration,
    errors: Vec<E>,
}

/// Runs async operations under a [`RetryPolicy`].
///
/// Each failure is passed to the [`RetryCondition`]; permanent failures
/// surface immediately, transient ones are retried after an exponential
/// backoff delay until the attempt ceiling is reached.
///
/// # Examples
///
/// ```rust,ignore
/// let retry = RetryManager::new(RetryPolicy::realtime());
/// let value = retry
///     .execute_with_retry("totals", || source.fetch_totals(&range))
///     .await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryManager<C = MessageClassifier> {
    policy: RetryPolicy,
    condition: C,
}

impl RetryManager<MessageClassifier> {
    /// Creates a manager using the default message classifier.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            condition: MessageClassifier,
        }
    }
}

impl<C> RetryManager<C> {
    /// Creates a manager with a custom retry condition.
    pub fn with_condition(policy: RetryPolicy, condition: C) -> Self {
        Self { policy, condition }
    }

    /// The policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The retry condition in use.
    pub fn condition(&self) -> &C {
        &self.condition
    }

    /// Runs `operation` until it succeeds, fails permanently, or the
    /// attempt ceiling is reached.
    ///
    /// `operation` is invoked once per attempt and must build a fresh future
    /// each time.
    pub async fn execute_with_retry<T, E, F, Fut>(
        &self,
        label: &str,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        C: RetryCondition<E>,
    {
        let limit = self.policy.attempt_limit();
        let mut state = RetryState {
            attempt: 0,
            total_delay: Duration::ZERO,
            errors: Vec::new(),
        };

        loop {
            state.attempt += 1;
            metrics::record_attempt(label);

            let error = match operation().await {
                Ok(value) => {
                    if state.attempt > 1 {
                        debug!(
                            operation = label,
                            attempt = state.attempt,
                            "operation recovered after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.condition.should_retry(&error) {
                warn!(
                    operation = label,
                    attempt = state.attempt,
                    %error,
                    "non-retryable failure"
                );
                metrics::record_retry_failure(label, "non_retryable");
                return Err(RetryError::NonRetryable {
                    label: SmolStr::new(label),
                    attempt: state.attempt,
                    source: error,
                });
            }

            if state.attempt >= limit {
                warn!(
                    operation = label,
                    attempts = state.attempt,
                    %error,
                    "retry attempts exhausted"
                );
                state.errors.push(error);
                metrics::record_retry_failure(label, "exhausted");
                return Err(RetryError::Exhausted {
                    label: SmolStr::new(label),
                    attempts: state.attempt,
                    total_delay: state.total_delay,
                    errors: state.errors,
                });
            }

            let delay = self.policy.next_delay(state.attempt);
            debug!(
                operation = label,
                attempt = state.attempt,
                delay_ms = delay.as_millis() as u64,
                %error,
                "transient failure, backing off"
            );
            state.errors.push(error);
            tokio::time::sleep(delay).await;
            state.total_delay += delay;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use salesdash_core::FetchError;

    use super::*;
    use crate::retry::MaxAttempts;

    fn fixed_policy(max: u8) -> RetryPolicy {
        RetryPolicy::new(
            MaxAttempts::new(max).unwrap(),
            Duration::from_millis(1000),
            Duration::from_millis(3000),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_error_exhausts_attempts() {
        let retry = RetryManager::new(fixed_policy(4));
        let calls = Arc::new(AtomicU32::new(0));
        let start = tokio::time::Instant::now();

        let result: Result<(), _> = retry
            .execute_with_retry("totals", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::Http { status: 503 })
                }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), 4);
        // 1000 + 2000 + 3000 (capped)
        match &err {
            RetryError::Exhausted {
                total_delay,
                errors,
                ..
            } => {
                assert_eq!(*total_delay, Duration::from_millis(6000));
                assert_eq!(errors.len(), 4);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(start.elapsed(), Duration::from_millis(6000));
        assert!(err.to_string().contains("status: 503"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_on_first_attempt() {
        let retry = RetryManager::new(fixed_policy(5));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry
            .execute_with_retry("totals", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Http { status: 401 }) }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!err.is_exhausted());
        assert_eq!(err.last_error(), Some(&FetchError::Http { status: 401 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_error_is_not_retried() {
        let retry = RetryManager::new(fixed_policy(5));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry
            .execute_with_retry("breakdown", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Api("No data for period".into())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let retry = RetryManager::new(fixed_policy(3));
        let calls = AtomicU32::new(0);

        let value = retry
            .execute_with_retry("totals", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(FetchError::Timeout("5s".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_condition() {
        let condition = |error: &FetchError| error.status() == Some(429);
        let retry = RetryManager::with_condition(fixed_policy(2), condition);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry
            .execute_with_retry("totals", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Http { status: 429 }) }
            })
            .await;

        assert!(result.unwrap_err().is_exhausted());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_never_sleeps() {
        let retry = RetryManager::new(fixed_policy(1));
        let result: Result<(), _> = retry
            .execute_with_retry("totals", || async {
                Err(FetchError::Network("reset".into()))
            })
            .await;
        assert_eq!(result.unwrap_err().attempts(), 1);
    }
}
