//! Deciding whether a failure is worth another attempt.

use std::fmt::Display;
use std::sync::LazyLock;

use regex::Regex;

/// Decides whether a failed attempt should be retried.
///
/// Implemented for any `Fn(&E) -> bool`, so callers can pass a closure where
/// the default message classifier does not fit.
pub trait RetryCondition<E>: Send + Sync {
    /// Returns `true` when the error is transient.
    fn should_retry(&self, error: &E) -> bool;
}

impl<E, F> RetryCondition<E> for F
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &E) -> bool {
        self(error)
    }
}

/// Outcome of classifying an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    /// Matches a transient failure pattern.
    Retryable,
    /// Matches a permanent failure pattern.
    NonRetryable,
    /// Matches nothing known.
    Unknown,
}

const RETRYABLE_PHRASES: &[&str] = &[
    "network",
    "timeout",
    "timed out",
    "connection",
    "overloaded",
    "took too long",
    "execution time",
    "abort",
];

const NON_RETRYABLE_PHRASES: &[&str] = &[
    "unauthorized",
    "forbidden",
    "session expired",
    "csrf",
    "validation",
    "unprocessable",
];

static RETRYABLE_STATUS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b50[0234]\b").ok());

static NON_RETRYABLE_STATUS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(40[0134]|422)\b").ok());

/// Default classifier working on the error's display text.
///
/// Permanent patterns take precedence over transient ones, and anything
/// unrecognized is treated as permanent.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageClassifier;

impl MessageClassifier {
    /// Classifies a raw error message.
    pub fn classify(message: &str) -> Retryability {
        let message = message.to_lowercase();
        if matches(&message, NON_RETRYABLE_PHRASES, &NON_RETRYABLE_STATUS) {
            Retryability::NonRetryable
        } else if matches(&message, RETRYABLE_PHRASES, &RETRYABLE_STATUS) {
            Retryability::Retryable
        } else {
            Retryability::Unknown
        }
    }
}

fn matches(message: &str, phrases: &[&str], status: &LazyLock<Option<Regex>>) -> bool {
    phrases.iter().any(|phrase| message.contains(phrase))
        || status
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(message))
}

impl<E: Display> RetryCondition<E> for MessageClassifier {
    fn should_retry(&self, error: &E) -> bool {
        Self::classify(&error.to_string()) == Retryability::Retryable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesdash_core::FetchError;

    #[test]
    fn test_transient_messages() {
        for message in [
            "HTTP error! status: 503",
            "HTTP error! status: 500",
            "Network request failed",
            "request timeout: 5s",
            "Connection reset by peer",
            "Server overloaded, try later",
            "Query took too long",
            "maximum execution time exceeded",
            "The operation was aborted",
        ] {
            assert_eq!(
                MessageClassifier::classify(message),
                Retryability::Retryable,
                "{message}"
            );
        }
    }

    #[test]
    fn test_permanent_messages() {
        for message in [
            "HTTP error! status: 401",
            "HTTP error! status: 404",
            "HTTP error! status: 422",
            "Unauthorized",
            "Session expired, please log in",
            "CSRF token mismatch",
        ] {
            assert_eq!(
                MessageClassifier::classify(message),
                Retryability::NonRetryable,
                "{message}"
            );
        }
    }

    #[test]
    fn test_permanent_wins_over_transient() {
        assert_eq!(
            MessageClassifier::classify("network layer returned 403 forbidden"),
            Retryability::NonRetryable
        );
    }

    #[test]
    fn test_unknown_is_not_retried() {
        assert_eq!(
            MessageClassifier::classify("something odd happened"),
            Retryability::Unknown
        );
        assert!(!MessageClassifier.should_retry(&FetchError::Api("no data".into())));
    }

    #[test]
    fn test_status_codes_need_word_boundaries() {
        assert_eq!(
            MessageClassifier::classify("store 15030 missing"),
            Retryability::Unknown
        );
    }

    #[test]
    fn test_fetch_errors() {
        assert!(MessageClassifier.should_retry(&FetchError::Http { status: 502 }));
        assert!(!MessageClassifier.should_retry(&FetchError::Http { status: 400 }));
        assert!(MessageClassifier.should_retry(&FetchError::Timeout("10s".into())));
    }

    #[test]
    fn test_closure_condition() {
        let condition = |error: &FetchError| error.status() == Some(429);
        assert!(condition.should_retry(&FetchError::Http { status: 429 }));
    }
}
