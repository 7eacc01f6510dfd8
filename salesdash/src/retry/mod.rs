//! Retry Manager: exponential backoff around fallible async operations.
//!
//! - [`RetryPolicy`] and [`RetryPreset`] - attempt ceiling, delays, jitter
//! - [`RetryCondition`] and [`MessageClassifier`] - transient vs permanent
//! - [`RetryManager`] - runs an operation under a policy

mod condition;
mod manager;
mod policy;

pub use condition::{MessageClassifier, RetryCondition, Retryability};
pub use manager::{RetryError, RetryManager};
pub use policy::{MaxAttempts, RetryPolicy, RetryPreset};
