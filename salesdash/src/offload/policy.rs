//! Background revalidation settings.

use std::time::Duration;

/// Time budget of one background revalidation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// No budget.
    #[default]
    None,
    /// Abort the refresh once the budget is spent; the stale entry stays.
    Cancel(Duration),
    /// Let the refresh finish, then warn if it went over budget.
    Warn(Duration),
}

/// [`OffloadManager`](super::OffloadManager) settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffloadConfig {
    /// Budget of each refresh.
    pub timeout_policy: TimeoutPolicy,
    /// At most one refresh per cache key at a time.
    pub deduplicate: bool,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            timeout_policy: TimeoutPolicy::None,
            deduplicate: true,
        }
    }
}

impl OffloadConfig {
    /// Replace the timeout policy.
    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    /// Abort refreshes running longer than `limit`.
    pub fn timeout(self, limit: Duration) -> Self {
        self.timeout_policy(TimeoutPolicy::Cancel(limit))
    }

    /// Turn per-key deduplication on or off.
    pub fn deduplicate(mut self, enabled: bool) -> Self {
        self.deduplicate = enabled;
        self
    }
}
