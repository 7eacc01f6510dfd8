//! Retry policies and presets.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bounded_integer::bounded_integer;
use rand::Rng;
use serde::{Deserialize, Serialize};

bounded_integer! {
    /// Attempt ceiling for one retried operation (1-16).
    /// A value of 1 means the operation runs once and is never retried.
    #[repr(u8)]
    pub struct MaxAttempts { 1..=16 }
}

/// Share of the backoff delay that jitter may add on top.
const JITTER_RATIO: f64 = 0.25;

/// Exponential backoff settings for the retry manager.
///
/// The delay after failed attempt `n` (1-based) is
/// `min(base_delay * backoff_factor^(n - 1), max_delay)`, plus up to 25%
/// random jitter when enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, first call included.
    pub max_attempts: MaxAttempts,
    /// Delay after the first failed attempt.
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Upper bound for any single delay, before jitter.
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub backoff_factor: f64,
    /// Add random jitter on top of each delay.
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::realtime()
    }
}

impl RetryPolicy {
    /// Creates a policy without jitter.
    pub fn new(max_attempts: MaxAttempts, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            backoff_factor: 2.0,
            jitter: false,
        }
    }

    /// Patient policy for data the dashboard cannot render without.
    pub fn critical() -> Self {
        Self {
            max_attempts: attempts(5),
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter: true,
        }
    }

    /// Snappy policy for figures the user is waiting on.
    pub fn realtime() -> Self {
        Self {
            max_attempts: attempts(3),
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            jitter: true,
        }
    }

    /// Very patient policy for work nobody is watching.
    pub fn background() -> Self {
        Self {
            max_attempts: attempts(7),
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            jitter: true,
        }
    }

    /// Fast-fail policy for direct user interactions.
    pub fn interactive() -> Self {
        Self {
            max_attempts: attempts(2),
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(1),
            backoff_factor: 1.5,
            jitter: false,
        }
    }

    /// Set the attempt ceiling.
    pub fn max_attempts(self, max_attempts: MaxAttempts) -> Self {
        Self {
            max_attempts,
            ..self
        }
    }

    /// Set the growth factor; values below 1 are raised to 1.
    pub fn backoff_factor(self, factor: f64) -> Self {
        Self {
            backoff_factor: if factor.is_finite() { factor.max(1.0) } else { 1.0 },
            ..self
        }
    }

    /// Enable or disable jitter.
    pub fn jitter(self, jitter: bool) -> Self {
        Self { jitter, ..self }
    }

    /// Attempt ceiling as a plain number.
    #[inline]
    pub fn attempt_limit(&self) -> u32 {
        u32::from(self.max_attempts.get())
    }

    /// Backoff delay after failed attempt `attempt` (1-based), without jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let multiplier = self.backoff_factor.max(1.0).powi(exponent);
        let uncapped = self.base_delay.as_secs_f64() * multiplier;
        if !uncapped.is_finite() || uncapped >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        self.base_delay.mul_f64(multiplier)
    }

    /// Backoff delay after failed attempt `attempt`, jitter applied when enabled.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay_for_attempt(attempt);
        if !self.jitter {
            return delay;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let jitter_range = (delay.as_millis() as f64 * JITTER_RATIO) as u64;
        if jitter_range == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::rng().random_range(0..=jitter_range))
    }
}

fn attempts(n: u8) -> MaxAttempts {
    MaxAttempts::new(n).unwrap_or(MaxAttempts::MIN)
}

/// Named retry policies selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetryPreset {
    /// See [`RetryPolicy::critical`].
    Critical,
    /// See [`RetryPolicy::realtime`].
    #[default]
    Realtime,
    /// See [`RetryPolicy::background`].
    Background,
    /// See [`RetryPolicy::interactive`].
    Interactive,
}

impl RetryPreset {
    /// Returns the preset name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            RetryPreset::Critical => "critical",
            RetryPreset::Realtime => "realtime",
            RetryPreset::Background => "background",
            RetryPreset::Interactive => "interactive",
        }
    }

    /// Builds the policy for this preset.
    pub fn policy(&self) -> RetryPolicy {
        match self {
            RetryPreset::Critical => RetryPolicy::critical(),
            RetryPreset::Realtime => RetryPolicy::realtime(),
            RetryPreset::Background => RetryPolicy::background(),
            RetryPreset::Interactive => RetryPolicy::interactive(),
        }
    }
}

impl fmt::Display for RetryPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(RetryPreset::Critical),
            "realtime" => Ok(RetryPreset::Realtime),
            "background" => Ok(RetryPreset::Background),
            "interactive" => Ok(RetryPreset::Interactive),
            other => Err(format!("unknown retry preset: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_growth_and_cap() {
        let policy = RetryPolicy::new(
            attempts(5),
            Duration::from_millis(1000),
            Duration::from_millis(5000),
        );
        let delays: Vec<_> = (1..=5).map(|n| policy.delay_for_attempt(n)).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
                Duration::from_millis(5000),
                Duration::from_millis(5000),
            ]
        );
    }

    #[test]
    fn test_no_jitter_is_deterministic() {
        let policy = RetryPolicy::interactive();
        assert_eq!(policy.next_delay(1), Duration::from_millis(300));
        assert_eq!(policy.next_delay(2), Duration::from_millis(450));
    }

    #[test]
    fn test_jitter_stays_within_quarter() {
        let policy = RetryPolicy::new(attempts(3), Duration::from_millis(1000), Duration::from_secs(10))
            .jitter(true);
        for _ in 0..100 {
            let delay = policy.next_delay(1);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1250));
        }
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let policy = RetryPolicy::critical();
        assert_eq!(policy.delay_for_attempt(u32::MAX), policy.max_delay);
    }

    #[test]
    fn test_presets_differ() {
        assert_eq!(RetryPolicy::critical().attempt_limit(), 5);
        assert_eq!(RetryPolicy::realtime().attempt_limit(), 3);
        assert_eq!(RetryPolicy::background().attempt_limit(), 7);
        assert_eq!(RetryPolicy::interactive().attempt_limit(), 2);
        assert!(!RetryPolicy::interactive().jitter);
        assert_eq!(
            "background".parse::<RetryPreset>().unwrap().policy(),
            RetryPolicy::background()
        );
    }
}
