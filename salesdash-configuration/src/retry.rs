use std::time::Duration;

use serde::{Deserialize, Serialize};

use salesdash::retry::MaxAttempts;
use salesdash::{RetryPolicy, RetryPreset};

use crate::error::ConfigError;

/// A named preset with optional per-field overrides.
///
/// ```yaml
/// preset: background
/// max_attempts: 4
/// jitter: false
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base policy.
    #[serde(default)]
    pub preset: RetryPreset,
    /// Overrides the preset's attempt ceiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u8>,
    /// Overrides the preset's first delay.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub base_delay: Option<Duration>,
    /// Overrides the preset's delay cap.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<Duration>,
    /// Overrides the preset's growth factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,
    /// Overrides the preset's jitter switch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<bool>,
}

impl RetryConfig {
    /// Configuration using a preset as is.
    pub fn preset(preset: RetryPreset) -> Self {
        Self {
            preset,
            ..Self::default()
        }
    }

    fn into_policy(self, section: &'static str) -> Result<RetryPolicy, ConfigError> {
        let mut policy = self.preset.policy();
        if let Some(value) = self.max_attempts {
            policy.max_attempts = MaxAttempts::new(value)
                .ok_or(ConfigError::InvalidMaxAttempts { section, value })?;
        }
        if let Some(base_delay) = self.base_delay {
            policy.base_delay = base_delay;
        }
        if let Some(max_delay) = self.max_delay {
            policy.max_delay = max_delay;
        }
        if let Some(value) = self.backoff_factor {
            if value.is_nan() || value < 1.0 {
                return Err(ConfigError::InvalidBackoffFactor { section, value });
            }
            policy.backoff_factor = value;
        }
        if let Some(jitter) = self.jitter {
            policy.jitter = jitter;
        }
        Ok(policy)
    }
}

/// Retry policies per fetch kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySection {
    /// Current and comparison totals.
    #[serde(default = "totals_default")]
    pub totals: RetryConfig,
    /// Batched breakdown.
    #[serde(default = "breakdown_default")]
    pub breakdown: RetryConfig,
}

fn totals_default() -> RetryConfig {
    RetryConfig::preset(RetryPreset::Realtime)
}

fn breakdown_default() -> RetryConfig {
    RetryConfig::preset(RetryPreset::Background)
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            totals: totals_default(),
            breakdown: breakdown_default(),
        }
    }
}

impl RetrySection {
    /// Resolves both policies, totals first.
    pub fn into_policies(self) -> Result<(RetryPolicy, RetryPolicy), ConfigError> {
        Ok((
            self.totals.into_policy("totals")?,
            self.breakdown.into_policy("breakdown")?,
        ))
    }
}
