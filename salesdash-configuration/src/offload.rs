use std::time::Duration;

use serde::{Deserialize, Serialize};

use salesdash::offload::{OffloadConfig, TimeoutPolicy};

/// What happens when a background revalidation exceeds its timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutMode {
    /// Abort the task.
    #[default]
    Cancel,
    /// Let it finish and log a warning.
    Warn,
}

/// Background revalidation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffloadSection {
    /// Time budget of one revalidation; unlimited when absent.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
    /// Applied once `timeout` is exceeded.
    #[serde(default)]
    pub on_timeout: TimeoutMode,
    /// One revalidation per cache key at a time.
    #[serde(default = "default_deduplicate")]
    pub deduplicate: bool,
}

fn default_deduplicate() -> bool {
    true
}

impl Default for OffloadSection {
    fn default() -> Self {
        Self {
            timeout: None,
            on_timeout: TimeoutMode::default(),
            deduplicate: true,
        }
    }
}

impl OffloadSection {
    /// Builds the manager configuration.
    pub fn into_offload_config(self) -> OffloadConfig {
        let timeout_policy = match (self.timeout, self.on_timeout) {
            (None, _) => TimeoutPolicy::None,
            (Some(limit), TimeoutMode::Cancel) => TimeoutPolicy::Cancel(limit),
            (Some(limit), TimeoutMode::Warn) => TimeoutPolicy::Warn(limit),
        };
        OffloadConfig::default()
            .timeout_policy(timeout_policy)
            .deduplicate(self.deduplicate)
    }
}
