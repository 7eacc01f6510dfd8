use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default path of the totals endpoint.
pub const DEFAULT_TOTALS_PATH: &str = "/api/sales/totals";
/// Default path of the breakdown endpoint.
pub const DEFAULT_BREAKDOWN_PATH: &str = "/api/sales/breakdown";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the upstream lives and how long a single request may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    /// Scheme and host, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Path of the totals endpoint.
    #[serde(default = "default_totals_path")]
    pub totals_path: String,
    /// Path of the breakdown endpoint.
    #[serde(default = "default_breakdown_path")]
    pub breakdown_path: String,
    /// Timeout of a single attempt; retries get a fresh budget each.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_totals_path() -> String {
    DEFAULT_TOTALS_PATH.to_owned()
}

fn default_breakdown_path() -> String {
    DEFAULT_BREAKDOWN_PATH.to_owned()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl HttpSourceConfig {
    /// Configuration with default paths and timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            totals_path: default_totals_path(),
            breakdown_path: default_breakdown_path(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the totals endpoint path.
    pub fn totals_path(mut self, path: impl Into<String>) -> Self {
        self.totals_path = path.into();
        self
    }

    /// Override the breakdown endpoint path.
    pub fn breakdown_path(mut self, path: impl Into<String>) -> Self {
        self.breakdown_path = path.into();
        self
    }

    /// Override the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
