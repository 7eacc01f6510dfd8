use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use salesdash::coordinator::DEFAULT_MAX_WEEKS;
use salesdash::offload::OffloadManager;
use salesdash::{
    CoordinatorOptions, LoadingOptions, PeriodQuery, RequestCoordinator, StalePolicy,
};
use salesdash_reqwest::{HttpSalesSource, HttpSourceConfig};

use crate::cache::CachesConfig;
use crate::error::ConfigError;
use crate::offload::OffloadSection;
use crate::retry::RetrySection;

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// HTTP upstream; required only to build a client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<HttpSourceConfig>,
    /// Cache instances.
    #[serde(default)]
    pub caches: CachesConfig,
    /// Retry policies per fetch kind.
    #[serde(default)]
    pub retry: RetrySection,
    /// Stale entry handling.
    #[serde(default)]
    pub stale_policy: StalePolicy,
    /// Cap on weeks in a monthly breakdown.
    #[serde(default = "default_max_weeks")]
    pub max_weeks: usize,
    /// Loading signal timing.
    #[serde(default)]
    pub loading: LoadingOptions,
    /// Background revalidation.
    #[serde(default)]
    pub offload: OffloadSection,
}

fn default_max_weeks() -> usize {
    DEFAULT_MAX_WEEKS
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            upstream: None,
            caches: CachesConfig::default(),
            retry: RetrySection::default(),
            stale_policy: StalePolicy::default(),
            max_weeks: DEFAULT_MAX_WEEKS,
            loading: LoadingOptions::default(),
            offload: OffloadSection::default(),
        }
    }
}

impl DashboardConfig {
    /// Parses a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Reads and parses a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading dashboard configuration");
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Coordinator settings; validates retry overrides and `max_weeks`.
    pub fn coordinator_options(&self) -> Result<CoordinatorOptions, ConfigError> {
        if self.max_weeks == 0 {
            return Err(ConfigError::ZeroMaxWeeks);
        }
        let (totals_retry, breakdown_retry) = self.retry.clone().into_policies()?;
        Ok(CoordinatorOptions {
            stale_policy: self.stale_policy,
            max_weeks: self.max_weeks,
            totals_retry,
            breakdown_retry,
        })
    }

    /// Builds a coordinator over the configured HTTP upstream.
    pub fn into_coordinator(self) -> Result<RequestCoordinator<HttpSalesSource>, ConfigError> {
        let options = self.coordinator_options()?;
        let upstream = self.upstream.ok_or(ConfigError::MissingUpstream)?;
        let source = HttpSalesSource::new(upstream)?;
        let caches = self.caches.into_cache_set()?;
        let offload = OffloadManager::new(self.offload.into_offload_config());
        Ok(RequestCoordinator::with_offload(
            source, caches, options, offload,
        ))
    }

    /// Builds the consumer-facing query over the configured HTTP upstream.
    pub fn into_query(self) -> Result<PeriodQuery<HttpSalesSource>, ConfigError> {
        let loading = self.loading;
        Ok(PeriodQuery::new(self.into_coordinator()?, loading))
    }
}
