//! # salesdash-configuration
//!
//! Declarative YAML configuration for a salesdash deployment.
//!
//! ```yaml
//! upstream:
//!   base_url: https://api.example.com
//!   timeout: 10s
//! caches:
//!   weekly:
//!     default_ttl: 5m
//!     max_entries: 50
//! retry:
//!   totals:
//!     preset: realtime
//!   breakdown:
//!     preset: background
//!     max_attempts: 4
//! stale_policy: offload_revalidate
//! loading:
//!   minimum_loading_time: 500ms
//! ```
//!
//! Every section is optional and falls back to the library defaults.
//! [`DashboardConfig::into_query`] wires the whole stack together.
#![warn(missing_docs)]

mod cache;
mod dashboard;
mod error;
mod offload;
mod retry;

pub use cache::CachesConfig;
pub use dashboard::DashboardConfig;
pub use error::ConfigError;
pub use offload::{OffloadSection, TimeoutMode};
pub use retry::{RetryConfig, RetrySection};

pub use salesdash_reqwest::HttpSourceConfig;
