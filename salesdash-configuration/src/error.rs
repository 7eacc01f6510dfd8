use salesdash_reqwest::HttpSourceError;
use thiserror::Error;

/// Rejected or unusable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// An attempt ceiling outside 1..=16.
    #[error("retry policy {section}: max_attempts must be between 1 and 16, got {value}")]
    InvalidMaxAttempts {
        /// Retry section name.
        section: &'static str,
        /// Rejected value.
        value: u8,
    },

    /// A backoff factor below 1 or not a number.
    #[error("retry policy {section}: backoff_factor must be at least 1, got {value}")]
    InvalidBackoffFactor {
        /// Retry section name.
        section: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// A cache configured to hold nothing.
    #[error("cache {cache}: max_entries must be positive")]
    ZeroCapacity {
        /// Cache instance name.
        cache: &'static str,
    },

    /// `max_weeks` of zero would never produce a monthly breakdown.
    #[error("max_weeks must be positive")]
    ZeroMaxWeeks,

    /// A client was requested but no `upstream` section is present.
    #[error("upstream section is missing")]
    MissingUpstream,

    /// The upstream section is invalid.
    #[error(transparent)]
    Upstream(#[from] HttpSourceError),
}
