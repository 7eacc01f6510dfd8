use thiserror::Error;

/// Failure to construct an [`HttpSalesSource`](crate::HttpSalesSource).
///
/// Request-time failures are reported as
/// [`FetchError`](salesdash_core::FetchError) instead.
#[derive(Debug, Error)]
pub enum HttpSourceError {
    /// The base URL joined with an endpoint path is not a valid URL.
    #[error("invalid upstream url {url:?}: {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// The underlying client could not be built.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}
