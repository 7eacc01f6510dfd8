//! # salesdash-reqwest
//!
//! The HTTP upstream for salesdash: [`HttpSalesSource`] implements
//! [`SalesSource`](salesdash_core::SalesSource) on top of a [`reqwest::Client`].
//!
//! Both endpoints take a JSON `POST` body and answer with the
//! `{success, data}` envelope. Transport and status failures are mapped to
//! [`FetchError`](salesdash_core::FetchError) variants whose messages the
//! retry classifier understands, so a `503` or a timeout is retried while a
//! `401` fails fast.
//!
//! ```rust,ignore
//! use salesdash_reqwest::{HttpSalesSource, HttpSourceConfig};
//!
//! let source = HttpSalesSource::new(HttpSourceConfig::new("https://api.example.com"))?;
//! ```
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod config;
mod error;
mod source;

pub use config::HttpSourceConfig;
pub use error::HttpSourceError;
pub use source::HttpSalesSource;

/// Re-export of the client type accepted by [`HttpSalesSource::with_client`].
pub use reqwest::Client as ReqwestClient;
