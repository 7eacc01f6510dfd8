//! [`SalesSource`] over reqwest.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{Value, json};
use tracing::{debug, warn};

use salesdash_core::{BreakdownRequest, DateRange, Envelope, FetchError, SalesSource};

use crate::config::HttpSourceConfig;
use crate::error::HttpSourceError;

/// The upstream sales API reached over HTTP.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpSalesSource {
    client: Client,
    totals_url: Url,
    breakdown_url: Url,
}

impl HttpSalesSource {
    /// Build a source with its own client, applying the configured timeout.
    pub fn new(config: HttpSourceConfig) -> Result<Self, HttpSourceError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Self::with_client(client, &config)
    }

    /// Build a source on an existing client.
    ///
    /// The client's own timeout applies; `config.timeout` is ignored.
    pub fn with_client(client: Client, config: &HttpSourceConfig) -> Result<Self, HttpSourceError> {
        Ok(Self {
            client,
            totals_url: endpoint(&config.base_url, &config.totals_path)?,
            breakdown_url: endpoint(&config.base_url, &config.breakdown_path)?,
        })
    }

    /// URL of the totals endpoint.
    pub fn totals_url(&self) -> &Url {
        &self.totals_url
    }

    /// URL of the breakdown endpoint.
    pub fn breakdown_url(&self) -> &Url {
        &self.breakdown_url
    }

    async fn post(&self, url: &Url, body: &Value) -> Result<Value, FetchError> {
        debug!(%url, "upstream request");
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "upstream answered with error status");
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        let payload: Value = serde_json::from_slice(&bytes)?;
        unwrap_payload(payload)
    }
}

#[async_trait]
impl SalesSource for HttpSalesSource {
    async fn fetch_totals(&self, range: &DateRange) -> Result<Value, FetchError> {
        let body = json!({
            "start_date": range.start_iso(),
            "end_date": range.end_iso(),
        });
        self.post(&self.totals_url, &body).await
    }

    async fn fetch_breakdown(&self, request: &BreakdownRequest) -> Result<Value, FetchError> {
        self.post(&self.breakdown_url, &request.to_body()).await
    }
}

fn endpoint(base_url: &str, path: &str) -> Result<Url, HttpSourceError> {
    let url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&url).map_err(|err| HttpSourceError::InvalidUrl {
        message: err.to_string(),
        url,
    })
}

/// Envelope-wrapped bodies are unwrapped; a bare map is the payload itself.
fn unwrap_payload(payload: Value) -> Result<Value, FetchError> {
    let is_envelope = payload
        .as_object()
        .is_some_and(|body| body.get("success").is_some_and(Value::is_boolean));
    if !is_envelope {
        return Ok(payload);
    }
    let envelope: Envelope = serde_json::from_value(payload)?;
    envelope.into_data().inspect_err(|err| {
        warn!(error = %err, "upstream reported failure");
    })
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else if err.is_connect() {
        FetchError::Connection(err.to_string())
    } else if let Some(status) = err.status() {
        FetchError::Http {
            status: status.as_u16(),
        }
    } else {
        FetchError::Network(err.to_string())
    }
}
