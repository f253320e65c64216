//! HTTP retrieval and parsing of provider documents.

use std::time::{Duration, Instant};

use crate::document::DynamicConfig;
use crate::observability::metrics;

/// Why a fetch did not produce a document.
///
/// The rendered messages are what operators see as a source's last error.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("HTTP {code}: {reason}")]
    Status { code: u16, reason: String },
    #[error("Read error: {0}")]
    Read(String),
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl FetchError {
    /// Metric label for the failure class.
    pub fn outcome(&self) -> &'static str {
        match self {
            FetchError::Connection(_) => "connection_error",
            FetchError::Status { .. } => "http_error",
            FetchError::Read(_) => "read_error",
            FetchError::Parse(_) => "parse_error",
        }
    }
}

/// Fetches provider documents with a bounded timeout.
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("provider-aggregator/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and parse the body as a dynamic configuration document.
    pub async fn fetch(&self, source_name: &str, url: &str) -> Result<DynamicConfig, FetchError> {
        let started = Instant::now();
        let result = self.fetch_inner(url).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.outcome(),
        };
        metrics::record_fetch(source_name, outcome, started);
        result
    }

    async fn fetch_inner(&self, url: &str) -> Result<DynamicConfig, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Read(e.to_string()))?;

        Ok(serde_json::from_slice(&body)?)
    }
}
