//! HTTP implementations of [`Source`] and [`Sink`] over `reqwest`

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

use super::{Sink, Source};
use crate::error::{RelayError, Result};
use crate::telemetry::protocol::EVENT_CONTENT_TYPE;

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("telemetry-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RelayError::Config(format!("Failed to build HTTP client: {}", e)))
}

fn non_empty(endpoint: &str) -> Option<String> {
    let endpoint = endpoint.trim();
    (!endpoint.is_empty()).then(|| endpoint.to_string())
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// Polls the local flight-data source with HTTP GET
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpSource {
    /// Create a source client
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Source URL; an empty string leaves the source unset
    /// * `timeout` - Bound on a whole request/response exchange
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: non_empty(endpoint),
        })
    }
}

#[async_trait]
impl Source for HttpSource {
    async fn fetch(&self) -> Result<Bytes> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| RelayError::Config("source endpoint is not set".to_string()))?;

        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| RelayError::Fetch(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Fetch(format!("source answered HTTP {}", status)));
        }

        response
            .bytes()
            .await
            .map_err(|e| RelayError::Fetch(format!("Failed to read body: {}", describe(&e))))
    }
}

/// Delivers events to the remote collector with HTTP POST
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpSink {
    /// Create a collector client
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Collector URL; an empty string leaves the destination unset
    /// * `timeout` - Bound on a whole request/response exchange
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: non_empty(endpoint),
        })
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn deliver(&self, payload: Bytes) -> Result<()> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| RelayError::Config("destination endpoint is not set".to_string()))?;

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, EVENT_CONTENT_TYPE)
            .body(payload)
            .send()
            .await
            .map_err(|e| RelayError::Delivery(describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Delivery(format!("collector answered HTTP {}", status)));
        }

        let body = response.text().await.unwrap_or_default();
        debug!("[POST OK] {} {}", status, body);
        Ok(())
    }
}
