//! HTTP transport over reqwest

use super::traits::{Transport, TransportError};
use async_trait::async_trait;
use iotmon_shared::codec;
use iotmon_shared::SensorPayload;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Timeout for each data POST
    pub request_timeout: Duration,
    /// Timeout for each health probe
    pub probe_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(3),
            probe_timeout: Duration::from_secs(2),
        }
    }
}

/// Plain HTTP client for ingest servers
pub struct HttpTransport {
    client: Client,
    config: HttpConfig,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(config.probe_timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client, config })
    }
}

fn classify(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(url.to_string())
    } else if e.is_connect() {
        TransportError::Connect(url.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, payload: &SensorPayload) -> Result<u16, TransportError> {
        let body = codec::encode(payload)?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.config.request_timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| classify(url, e))?;
        Ok(response.status().as_u16())
    }

    async fn probe(&self, url: &str) -> Result<u16, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .map_err(|e| classify(url, e))?;
        Ok(response.status().as_u16())
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}
