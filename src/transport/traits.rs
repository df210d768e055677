//! Transport trait abstraction for pluggable delivery backends

use async_trait::async_trait;
use iotmon_shared::{CodecError, SensorPayload};
use thiserror::Error;

/// Errors from a single transport request
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request to {0} timed out")]
    Timeout(String),

    #[error("Could not connect to {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Payload encoding failed: {0}")]
    Codec(#[from] CodecError),

    #[error("Server answered HTTP {0}")]
    Status(u16),
}

/// Moves sensor payloads to an ingest endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST one payload to `url`, returning the HTTP status
    async fn post(&self, url: &str, payload: &SensorPayload) -> Result<u16, TransportError>;

    /// GET the health endpoint at `url`, returning the HTTP status
    async fn probe(&self, url: &str) -> Result<u16, TransportError>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
