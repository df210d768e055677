//! Delivery transports
//!
//! This module handles:
//! - The transport seam used for data POSTs and health probes
//! - The reqwest-backed HTTP implementation
//! - A scripted transport for tests

mod http;
#[cfg(test)]
pub mod mock;
mod traits;

pub use http::{HttpConfig, HttpTransport};
pub use traits::{Transport, TransportError};
