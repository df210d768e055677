//! Ingest server registry and the reliable-server pin
//!
//! This module handles:
//! - The fixed-capacity, ordered list of known ingest servers
//! - Health-check discovery and operator-added servers
//! - Pinning the server that last delivered successfully

mod selector;
mod server_registry;

pub use selector::{PinFailure, ReliableSelector, MAX_CONSECUTIVE_FAILURES};
pub use server_registry::{ProbePolicy, RegistryConfig, RegistryError, ServerRegistry};
