//! Sample delivery to ingest servers
//!
//! This module handles:
//! - Posting one sample as four per-field readings
//! - Strategy selection: single server, static list, discovery, pinned
//! - Deactivating failed endpoints and periodic rediscovery

mod manager;

pub use manager::{send_sample, DeliveryManager};

use std::fmt;
use std::time::Duration;

/// How the node picks the servers a sample goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryStrategy {
    /// First configured server only, assumed live
    SingleServer,
    /// Every configured server, assumed live
    StaticList,
    /// Health-checked servers; failures deactivate
    Discovery,
    /// Discovery plus exclusive use of the last server that worked
    #[default]
    DiscoveryWithPin,
}

impl DeliveryStrategy {
    pub fn uses_discovery(&self) -> bool {
        matches!(
            self,
            DeliveryStrategy::Discovery | DeliveryStrategy::DiscoveryWithPin
        )
    }

    pub fn uses_pin(&self) -> bool {
        *self == DeliveryStrategy::DiscoveryWithPin
    }
}

impl fmt::Display for DeliveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStrategy::SingleServer => write!(f, "single-server"),
            DeliveryStrategy::StaticList => write!(f, "static-list"),
            DeliveryStrategy::Discovery => write!(f, "discovery"),
            DeliveryStrategy::DiscoveryWithPin => write!(f, "discovery+pin"),
        }
    }
}

/// Delivery settings
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub strategy: DeliveryStrategy,
    /// Minimum time between rediscoveries while no server is active
    pub rediscovery_interval: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            strategy: DeliveryStrategy::default(),
            rediscovery_interval: Duration::from_secs(30),
        }
    }
}

/// Result of one `send_to_all`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Servers that accepted at least one field
    pub delivered: usize,
    /// Servers a send was attempted to
    pub attempted: usize,
    /// The sample went only to the pinned server
    pub via_pin: bool,
    /// Pinned server demoted during this send
    pub demoted: Option<usize>,
}

impl DeliveryReport {
    pub fn is_success(&self) -> bool {
        self.delivered > 0
    }
}

/// What happened to a tick's sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered(DeliveryReport),
    /// Every attempt failed; sample went to the CSV fallback
    Failed(DeliveryReport),
    /// No network link; nothing attempted
    LinkDown,
    /// Clock unsynchronised and sends suppressed
    TimeUnsynced,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered(_))
    }
}

impl From<DeliveryReport> for DeliveryOutcome {
    fn from(report: DeliveryReport) -> Self {
        if report.is_success() {
            DeliveryOutcome::Delivered(report)
        } else {
            DeliveryOutcome::Failed(report)
        }
    }
}
