//! Reliable-server pin
//!
//! After a successful delivery the server is pinned and later ticks try only
//! that server. Consecutive failures through the pin demote it.

use super::ServerRegistry;
use tracing::{info, warn};

/// Failures through the pin before it is dropped
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Outcome of a failed send through the pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFailure {
    /// Still pinned after this many consecutive failures
    Retained { failures: u32 },
    /// Unpinned; the server at `index` was marked inactive
    Demoted { index: usize },
}

#[derive(Debug, Clone)]
pub struct ReliableSelector {
    index: Option<usize>,
    failure_count: u32,
    threshold: u32,
}

impl Default for ReliableSelector {
    fn default() -> Self {
        Self::new(MAX_CONSECUTIVE_FAILURES)
    }
}

impl ReliableSelector {
    pub fn new(threshold: u32) -> Self {
        Self {
            index: None,
            failure_count: 0,
            threshold: threshold.max(1),
        }
    }

    pub fn pinned(&self) -> Option<usize> {
        self.index
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn pin(&mut self, index: usize) {
        if self.index != Some(index) {
            info!("[PIN] Pinned server {}", index);
        }
        self.index = Some(index);
        self.failure_count = 0;
    }

    pub fn unpin(&mut self) {
        if let Some(index) = self.index.take() {
            info!("[PIN] Unpinned server {}", index);
        }
        self.failure_count = 0;
    }

    pub fn record_success(&mut self) {
        self.failure_count = 0;
    }

    /// Count a failed send through the pin
    ///
    /// Reaching the threshold unpins and deactivates the pinned record.
    pub fn record_failure(&mut self, registry: &mut ServerRegistry) -> Option<PinFailure> {
        let index = self.index?;
        self.failure_count += 1;

        if self.failure_count < self.threshold {
            warn!(
                "[PIN] Server {} failed ({}/{})",
                index, self.failure_count, self.threshold
            );
            return Some(PinFailure::Retained {
                failures: self.failure_count,
            });
        }

        warn!(
            "[PIN] Server {} failed {} times in a row, demoting",
            index, self.failure_count
        );
        registry.deactivate(index);
        self.unpin();
        Some(PinFailure::Demoted { index })
    }

    /// Reconcile the pin with a finished discovery
    ///
    /// A forced discovery always drops the pin. Otherwise the pin survives if
    /// its server is still active, with a fresh failure count.
    pub fn after_discovery(&mut self, registry: &ServerRegistry, forced: bool) {
        match self.index {
            Some(_) if forced => self.unpin(),
            Some(index) if !registry.is_active(index) => self.unpin(),
            Some(_) => self.failure_count = 0,
            None => {}
        }
    }
}
