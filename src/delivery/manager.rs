//! Delivery manager with server discovery and the reliable pin

use super::{DeliveryConfig, DeliveryReport, DeliveryStrategy};
use crate::clock::Scheduler;
use crate::registry::{PinFailure, RegistryError, ReliableSelector, ServerRegistry};
use crate::transport::{Transport, TransportError};
use iotmon_shared::{normalize_timestamp_ms, now_ms, DeviceIdentity, Sample, SensorField, SensorPayload};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Post every field of `sample` to `url`
///
/// Succeeds when at least one field is answered with HTTP 200. A failed
/// field is logged and the remaining fields are still sent.
pub async fn send_sample(
    transport: &dyn Transport,
    identity: &DeviceIdentity,
    sample: &Sample,
    url: &str,
) -> bool {
    let timestamp_ms = if sample.timestamp == 0 {
        now_ms()
    } else {
        normalize_timestamp_ms(sample.timestamp)
    };

    let mut accepted = 0;
    for field in SensorField::ALL {
        let payload = SensorPayload::for_field(sample, field, identity, timestamp_ms);
        match require_ok(transport.post(url, &payload).await) {
            Ok(()) => accepted += 1,
            Err(e) => warn!("[SEND] {} {} failed: {}", url, field, e),
        }
    }

    debug!(
        "[SEND] {}: {}/{} fields accepted",
        url,
        accepted,
        SensorField::ALL.len()
    );
    accepted > 0
}

/// Only HTTP 200 counts as accepted
fn require_ok(result: Result<u16, TransportError>) -> Result<(), TransportError> {
    match result? {
        200 => Ok(()),
        status => Err(TransportError::Status(status)),
    }
}

/// Routes samples to ingest servers according to the configured strategy
pub struct DeliveryManager {
    config: DeliveryConfig,
    identity: DeviceIdentity,
    transport: Arc<dyn Transport>,
    registry: ServerRegistry,
    selector: ReliableSelector,
    rediscovery: Scheduler,
}

impl DeliveryManager {
    pub fn new(
        config: DeliveryConfig,
        identity: DeviceIdentity,
        transport: Arc<dyn Transport>,
        registry: ServerRegistry,
    ) -> Self {
        let rediscovery = Scheduler::new(config.rediscovery_interval);
        Self {
            config,
            identity,
            transport,
            registry,
            selector: ReliableSelector::default(),
            rediscovery,
        }
    }

    /// Bring the registry into its initial state
    ///
    /// Static strategies mark their servers live; discovery strategies
    /// probe every candidate.
    pub async fn start(&mut self, now_ms: u64) -> usize {
        info!(
            "[DELIVERY] Strategy {} via {}",
            self.config.strategy,
            self.transport.name()
        );

        let active = match self.config.strategy {
            DeliveryStrategy::SingleServer => {
                self.registry.activate(0);
                self.registry.active_count()
            }
            DeliveryStrategy::StaticList => {
                self.registry.activate_static();
                self.registry.active_count()
            }
            DeliveryStrategy::Discovery | DeliveryStrategy::DiscoveryWithPin => {
                self.discover(false).await
            }
        };

        self.rediscovery.poll(now_ms);
        if active == 0 {
            warn!("[DELIVERY] No server available");
        }
        active
    }

    /// Probe every registered server
    ///
    /// A forced discovery also drops the pin. Static strategies never probe.
    pub async fn discover(&mut self, forced: bool) -> usize {
        if !self.config.strategy.uses_discovery() {
            debug!("[DELIVERY] Static strategy, skipping discovery");
            return self.registry.active_count();
        }

        let active = self.registry.discover(self.transport.as_ref()).await;
        if self.config.strategy.uses_pin() {
            self.selector.after_discovery(&self.registry, forced);
        }
        active
    }

    /// Rediscover when nothing is active and the interval has elapsed
    pub async fn maybe_rediscover(&mut self, now_ms: u64) -> Option<usize> {
        if !self.config.strategy.uses_discovery() || self.registry.active_count() > 0 {
            return None;
        }
        if !self.rediscovery.poll(now_ms) {
            return None;
        }

        info!("[DELIVERY] No active server, rediscovering");
        Some(self.discover(false).await)
    }

    /// Deliver one sample
    pub async fn send_to_all(&mut self, sample: &Sample) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        if self.config.strategy.uses_pin() {
            if let Some(index) = self.selector.pinned() {
                match self.send_pinned(index, sample, &mut report).await {
                    Some(PinFailure::Demoted { index }) => report.demoted = Some(index),
                    _ => return report,
                }
            }
        }

        let targets: Vec<usize> = match self.config.strategy {
            DeliveryStrategy::SingleServer => self
                .registry
                .active_indices()
                .into_iter()
                .filter(|&i| i == 0)
                .collect(),
            _ => self.registry.active_indices(),
        };

        for index in targets {
            let Some(url) = self.url_for(index) else {
                continue;
            };

            report.attempted += 1;
            if send_sample(self.transport.as_ref(), &self.identity, sample, &url).await {
                report.delivered += 1;
                self.registry.record_success(index);
                if self.config.strategy.uses_pin() && self.selector.pinned().is_none() {
                    self.selector.pin(index);
                }
            } else {
                let failures = self.registry.record_failure(index);
                if self.config.strategy.uses_discovery() {
                    warn!("[DELIVERY] {} failed, deactivating", url);
                    self.registry.deactivate(index);
                } else {
                    warn!("[DELIVERY] {} failed ({} in a row)", url, failures);
                }
            }
        }

        report
    }

    /// Send through the pin; `None` means delivered
    async fn send_pinned(
        &mut self,
        index: usize,
        sample: &Sample,
        report: &mut DeliveryReport,
    ) -> Option<PinFailure> {
        let url = self.url_for(index)?;
        report.attempted += 1;
        report.via_pin = true;

        if send_sample(self.transport.as_ref(), &self.identity, sample, &url).await {
            report.delivered += 1;
            self.registry.record_success(index);
            self.selector.record_success();
            return None;
        }

        self.registry.record_failure(index);
        self.selector.record_failure(&mut self.registry)
    }

    fn url_for(&self, index: usize) -> Option<String> {
        self.registry
            .get(index)
            .map(|r| r.resolved_url.clone().unwrap_or_else(|| r.data_url()))
    }

    /// Register an operator-supplied server
    pub async fn add_server(&mut self, address: &str) -> Result<usize, RegistryError> {
        self.registry.add(address, self.transport.as_ref()).await
    }

    /// Deactivate every server and drop the pin
    pub fn clear(&mut self) {
        self.registry.clear();
        self.selector.unpin();
    }

    pub fn reset_pin(&mut self) {
        self.selector.unpin();
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn selector(&self) -> &ReliableSelector {
        &self.selector
    }

    pub fn strategy(&self) -> DeliveryStrategy {
        self.config.strategy
    }

    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }
}
