//! Ordered registry of ingest servers

use crate::transport::{Transport, TransportError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default registry capacity
pub const MAX_SERVERS: usize = 5;

/// Errors from registry operations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Server list is full")]
    Full,

    #[error("Server {0} did not pass the health check")]
    Unreachable(String),

    #[error("Invalid server address: {0:?}")]
    InvalidAddress(String),
}

/// What counts as a passing health probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbePolicy {
    /// Any HTTP response at all
    AnyResponse,
    /// Exactly HTTP 200
    #[default]
    StrictOk,
}

impl ProbePolicy {
    pub fn accepts(&self, result: &Result<u16, TransportError>) -> bool {
        match (self, result) {
            (ProbePolicy::AnyResponse, Ok(_)) => true,
            (ProbePolicy::StrictOk, Ok(status)) => *status == 200,
            (_, Err(_)) => false,
        }
    }
}

/// One known ingest server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRecord {
    pub address: String,
    pub port: u16,
    pub path: String,
    pub is_active: bool,
    /// Data URL, set while the server is considered live
    pub resolved_url: Option<String>,
    pub consecutive_failures: u32,
}

impl ServerRecord {
    fn new(address: String, port: u16, path: &str) -> Self {
        Self {
            address,
            port,
            path: path.to_string(),
            is_active: false,
            resolved_url: None,
            consecutive_failures: 0,
        }
    }

    pub fn data_url(&self) -> String {
        format!("http://{}:{}{}", self.address, self.port, self.path)
    }

    pub fn health_url(&self) -> String {
        format!("http://{}:{}/health", self.address, self.port)
    }

    fn mark_active(&mut self) {
        self.is_active = true;
        self.resolved_url = Some(self.data_url());
    }

    fn mark_inactive(&mut self) {
        self.is_active = false;
        self.resolved_url = None;
    }
}

/// Registry settings
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub capacity: usize,
    /// Port used when an address carries none
    pub default_port: u16,
    /// Data path on every server
    pub path: String,
    pub probe_policy: ProbePolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: MAX_SERVERS,
            default_port: 8000,
            path: "/data".into(),
            probe_policy: ProbePolicy::default(),
        }
    }
}

/// Split `host` or `host:port` and check it is usable in a URL
pub fn parse_address(input: &str, default_port: u16) -> Result<(String, u16), RegistryError> {
    let invalid = || RegistryError::InvalidAddress(input.to_string());
    let input = input.trim();

    let (host, port) = match input.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port.parse().map_err(|_| invalid())?;
            (host, port)
        }
        None => (input, default_port),
    };

    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !host_ok || port == 0 {
        return Err(invalid());
    }

    Ok((host.to_string(), port))
}

/// Fixed-capacity, ordered list of ingest servers
#[derive(Debug)]
pub struct ServerRegistry {
    config: RegistryConfig,
    records: Vec<ServerRecord>,
}

impl ServerRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            records: Vec::with_capacity(config.capacity),
            config,
        }
    }

    /// Registry seeded with configured candidates, all initially inactive
    ///
    /// Candidates past capacity are dropped with a warning.
    pub fn with_candidates(
        config: RegistryConfig,
        candidates: &[String],
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new(config);
        for candidate in candidates {
            if registry.records.len() >= registry.config.capacity {
                warn!("[REGISTRY] Ignoring candidate {}: registry full", candidate);
                continue;
            }
            let (host, port) = parse_address(candidate, registry.config.default_port)?;
            let record = ServerRecord::new(host, port, &registry.config.path);
            registry.records.push(record);
        }
        Ok(registry)
    }

    async fn probe(&self, transport: &dyn Transport, record: &ServerRecord) -> bool {
        let url = record.health_url();
        let result = transport.probe(&url).await;
        match &result {
            Ok(status) => debug!("[REGISTRY] Probe {} -> HTTP {}", url, status),
            Err(e) => debug!("[REGISTRY] Probe {} failed: {}", url, e),
        }
        self.config.probe_policy.accepts(&result)
    }

    /// Health-check every record and return the active count
    ///
    /// Resets every failure counter.
    pub async fn discover(&mut self, transport: &dyn Transport) -> usize {
        info!("[REGISTRY] Discovering {} server(s)", self.records.len());

        for i in 0..self.records.len() {
            let alive = self.probe(transport, &self.records[i]).await;
            let record = &mut self.records[i];
            if alive {
                record.mark_active();
                info!("[REGISTRY] {} is up", record.data_url());
            } else {
                record.mark_inactive();
            }
            record.consecutive_failures = 0;
        }

        let active = self.active_count();
        info!(
            "[REGISTRY] Discovery complete: {}/{} active",
            active,
            self.records.len()
        );
        active
    }

    /// Register a server after it passes a health check
    ///
    /// A known address is reactivated in place. Otherwise the server takes
    /// the first inactive slot, or a new slot while below capacity.
    pub async fn add(
        &mut self,
        address: &str,
        transport: &dyn Transport,
    ) -> Result<usize, RegistryError> {
        let (host, port) = parse_address(address, self.config.default_port)?;

        let existing = self
            .records
            .iter()
            .position(|r| r.address == host && r.port == port);

        let slot = match existing {
            Some(index) => index,
            None => self.free_slot().ok_or(RegistryError::Full)?,
        };

        let candidate = ServerRecord::new(host, port, &self.config.path);
        if !self.probe(transport, &candidate).await {
            return Err(RegistryError::Unreachable(candidate.health_url()));
        }

        let mut record = candidate;
        record.mark_active();
        info!("[REGISTRY] Slot {}: {}", slot, record.data_url());

        if slot == self.records.len() {
            self.records.push(record);
        } else {
            self.records[slot] = record;
        }
        Ok(slot)
    }

    fn free_slot(&self) -> Option<usize> {
        self.records
            .iter()
            .position(|r| !r.is_active)
            .or_else(|| (self.records.len() < self.config.capacity).then_some(self.records.len()))
    }

    /// Mark every record inactive; records stay registered
    pub fn clear(&mut self) {
        for record in &mut self.records {
            record.mark_inactive();
        }
    }

    /// Treat every record as live without probing
    pub fn activate_static(&mut self) {
        for record in &mut self.records {
            record.mark_active();
        }
    }

    /// Treat one record as live without probing
    pub fn activate(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.mark_active();
        }
    }

    /// `(address, is_active)` in registration order
    pub fn list(&self) -> impl Iterator<Item = (&str, bool)> + Clone + '_ {
        self.records
            .iter()
            .map(|r| (r.address.as_str(), r.is_active))
    }

    pub fn records(&self) -> &[ServerRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&ServerRecord> {
        self.records.get(index)
    }

    pub fn record_success(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.consecutive_failures = 0;
        }
    }

    /// Count a failed send, returning the new consecutive count
    pub fn record_failure(&mut self, index: usize) -> u32 {
        match self.records.get_mut(index) {
            Some(record) => {
                record.consecutive_failures += 1;
                record.consecutive_failures
            }
            None => 0,
        }
    }

    pub fn deactivate(&mut self, index: usize) {
        if let Some(record) = self.records.get_mut(index) {
            record.mark_inactive();
        }
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.records.get(index).is_some_and(|r| r.is_active)
    }

    pub fn active_count(&self) -> usize {
        self.list().filter(|(_, active)| *active).count()
    }

    pub fn active_indices(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_active)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }
}
