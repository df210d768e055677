//! Node configuration
//!
//! Compiled defaults, with a handful of `IOTMON_*` environment overrides for
//! deployment-specific values (server list, device id, serial console).

use crate::clock::{TimeSourceConfig, TimeSyncPolicy};
use crate::console::{ConsoleSource, DEFAULT_BAUD};
use crate::delivery::{DeliveryConfig, DeliveryStrategy};
use crate::link::LinkConfig;
use crate::registry::{ProbePolicy, RegistryConfig};
use crate::sensor::PhysicalConfig;
use crate::transport::HttpConfig;
use std::time::Duration;

/// Stop-and-pause after a fixed number of measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationLimit {
    pub measurements: u64,
    pub pause: Duration,
}

impl Default for SimulationLimit {
    fn default() -> Self {
        Self {
            measurements: 100,
            pause: Duration::from_secs(30),
        }
    }
}

/// Everything the node needs to start
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Device id; sensor ids are derived from it
    pub device_id: String,
    /// Candidate servers, `host` or `host:port`
    pub candidate_servers: Vec<String>,
    pub registry: RegistryConfig,
    pub delivery: DeliveryConfig,
    pub http: HttpConfig,
    pub time: TimeSourceConfig,
    pub time_sync_policy: TimeSyncPolicy,
    /// Minimum time between resync attempts while unsynchronised
    pub time_resync_interval: Duration,
    pub poll_interval: Duration,
    /// Debug block every N measurements
    pub report_every: u64,
    pub simulation_limit: Option<SimulationLimit>,
    pub link: LinkConfig,
    pub physical: PhysicalConfig,
    pub console: ConsoleSource,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            device_id: "ESP32_001".into(),
            candidate_servers: vec![
                "192.168.1.100".into(),
                "192.168.0.100".into(),
                "10.0.0.100".into(),
                "127.0.0.1".into(),
            ],
            registry: RegistryConfig {
                default_port: 8000,
                path: "/data".into(),
                probe_policy: ProbePolicy::StrictOk,
                ..Default::default()
            },
            delivery: DeliveryConfig {
                strategy: DeliveryStrategy::DiscoveryWithPin,
                rediscovery_interval: Duration::from_secs(30),
            },
            http: HttpConfig::default(),
            time: TimeSourceConfig::default(),
            time_sync_policy: TimeSyncPolicy::SuppressSend,
            time_resync_interval: Duration::from_secs(60),
            poll_interval: Duration::from_secs(10),
            report_every: 5,
            simulation_limit: None,
            link: LinkConfig::default(),
            physical: PhysicalConfig::default(),
            console: ConsoleSource::Stdio,
        }
    }
}

impl NodeConfig {
    /// Apply `IOTMON_*` overrides from the process environment
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    ///
    /// - `IOTMON_DEVICE_ID`
    /// - `IOTMON_SERVERS`: comma-separated `host[:port]` list
    /// - `IOTMON_SERIAL`: serial console device, `IOTMON_SERIAL_BAUD` its rate
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(id) = lookup("IOTMON_DEVICE_ID").filter(|v| !v.trim().is_empty()) {
            self.device_id = id.trim().to_string();
        }

        if let Some(servers) = lookup("IOTMON_SERVERS") {
            let servers: Vec<String> = servers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !servers.is_empty() {
                self.candidate_servers = servers;
            }
        }

        if let Some(path) = lookup("IOTMON_SERIAL").filter(|v| !v.trim().is_empty()) {
            let baud = lookup("IOTMON_SERIAL_BAUD")
                .and_then(|b| b.parse().ok())
                .unwrap_or(DEFAULT_BAUD);
            self.console = ConsoleSource::Serial {
                path: path.trim().to_string(),
                baud,
            };
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.device_id, "ESP32_001");
        assert_eq!(config.candidate_servers.len(), 4);
        assert_eq!(config.registry.default_port, 8000);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.delivery.strategy, DeliveryStrategy::DiscoveryWithPin);
        assert_eq!(config.time_sync_policy, TimeSyncPolicy::SuppressSend);
        assert!(config.simulation_limit.is_none());
        assert_eq!(config.console, ConsoleSource::Stdio);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("IOTMON_DEVICE_ID", "ESP32_007"),
            ("IOTMON_SERVERS", " 10.0.0.5 , ,10.0.0.6:9000"),
            ("IOTMON_SERIAL", "/dev/ttyUSB0"),
        ]
        .into_iter()
        .collect();

        let config =
            NodeConfig::default().with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.device_id, "ESP32_007");
        assert_eq!(config.candidate_servers, vec!["10.0.0.5", "10.0.0.6:9000"]);
        assert_eq!(
            config.console,
            ConsoleSource::Serial {
                path: "/dev/ttyUSB0".into(),
                baud: 115_200
            }
        );
    }

    #[test]
    fn test_empty_overrides_keep_defaults() {
        let config = NodeConfig::default().with_overrides(|key| match key {
            "IOTMON_SERVERS" => Some(" , ".into()),
            "IOTMON_DEVICE_ID" => Some("".into()),
            _ => None,
        });
        assert_eq!(config.device_id, "ESP32_001");
        assert_eq!(config.candidate_servers.len(), 4);
    }
}
