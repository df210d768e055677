//! The node context and its tick
//!
//! All mutable node state lives in [`Node`]; the control loop in `main`
//! drives it one tick or one console line at a time.

use crate::clock::{Clock, NtpQuery, Scheduler, TimeSource, TimeSyncPolicy};
use crate::command::handlers::HandlerContext;
use crate::command::CommandExecutor;
use crate::config::{NodeConfig, SimulationLimit};
use crate::delivery::{DeliveryManager, DeliveryOutcome};
use crate::link::{LinkConfig, NetworkLink};
use crate::registry::{RegistryError, ServerRegistry};
use crate::report::{outcome_line, ConsoleReporter, CsvFallbackSink, NodeStatus};
use crate::sensor::SensorReader;
use crate::transport::Transport;
use iotmon_shared::{DeviceIdentity, Sample};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The swappable pieces a node is built from
pub struct NodeParts {
    pub clock: Arc<dyn Clock>,
    pub reader: Box<dyn SensorReader>,
    pub ntp: Box<dyn NtpQuery>,
    pub link: Box<dyn NetworkLink>,
    pub transport: Arc<dyn Transport>,
}

/// What one tick did
#[derive(Debug, Clone)]
pub struct TickReport {
    pub measurement: u64,
    pub sample: Sample,
    pub outcome: DeliveryOutcome,
    /// Console lines produced by the tick
    pub lines: Vec<String>,
    /// The simulation limit was reached and the node is pausing
    pub simulation_complete: bool,
}

pub struct Node {
    clock: Arc<dyn Clock>,
    reader: Box<dyn SensorReader>,
    time: TimeSource,
    link: Box<dyn NetworkLink>,
    link_config: LinkConfig,
    delivery: DeliveryManager,
    csv: CsvFallbackSink,
    reporter: ConsoleReporter,
    executor: CommandExecutor,
    poll: Scheduler,
    time_resync: Scheduler,
    time_sync_policy: TimeSyncPolicy,
    simulation_limit: Option<SimulationLimit>,
    paused_until_ms: Option<u64>,
    measurement: u64,
    link_was_up: bool,
    /// The server list has been brought into its initial state
    delivery_started: bool,
}

impl Node {
    pub fn new(config: NodeConfig, parts: NodeParts) -> Result<Self, RegistryError> {
        let registry =
            ServerRegistry::with_candidates(config.registry.clone(), &config.candidate_servers)?;
        let delivery = DeliveryManager::new(
            config.delivery.clone(),
            DeviceIdentity::new(config.device_id.clone()),
            parts.transport,
            registry,
        );
        let time = TimeSource::new(config.time.clone(), parts.ntp, parts.clock.clone());

        Ok(Self {
            clock: parts.clock,
            reader: parts.reader,
            time,
            link: parts.link,
            link_config: config.link.clone(),
            delivery,
            csv: CsvFallbackSink::new(),
            reporter: ConsoleReporter::new(config.report_every),
            executor: CommandExecutor::new(),
            poll: Scheduler::new(config.poll_interval),
            time_resync: Scheduler::new(config.time_resync_interval),
            time_sync_policy: config.time_sync_policy,
            simulation_limit: config.simulation_limit,
            paused_until_ms: None,
            measurement: 0,
            link_was_up: false,
            delivery_started: false,
        })
    }

    /// Bring up the link, the clock and the server list
    pub async fn start(&mut self) -> Vec<String> {
        info!("[NODE] Starting with {} sensors", self.reader.name());

        self.link_was_up = self.link.is_up() || self.link.reconnect(&self.link_config).await;
        if self.link_was_up {
            self.sync_time().await;
        } else {
            warn!("[NODE] Starting without a network link");
        }
        self.time_resync.poll(self.clock.now_ms());

        let active = if self.link_was_up {
            self.start_delivery().await
        } else {
            0
        };

        vec![
            format!(
                "Node ready: {} server(s) active, strategy {}, time {}",
                active,
                self.delivery.strategy(),
                if self.time.is_synced() { "synchronised" } else { "NOT synchronised" }
            ),
            "Type 'help' for commands".to_string(),
        ]
    }

    async fn start_delivery(&mut self) -> usize {
        self.delivery_started = true;
        self.delivery.start(self.clock.now_ms()).await
    }

    async fn sync_time(&mut self) {
        if let Err(e) = self.time.sync().await {
            warn!("[NODE] Time sync failed: {}", e);
        }
    }

    /// Time until the next tick is due
    pub fn next_tick_in(&self) -> Duration {
        let now = self.clock.now_ms();
        let poll = self.poll.remaining(now);
        match self.paused_until_ms {
            Some(until) => poll.max(Duration::from_millis(until.saturating_sub(now))),
            None => poll,
        }
    }

    /// Accept a tick if one is due
    pub fn poll_due(&mut self) -> bool {
        let now = self.clock.now_ms();
        if let Some(until) = self.paused_until_ms {
            if now < until {
                return false;
            }
            info!("[NODE] Resuming after pause");
            self.paused_until_ms = None;
        }
        self.poll.poll(now)
    }

    /// Take one measurement and try to deliver it
    pub async fn tick(&mut self) -> TickReport {
        self.measurement += 1;
        let link_up = self.link.is_up();

        if link_up && !self.time.is_synced() && self.time_resync.poll(self.clock.now_ms()) {
            debug!("[NODE] Retrying time sync");
            self.sync_time().await;
        }

        let elapsed = Duration::from_millis(self.clock.now_ms());
        let sample = self.reader.read(elapsed, self.time.timestamp());

        let outcome = if !link_up {
            DeliveryOutcome::LinkDown
        } else if !self.time.is_synced() && self.time_sync_policy == TimeSyncPolicy::SuppressSend {
            DeliveryOutcome::TimeUnsynced
        } else {
            if !self.delivery_started {
                self.start_delivery().await;
            }
            self.delivery.maybe_rediscover(self.clock.now_ms()).await;
            DeliveryOutcome::from(self.delivery.send_to_all(&sample).await)
        };

        let mut lines = vec![outcome_line(self.measurement, &outcome)];
        if !outcome.is_delivered() {
            lines.extend(self.csv.record(&sample));
        }
        if self.reporter.is_due(self.measurement) {
            lines.extend(self.reporter.render(&self.status(), &sample));
        }

        let measurement = self.measurement;
        let simulation_complete = self.check_simulation_limit(&mut lines);

        TickReport {
            measurement,
            sample,
            outcome,
            lines,
            simulation_complete,
        }
    }

    fn check_simulation_limit(&mut self, lines: &mut Vec<String>) -> bool {
        let Some(limit) = self.simulation_limit else {
            return false;
        };
        if self.measurement < limit.measurements {
            return false;
        }

        info!(
            "[NODE] Simulation complete after {} measurements, pausing {:?}",
            self.measurement, limit.pause
        );
        lines.push(format!(
            "Simulation complete: {} measurements, pausing {}s",
            self.measurement,
            limit.pause.as_secs()
        ));
        self.measurement = 0;
        self.poll.reset();
        self.paused_until_ms = Some(self.clock.now_ms() + limit.pause.as_millis() as u64);
        true
    }

    /// Watch for the link dropping and try to bring it back
    pub async fn check_link(&mut self) -> bool {
        let mut up = self.link.is_up();
        if self.link_was_up && !up {
            warn!("[LINK] Link lost, reconnecting");
            up = self.link.reconnect(&self.link_config).await;
        } else if !self.link_was_up && up {
            info!("[LINK] Link restored");
            if !self.delivery_started {
                let active = self.start_delivery().await;
                info!("[LINK] {} server(s) active", active);
            }
        }
        self.link_was_up = up;
        up
    }

    /// Run one console line; unrecognised input produces no output
    pub async fn handle_line(&mut self, line: &str) -> Vec<String> {
        let status = self.status();
        let ctx = HandlerContext::new(&mut self.delivery, &status);
        self.executor
            .execute(line, ctx)
            .await
            .map(|result| result.into_lines())
            .unwrap_or_default()
    }

    /// Snapshot for status output
    pub fn status(&self) -> NodeStatus {
        let registry = self.delivery.registry();
        let selector = self.delivery.selector();

        NodeStatus {
            measurement: self.measurement,
            local_time: self
                .time
                .now_epoch_secs()
                .map(|secs| self.time.format_local(secs)),
            uptime_secs: self.clock.now_ms() / 1000,
            link_up: self.link.is_up(),
            local_addr: self.link.local_addr().map(|a| a.to_string()),
            active_servers: registry.active_count(),
            known_servers: registry.len(),
            strategy: self.delivery.strategy().to_string(),
            pinned: selector
                .pinned()
                .and_then(|i| registry.get(i))
                .map(|r| (r.address.clone(), selector.failure_count())),
            csv_lines: self.csv.written(),
        }
    }
}
