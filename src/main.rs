mod clock;
mod command;
mod config;
mod console;
mod delivery;
mod link;
mod node;
mod registry;
mod report;
mod sensor;
mod transport;

use anyhow::{Context, Result};
use clock::{SntpClient, SystemClock};
use config::NodeConfig;
use console::OperatorConsole;
use link::InterfaceLink;
use node::{Node, NodeParts};
use sensor::SensorReader;
use std::sync::Arc;
use transport::HttpTransport;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[cfg(feature = "physical-sensors")]
fn build_reader(config: &NodeConfig) -> Box<dyn SensorReader> {
    let bus = sensor::IioSensorBus::new(&config.physical);
    Box::new(sensor::PhysicalReader::new(bus, &config.physical))
}

#[cfg(not(feature = "physical-sensors"))]
fn build_reader(_config: &NodeConfig) -> Box<dyn SensorReader> {
    Box::new(sensor::SimulatedReader::new())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the operator console
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = NodeConfig::from_env();

    info!("Sensor node starting: {}", config.device_id);
    info!("  Candidates: {}", config.candidate_servers.join(", "));
    info!("  Poll interval: {:?}", config.poll_interval);

    let mut console = OperatorConsole::open(&config.console)?;

    let transport = HttpTransport::new(config.http.clone()).context("Failed to build HTTP client")?;
    let parts = NodeParts {
        clock: Arc::new(SystemClock::new()),
        reader: build_reader(&config),
        ntp: Box::new(SntpClient::default()),
        link: Box::new(InterfaceLink::new()),
        transport: Arc::new(transport),
    };
    let mut node = Node::new(config, parts).context("Invalid server configuration")?;

    let banner = node.start().await;
    emit(&mut console, &banner).await;

    // Main control loop
    let mut console_open = true;
    loop {
        let wait = node.next_tick_in();

        tokio::select! {
            line = console.next_line(), if console_open => {
                match line {
                    Some(line) => {
                        let reply = node.handle_line(&line).await;
                        emit(&mut console, &reply).await;
                    }
                    None => {
                        warn!("[MAIN] Console input closed, continuing without commands");
                        console_open = false;
                    }
                }
            }
            _ = tokio::time::sleep(wait) => {}
        }

        if node.poll_due() {
            let report = node.tick().await;
            emit(&mut console, &report.lines).await;
        }

        node.check_link().await;
    }
}

async fn emit(console: &mut OperatorConsole, lines: &[String]) {
    if let Err(e) = console.emit(lines).await {
        error!("[MAIN] Console write failed: {}", e);
    }
}
