//! Operator-facing output: CSV fallback lines and the periodic debug block
//!
//! Everything here renders to plain lines; the console decides where they go.

use crate::delivery::DeliveryOutcome;
use iotmon_shared::{csv_line, Quality, Sample, SensorField, CSV_HEADER};

pub const CSV_BANNER: &str = "=== CSV BACKUP ===";

/// Local record of samples no server accepted
///
/// The banner and header are printed once, before the first line.
#[derive(Debug, Default)]
pub struct CsvFallbackSink {
    header_printed: bool,
    written: u64,
}

impl CsvFallbackSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for one undelivered sample
    pub fn record(&mut self, sample: &Sample) -> Vec<String> {
        let mut lines = Vec::with_capacity(3);
        if !self.header_printed {
            lines.push(CSV_BANNER.to_string());
            lines.push(CSV_HEADER.to_string());
            self.header_printed = true;
        }
        lines.push(csv_line(sample));
        self.written += 1;
        lines
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

/// Node state shown in the debug block
#[derive(Debug, Clone, Default)]
pub struct NodeStatus {
    pub measurement: u64,
    /// Local wall-clock time, when synchronised
    pub local_time: Option<String>,
    pub uptime_secs: u64,
    pub link_up: bool,
    pub local_addr: Option<String>,
    pub active_servers: usize,
    pub known_servers: usize,
    pub strategy: String,
    /// Pinned server address and its failure count
    pub pinned: Option<(String, u32)>,
    pub csv_lines: u64,
}

/// Emits a debug block every `every` measurements
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    every: u64,
}

impl ConsoleReporter {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }

    pub fn is_due(&self, measurement: u64) -> bool {
        measurement > 0 && measurement % self.every == 0
    }

    pub fn render(&self, status: &NodeStatus, sample: &Sample) -> Vec<String> {
        let time = match &status.local_time {
            Some(local) => format!("Time: {}", local),
            None => format!("Time: unsynchronised (uptime {}s)", status.uptime_secs),
        };
        let link = match (&status.local_addr, status.link_up) {
            (Some(addr), true) => format!("Link: up ({})", addr),
            (_, true) => "Link: up".to_string(),
            (_, false) => "Link: DOWN".to_string(),
        };
        let pinned = match &status.pinned {
            Some((addr, failures)) => format!("Pinned: {} ({} failures)", addr, failures),
            None => "Pinned: none".to_string(),
        };

        vec![
            format!("=== DEBUG #{} ===", status.measurement),
            time,
            reading(
                "Temperature",
                sample,
                SensorField::Temperature,
                format!("{:.2} C", sample.temperature),
            ),
            reading(
                "Humidity",
                sample,
                SensorField::Humidity,
                format!("{:.1} %", sample.humidity),
            ),
            reading(
                "Vibration",
                sample,
                SensorField::Vibration,
                sample.vibration.to_string(),
            ),
            reading(
                "Luminosity",
                sample,
                SensorField::Luminosity,
                sample.luminosity.to_string(),
            ),
            link,
            format!(
                "Servers: {}/{} active ({})",
                status.active_servers, status.known_servers, status.strategy
            ),
            pinned,
            format!("CSV fallback lines: {}", status.csv_lines),
            "=================".to_string(),
        ]
    }
}

fn reading(label: &str, sample: &Sample, field: SensorField, shown: String) -> String {
    let quality = Quality::assess(field, sample.value(field));
    format!("{}: {} [{}]", label, shown, quality)
}

/// One-line summary of a tick
pub fn outcome_line(measurement: u64, outcome: &DeliveryOutcome) -> String {
    match outcome {
        DeliveryOutcome::Delivered(report) if report.via_pin => {
            format!("[{}] delivered to pinned server", measurement)
        }
        DeliveryOutcome::Delivered(report) => {
            format!("[{}] delivered to {} server(s)", measurement, report.delivered)
        }
        DeliveryOutcome::Failed(_) => format!("[{}] delivery failed - saving locally", measurement),
        DeliveryOutcome::LinkDown => format!("[{}] link down - saving locally", measurement),
        DeliveryOutcome::TimeUnsynced => {
            format!("[{}] time not synchronised - saving locally", measurement)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryReport;

    fn sample() -> Sample {
        Sample {
            temperature: 21.456,
            humidity: 48.3,
            vibration: 1,
            luminosity: 2048,
            timestamp: 1_718_000_000,
        }
    }

    #[test]
    fn test_csv_header_once() {
        let mut sink = CsvFallbackSink::new();
        let first = sink.record(&sample());
        assert_eq!(first[0], CSV_BANNER);
        assert_eq!(first[1], CSV_HEADER);
        assert_eq!(first[2], "1718000000,21.46,48.3,1,2048");

        let second = sink.record(&sample());
        assert_eq!(second, vec!["1718000000,21.46,48.3,1,2048".to_string()]);
        assert_eq!(sink.written(), 2);
    }

    #[test]
    fn test_reporter_cadence() {
        let reporter = ConsoleReporter::new(5);
        assert!(!reporter.is_due(0));
        assert!(!reporter.is_due(4));
        assert!(reporter.is_due(5));
        assert!(reporter.is_due(10));
    }

    #[test]
    fn test_debug_block() {
        let status = NodeStatus {
            measurement: 5,
            local_time: None,
            uptime_secs: 50,
            link_up: true,
            local_addr: Some("192.168.1.50".into()),
            active_servers: 1,
            known_servers: 4,
            strategy: "discovery+pin".into(),
            pinned: Some(("10.0.0.1".into(), 2)),
            csv_lines: 3,
        };
        let block = ConsoleReporter::new(5).render(&status, &sample());

        assert_eq!(block[0], "=== DEBUG #5 ===");
        assert!(block.contains(&"Time: unsynchronised (uptime 50s)".to_string()));
        assert!(block.contains(&"Vibration: 1 [critical]".to_string()));
        assert!(block.contains(&"Link: up (192.168.1.50)".to_string()));
        assert!(block.contains(&"Pinned: 10.0.0.1 (2 failures)".to_string()));
    }

    #[test]
    fn test_outcome_lines() {
        let report = DeliveryReport {
            delivered: 2,
            attempted: 3,
            ..Default::default()
        };
        assert_eq!(
            outcome_line(7, &DeliveryOutcome::Delivered(report)),
            "[7] delivered to 2 server(s)"
        );
        assert_eq!(
            outcome_line(8, &DeliveryOutcome::LinkDown),
            "[8] link down - saving locally"
        );
    }
}
