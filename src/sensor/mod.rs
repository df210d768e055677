//! Sensor acquisition
//!
//! This module handles:
//! - The reader seam the node samples through once per tick
//! - A simulated reader driven by elapsed time and noise
//! - A physical reader over a pluggable sensor bus (feature `physical-sensors`)

mod simulated;
#[cfg_attr(not(feature = "physical-sensors"), allow(dead_code))]
mod physical;

pub use physical::{IioSensorBus, PhysicalConfig, PhysicalReader};
pub use simulated::SimulatedReader;

use iotmon_shared::Sample;
use std::time::Duration;
use thiserror::Error;

/// Errors from a sensor bus read
///
/// These never abort a tick; readers substitute a default instead.
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("Sensor I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unparseable value {value:?} from {path}")]
    Parse { path: String, value: String },

    #[error("Sensor returned no data")]
    NoData,
}

/// Produces one sample per tick
pub trait SensorReader: Send {
    /// Read every sensor
    ///
    /// `elapsed` is the time since the node started; `timestamp` is the
    /// wall-clock stamp for the sample (0 when unsynchronised).
    fn read(&mut self, elapsed: Duration, timestamp: u64) -> Sample;

    /// Human-readable name for this reader
    fn name(&self) -> &'static str;
}
