//! IoT Monitor Shared Types
//!
//! This crate provides the sample model, the JSON payload codec and the
//! validation rules shared by sensor nodes and the ingest server.

pub mod codec;
pub mod validation;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

pub use codec::{csv_line, normalize_timestamp_ms, CodecError, SensorPayload, CSV_HEADER};
pub use validation::{Quality, ValidationError};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Physical limits and sentinel values shared across the system
pub mod limits {
    /// Full scale of the 12-bit ADC
    pub const ADC_MAX: u16 = 4095;

    /// Raw timestamps above this value are already milliseconds
    pub const MILLIS_THRESHOLD: u64 = 1_000_000_000_000;

    /// 2024-01-01T00:00:00Z, earliest wall-clock time accepted as synchronised
    pub const MIN_VALID_EPOCH_SECS: u64 = 1_704_067_200;

    /// 2030-12-31T23:59:59Z, latest timestamp accepted by the ingest server
    pub const MAX_VALID_EPOCH_SECS: u64 = 1_924_991_999;

    /// Substituted when the climate sensor reports not-a-number
    pub const DEFAULT_TEMPERATURE_C: f32 = 25.0;

    /// Substituted when the climate sensor reports not-a-number
    pub const DEFAULT_HUMIDITY_PCT: f32 = 60.0;
}

/// One reading of every sensor, taken once per poll tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Temperature in °C
    pub temperature: f32,
    /// Relative humidity in %
    pub humidity: f32,
    /// 1 when vibration was detected during this tick
    pub vibration: u8,
    /// Raw light sensor ADC count (0-4095)
    pub luminosity: u16,
    /// Epoch seconds, or 0 when the time source is unsynchronised
    pub timestamp: u64,
}

impl Sample {
    /// Whether vibration was detected
    pub fn is_vibrating(&self) -> bool {
        self.vibration != 0
    }

    /// Numeric value of a single field
    pub fn value(&self, field: SensorField) -> f64 {
        match field {
            SensorField::Temperature => self.temperature as f64,
            SensorField::Humidity => self.humidity as f64,
            SensorField::Vibration => self.vibration as f64,
            SensorField::Luminosity => self.luminosity as f64,
        }
    }
}

/// The measured fields of a sample, each posted as its own reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorField {
    Temperature,
    Humidity,
    Vibration,
    Luminosity,
}

impl SensorField {
    /// All fields in posting order
    pub const ALL: [SensorField; 4] = [
        SensorField::Temperature,
        SensorField::Humidity,
        SensorField::Vibration,
        SensorField::Luminosity,
    ];

    /// Wire name used as `sensor_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorField::Temperature => "temperature",
            SensorField::Humidity => "humidity",
            SensorField::Vibration => "vibration",
            SensorField::Luminosity => "luminosity",
        }
    }

    /// Suffix appended to the device id to form the sensor id
    pub fn id_suffix(&self) -> &'static str {
        match self {
            SensorField::Temperature => "TEMP",
            SensorField::Humidity => "HUM",
            SensorField::Vibration => "VIB",
            SensorField::Luminosity => "LUM",
        }
    }
}

impl fmt::Display for SensorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownSensorType(s.to_string()))
    }
}

/// Identity stamped on every outbound reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
}

impl DeviceIdentity {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }

    /// Sensor id for a field, e.g. `ESP32_001_TEMP`
    pub fn sensor_id(&self, field: SensorField) -> String {
        format!("{}_{}", self.device_id, field.id_suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_ids() {
        let identity = DeviceIdentity::new("ESP32_001");
        assert_eq!(identity.sensor_id(SensorField::Temperature), "ESP32_001_TEMP");
        assert_eq!(identity.sensor_id(SensorField::Luminosity), "ESP32_001_LUM");
    }

    #[test]
    fn test_field_parse() {
        assert_eq!("humidity".parse::<SensorField>().unwrap(), SensorField::Humidity);
        assert!(matches!(
            "pressure".parse::<SensorField>(),
            Err(ValidationError::UnknownSensorType(_))
        ));
        // Case-sensitive, like the wire format
        assert!("Humidity".parse::<SensorField>().is_err());
    }

    #[test]
    fn test_sample_values() {
        let sample = Sample {
            temperature: 21.5,
            humidity: 55.0,
            vibration: 1,
            luminosity: 1200,
            timestamp: 0,
        };
        assert!(sample.is_vibrating());
        assert_eq!(sample.value(SensorField::Vibration), 1.0);
        assert_eq!(sample.value(SensorField::Luminosity), 1200.0);
    }
}
