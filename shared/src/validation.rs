//! Reading quality and validation rules
//!
//! Quality is assessed by the node before posting; validation is enforced by
//! the ingest server before a reading is stored.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::limits::{ADC_MAX, MAX_VALID_EPOCH_SECS, MILLIS_THRESHOLD, MIN_VALID_EPOCH_SECS};
use crate::{SensorField, SensorPayload};

/// Quality marker attached to every outbound reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Warning,
    Error,
    Critical,
}

impl Quality {
    /// Grade a value against the comfort bands of its field
    pub fn assess(field: SensorField, value: f64) -> Self {
        let banded = |good: (f64, f64), warning: (f64, f64)| {
            if (good.0..=good.1).contains(&value) {
                Quality::Good
            } else if (warning.0..=warning.1).contains(&value) {
                Quality::Warning
            } else {
                Quality::Error
            }
        };

        match field {
            SensorField::Temperature => banded((18.0, 25.0), (10.0, 30.0)),
            SensorField::Humidity => banded((30.0, 70.0), (20.0, 80.0)),
            SensorField::Vibration if value >= 1.0 => Quality::Critical,
            SensorField::Vibration => Quality::Good,
            SensorField::Luminosity => banded((300.0, 3500.0), (100.0, 4000.0)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Good => "good",
            Quality::Warning => "warning",
            Quality::Error => "error",
            Quality::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a reading is rejected by the ingest server
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown sensor type: {0} (supported: temperature, humidity, vibration, luminosity)")]
    UnknownSensorType(String),

    #[error("Value {value} out of range for {field}: expected {min} - {max}")]
    OutOfRange {
        field: SensorField,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Vibration must be 0 or 1, got {0}")]
    NotDigital(f64),

    #[error("Timestamp {0} outside the accepted window (2024-2030)")]
    TimestampOutOfWindow(u64),
}

/// Accepted value range per field
pub fn value_range(field: SensorField) -> (f64, f64) {
    match field {
        SensorField::Temperature => (-50.0, 100.0),
        SensorField::Humidity => (0.0, 100.0),
        SensorField::Vibration => (0.0, 1.0),
        SensorField::Luminosity => (0.0, ADC_MAX as f64),
    }
}

/// Convert a seconds-or-milliseconds timestamp to epoch seconds
pub fn timestamp_secs(raw: u64) -> u64 {
    if raw > MILLIS_THRESHOLD {
        raw / 1000
    } else {
        raw
    }
}

/// Validate a decoded payload, returning its field on success
///
/// A zero timestamp means "unknown" and is accepted; the server stamps it.
pub fn validate(payload: &SensorPayload) -> Result<SensorField, ValidationError> {
    if payload.timestamp != 0 {
        let secs = timestamp_secs(payload.timestamp);
        if !(MIN_VALID_EPOCH_SECS..=MAX_VALID_EPOCH_SECS).contains(&secs) {
            return Err(ValidationError::TimestampOutOfWindow(payload.timestamp));
        }
    }

    let field: SensorField = payload.sensor_type.parse()?;
    let value = payload.sensor_value;

    let (min, max) = value_range(field);
    if !value.is_finite() || value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }

    if field == SensorField::Vibration && value != 0.0 && value != 1.0 {
        return Err(ValidationError::NotDigital(value));
    }

    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(sensor_type: &str, value: f64, timestamp: u64) -> SensorPayload {
        SensorPayload {
            sensor_id: None,
            device_id: None,
            timestamp,
            sensor_type: sensor_type.into(),
            sensor_value: value,
            quality: None,
        }
    }

    #[test]
    fn test_quality_bands() {
        assert_eq!(Quality::assess(SensorField::Temperature, 22.0), Quality::Good);
        assert_eq!(Quality::assess(SensorField::Temperature, 28.0), Quality::Warning);
        assert_eq!(Quality::assess(SensorField::Temperature, 34.0), Quality::Error);
        assert_eq!(Quality::assess(SensorField::Humidity, 75.0), Quality::Warning);
        assert_eq!(Quality::assess(SensorField::Humidity, 85.0), Quality::Error);
        assert_eq!(Quality::assess(SensorField::Vibration, 1.0), Quality::Critical);
        assert_eq!(Quality::assess(SensorField::Vibration, 0.0), Quality::Good);
        assert_eq!(Quality::assess(SensorField::Luminosity, 50.0), Quality::Error);
        assert_eq!(Quality::assess(SensorField::Luminosity, 3800.0), Quality::Warning);
    }

    #[test]
    fn test_valid_reading() {
        let field = validate(&payload("humidity", 55.5, 1_718_000_000_000)).expect("valid");
        assert_eq!(field, SensorField::Humidity);
    }

    #[test]
    fn test_unknown_type() {
        let result = validate(&payload("pressure", 1.0, 0));
        assert!(matches!(result, Err(ValidationError::UnknownSensorType(_))));
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            validate(&payload("luminosity", 5000.0, 0)),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate(&payload("temperature", f64::NAN, 0)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_vibration_must_be_digital() {
        assert!(matches!(
            validate(&payload("vibration", 0.5, 0)),
            Err(ValidationError::NotDigital(_))
        ));
    }

    #[test]
    fn test_timestamp_window() {
        // Seconds and milliseconds are both accepted
        assert!(validate(&payload("temperature", 20.0, 1_718_000_000)).is_ok());
        assert!(validate(&payload("temperature", 20.0, 1_718_000_000_000)).is_ok());

        // Uptime-style millis (never synced) falls before 2024
        assert!(matches!(
            validate(&payload("temperature", 20.0, 120_000)),
            Err(ValidationError::TimestampOutOfWindow(_))
        ));
        assert!(matches!(
            validate(&payload("temperature", 20.0, 2_000_000_000)),
            Err(ValidationError::TimestampOutOfWindow(_))
        ));
    }
}
