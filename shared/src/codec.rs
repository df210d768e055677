//! JSON payload codec and CSV fallback format
//!
//! Every measured field is posted as its own JSON document:
//! ```text
//! {"sensor_id":"ESP32_001_TEMP","device_id":"ESP32_001","timestamp":1718000000000,
//!  "sensor_type":"temperature","sensor_value":23.4,"quality":"good"}
//! ```
//!
//! `sensor_id`, `device_id` and `quality` are optional on the wire and are
//! omitted when absent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::limits::MILLIS_THRESHOLD;
use crate::validation::Quality;
use crate::{DeviceIdentity, Sample, SensorField};

/// Maximum accepted payload size (4 KB), far above any single reading
pub const MAX_PAYLOAD_SIZE: usize = 4 * 1024;

/// Header line printed once before the first CSV fallback line
pub const CSV_HEADER: &str = "timestamp,temperature_c,humidity_pct,vibration_digital,luminosity_adc";

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Payload too large: {0} bytes (max: {MAX_PAYLOAD_SIZE})")]
    PayloadTooLarge(usize),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single sensor reading as carried over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Milliseconds since Unix epoch (0 when the sender had no clock)
    #[serde(default)]
    pub timestamp: u64,
    pub sensor_type: String,
    pub sensor_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
}

impl SensorPayload {
    /// Build the payload for one field of a sample
    pub fn for_field(
        sample: &Sample,
        field: SensorField,
        identity: &DeviceIdentity,
        timestamp_ms: u64,
    ) -> Self {
        let value = sample.value(field);
        Self {
            sensor_id: Some(identity.sensor_id(field)),
            device_id: Some(identity.device_id.clone()),
            timestamp: timestamp_ms,
            sensor_type: field.as_str().to_string(),
            sensor_value: value,
            quality: Some(Quality::assess(field, value)),
        }
    }
}

/// Encode a payload into a JSON byte buffer
pub fn encode(payload: &SensorPayload) -> Result<Vec<u8>, CodecError> {
    let bytes = serde_json::to_vec(payload)?;
    if bytes.len() > MAX_PAYLOAD_SIZE {
        return Err(CodecError::PayloadTooLarge(bytes.len()));
    }
    Ok(bytes)
}

/// Decode a payload from a JSON byte buffer
pub fn decode(buf: &[u8]) -> Result<SensorPayload, CodecError> {
    if buf.len() > MAX_PAYLOAD_SIZE {
        return Err(CodecError::PayloadTooLarge(buf.len()));
    }
    Ok(serde_json::from_slice(buf)?)
}

/// Normalise a raw timestamp to milliseconds
///
/// Values above 10^12 are taken as milliseconds already; anything else is
/// treated as seconds. The 0 sentinel is left to the caller, which
/// substitutes its own clock reading.
pub fn normalize_timestamp_ms(raw: u64) -> u64 {
    if raw > MILLIS_THRESHOLD {
        raw
    } else {
        raw.saturating_mul(1000)
    }
}

/// Format a sample as a CSV fallback line matching [`CSV_HEADER`]
pub fn csv_line(sample: &Sample) -> String {
    format!(
        "{},{:.2},{:.1},{},{}",
        sample.timestamp, sample.temperature, sample.humidity, sample.vibration, sample.luminosity
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_sample() -> Sample {
        Sample {
            temperature: 23.456,
            humidity: 61.23,
            vibration: 0,
            luminosity: 2048,
            timestamp: 1_718_000_000,
        }
    }

    #[test]
    fn test_payload_fields() {
        let identity = DeviceIdentity::new("ESP32_001");
        let payload = SensorPayload::for_field(
            &create_test_sample(),
            SensorField::Luminosity,
            &identity,
            1_718_000_000_000,
        );

        let json: serde_json::Value =
            serde_json::from_slice(&encode(&payload).expect("encode failed")).expect("bad json");
        assert_eq!(json["sensor_id"], "ESP32_001_LUM");
        assert_eq!(json["device_id"], "ESP32_001");
        assert_eq!(json["timestamp"], 1_718_000_000_000u64);
        assert_eq!(json["sensor_type"], "luminosity");
        assert_eq!(json["sensor_value"], 2048.0);
        assert_eq!(json["quality"], "good");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let payload = SensorPayload {
            sensor_id: None,
            device_id: None,
            timestamp: 5,
            sensor_type: "humidity".into(),
            sensor_value: 40.0,
            quality: None,
        };
        let text = String::from_utf8(encode(&payload).expect("encode failed")).expect("utf8");
        assert!(!text.contains("sensor_id"));
        assert!(!text.contains("quality"));
    }

    #[test]
    fn test_decode_minimal_payload() {
        let decoded = decode(br#"{"sensor_type":"temperature","sensor_value":21.5}"#)
            .expect("decode failed");
        assert_eq!(decoded.timestamp, 0);
        assert_eq!(decoded.sensor_type, "temperature");
        assert!(decoded.quality.is_none());
    }

    #[test]
    fn test_decode_rejects_missing_value() {
        let result = decode(br#"{"sensor_type":"temperature"}"#);
        assert!(matches!(result, Err(CodecError::Json(_))));
    }

    #[test]
    fn test_payload_too_large() {
        let buf = vec![b' '; MAX_PAYLOAD_SIZE + 1];
        assert!(matches!(decode(&buf), Err(CodecError::PayloadTooLarge(_))));
    }

    #[test]
    fn test_normalize_seconds_and_millis() {
        assert_eq!(normalize_timestamp_ms(1_718_000_000), 1_718_000_000_000);
        assert_eq!(normalize_timestamp_ms(1_718_000_000_123), 1_718_000_000_123);
        assert_eq!(normalize_timestamp_ms(MILLIS_THRESHOLD), MILLIS_THRESHOLD * 1000);
    }

    #[test]
    fn test_normalize_idempotent_for_epoch_values() {
        // Any epoch-seconds value past 2001 lands above the millisecond threshold
        let samples = [
            1_000_000_001u64,
            1_704_067_200,
            1_718_000_000,
            1_924_991_999,
            1_718_000_000_000,
            4_000_000_000_000,
        ];
        for raw in samples {
            let once = normalize_timestamp_ms(raw);
            assert_eq!(normalize_timestamp_ms(once), once, "raw={}", raw);
        }
    }

    #[test]
    fn test_csv_line() {
        assert_eq!(csv_line(&create_test_sample()), "1718000000,23.46,61.2,0,2048");
        assert_eq!(CSV_HEADER.split(',').count(), 5);
    }
}
