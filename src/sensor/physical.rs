//! Physical sensors behind a bus abstraction
//!
//! This module handles:
//! - Reading the DHT22 climate sensor, the vibration input and the LDR
//! - Substituting defaults for invalid readings so a tick never aborts
//! - Inverting the vibration input for pull-up wiring
//! - A Linux IIO/GPIO sysfs bus implementation

use super::{SensorError, SensorReader};
use iotmon_shared::limits::{ADC_MAX, DEFAULT_HUMIDITY_PCT, DEFAULT_TEMPERATURE_C};
use iotmon_shared::Sample;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Raw access to the sensor hardware
pub trait SensorBus: Send {
    /// Temperature (°C) and relative humidity (%); either may be NaN
    fn read_climate(&mut self) -> Result<(f32, f32), SensorError>;

    /// Logic level of the vibration input
    fn read_digital(&mut self) -> Result<bool, SensorError>;

    /// Raw count of the light sensor ADC channel
    fn read_analog(&mut self) -> Result<u16, SensorError>;
}

/// Where the physical sensors are wired
#[derive(Debug, Clone)]
pub struct PhysicalConfig {
    /// IIO device directory of the DHT22
    pub climate_device: PathBuf,
    /// GPIO value file of the vibration input
    pub vibration_gpio: PathBuf,
    /// IIO ADC raw file of the light sensor
    pub light_adc: PathBuf,
    /// Input reads high at rest (pull-up), low means vibration
    pub vibration_idles_high: bool,
}

impl Default for PhysicalConfig {
    fn default() -> Self {
        Self {
            climate_device: "/sys/bus/iio/devices/iio:device0".into(),
            vibration_gpio: "/sys/class/gpio/gpio4/value".into(),
            light_adc: "/sys/bus/iio/devices/iio:device1/in_voltage6_raw".into(),
            vibration_idles_high: true,
        }
    }
}

/// Sensor bus over Linux sysfs attributes
pub struct IioSensorBus {
    temperature: PathBuf,
    humidity: PathBuf,
    vibration: PathBuf,
    light: PathBuf,
}

impl IioSensorBus {
    pub fn new(config: &PhysicalConfig) -> Self {
        Self {
            temperature: config.climate_device.join("in_temp_input"),
            humidity: config.climate_device.join("in_humidityrelative_input"),
            vibration: config.vibration_gpio.clone(),
            light: config.light_adc.clone(),
        }
    }
}

fn read_attr(path: &Path) -> Result<String, SensorError> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| SensorError::Io {
            path: path.display().to_string(),
            source,
        })
}

fn parse_attr<T: std::str::FromStr>(path: &Path) -> Result<T, SensorError> {
    let raw = read_attr(path)?;
    if raw.is_empty() {
        return Err(SensorError::NoData);
    }
    raw.parse().map_err(|_| SensorError::Parse {
        path: path.display().to_string(),
        value: raw,
    })
}

impl SensorBus for IioSensorBus {
    fn read_climate(&mut self) -> Result<(f32, f32), SensorError> {
        // DHT IIO driver reports milli-degrees and milli-percent
        let temp: i64 = parse_attr(&self.temperature)?;
        let hum: i64 = parse_attr(&self.humidity)?;
        Ok((temp as f32 / 1000.0, hum as f32 / 1000.0))
    }

    fn read_digital(&mut self) -> Result<bool, SensorError> {
        let level: u8 = parse_attr(&self.vibration)?;
        Ok(level != 0)
    }

    fn read_analog(&mut self) -> Result<u16, SensorError> {
        let raw: i64 = parse_attr(&self.light)?;
        Ok(raw.clamp(0, ADC_MAX as i64) as u16)
    }
}

/// Reader over real hardware
pub struct PhysicalReader<B: SensorBus> {
    bus: B,
    vibration_idles_high: bool,
}

impl<B: SensorBus> PhysicalReader<B> {
    pub fn new(bus: B, config: &PhysicalConfig) -> Self {
        Self {
            bus,
            vibration_idles_high: config.vibration_idles_high,
        }
    }

    fn climate(&mut self) -> (f32, f32) {
        match self.bus.read_climate() {
            Ok((temperature, humidity)) => {
                let temperature = if temperature.is_nan() {
                    warn!("[SENSOR] Temperature is NaN, using {}", DEFAULT_TEMPERATURE_C);
                    DEFAULT_TEMPERATURE_C
                } else {
                    temperature
                };
                let humidity = if humidity.is_nan() {
                    warn!("[SENSOR] Humidity is NaN, using {}", DEFAULT_HUMIDITY_PCT);
                    DEFAULT_HUMIDITY_PCT
                } else {
                    humidity
                };
                (temperature, humidity)
            }
            Err(e) => {
                warn!("[SENSOR] Climate read failed: {}", e);
                (DEFAULT_TEMPERATURE_C, DEFAULT_HUMIDITY_PCT)
            }
        }
    }

    fn vibration(&mut self) -> u8 {
        match self.bus.read_digital() {
            Ok(level) => (level != self.vibration_idles_high) as u8,
            Err(e) => {
                warn!("[SENSOR] Vibration read failed: {}", e);
                0
            }
        }
    }

    fn luminosity(&mut self) -> u16 {
        match self.bus.read_analog() {
            Ok(raw) => raw.min(ADC_MAX),
            Err(e) => {
                warn!("[SENSOR] Light read failed: {}", e);
                0
            }
        }
    }
}

impl<B: SensorBus> SensorReader for PhysicalReader<B> {
    fn read(&mut self, _elapsed: Duration, timestamp: u64) -> Sample {
        let (temperature, humidity) = self.climate();
        Sample {
            temperature,
            humidity,
            vibration: self.vibration(),
            luminosity: self.luminosity(),
            timestamp,
        }
    }

    fn name(&self) -> &'static str {
        "physical"
    }
}
