//! Simulated sensors
//!
//! Temperature and light follow slow sine waves over elapsed hours with
//! uniform noise; humidity tracks temperature inversely; vibration is a
//! Bernoulli event with probability 0.15.

use super::SensorReader;
use iotmon_shared::limits::ADC_MAX;
use iotmon_shared::Sample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const VIBRATION_PROBABILITY: f64 = 0.15;

/// Reader producing plausible synthetic samples
pub struct SimulatedReader<R: Rng + Send = StdRng> {
    rng: R,
}

impl SimulatedReader<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic reader for tests and replays
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedReader<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng + Send> SimulatedReader<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    fn temperature(&mut self, hours: f64) -> f32 {
        let base = 25.0 + 7.0 * (hours * 0.5).sin();
        let noisy = base + self.rng.random_range(-2.0_f64..=2.0);
        noisy.clamp(15.0, 35.0) as f32
    }

    fn humidity(&mut self, temperature: f32) -> f32 {
        let base = 70.0 - 1.5 * (temperature as f64 - 20.0);
        let noisy = base + self.rng.random_range(-3.0_f64..=3.0);
        noisy.clamp(30.0, 90.0) as f32
    }

    fn luminosity(&mut self, hours: f64) -> u16 {
        let base = 2000.0 + 1500.0 * (hours * 0.3).sin();
        let noisy = base + self.rng.random_range(-200.0_f64..=200.0);
        noisy.clamp(0.0, ADC_MAX as f64).round() as u16
    }
}

impl<R: Rng + Send> SensorReader for SimulatedReader<R> {
    fn read(&mut self, elapsed: Duration, timestamp: u64) -> Sample {
        let hours = elapsed.as_secs_f64() / 3600.0;

        let temperature = self.temperature(hours);
        let humidity = self.humidity(temperature);
        let vibration = self.rng.random_bool(VIBRATION_PROBABILITY) as u8;
        let luminosity = self.luminosity(hours);

        Sample {
            temperature,
            humidity,
            vibration,
            luminosity,
            timestamp,
        }
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
