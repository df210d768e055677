//! Clocks, scheduling and network time
//!
//! This module handles:
//! - A monotonic millisecond clock seam (real and manual)
//! - Fixed-interval tick scheduling driven by that clock
//! - SNTP queries and the synchronised wall-clock time source

mod scheduler;
pub mod sntp;
mod time_source;

pub use scheduler::Scheduler;
pub use sntp::{NtpQuery, SntpClient, TimeSyncError};
pub use time_source::{TimeSource, TimeSourceConfig, TimeSyncPolicy};

use std::time::Instant;

/// Monotonic milliseconds since the node started
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Clock backed by [`Instant`]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock for tests
#[cfg(test)]
#[derive(Default)]
pub struct ManualClock {
    now: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: std::sync::atomic::AtomicU64::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}
