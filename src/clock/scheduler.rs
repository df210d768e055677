//! Fixed-interval scheduler over a logical clock

use std::time::Duration;

/// Decides when the next tick of a fixed-interval activity is due
///
/// A fresh scheduler is due immediately; afterwards it is due once
/// `interval` has elapsed since the last accepted tick.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval_ms: u64,
    last_tick_ms: Option<u64>,
}

impl Scheduler {
    /// Create a scheduler that fires every `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            last_tick_ms: None,
        }
    }

    /// Whether a tick is due at `now_ms`
    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.last_tick_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        }
    }

    /// Accept a tick if one is due
    pub fn poll(&mut self, now_ms: u64) -> bool {
        if self.is_due(now_ms) {
            self.last_tick_ms = Some(now_ms);
            true
        } else {
            false
        }
    }

    /// Time left until the next tick is due
    pub fn remaining(&self, now_ms: u64) -> Duration {
        match self.last_tick_ms {
            None => Duration::ZERO,
            Some(last) => {
                let next = last.saturating_add(self.interval_ms);
                Duration::from_millis(next.saturating_sub(now_ms))
            }
        }
    }

    /// Forget the last tick so the next poll fires immediately
    pub fn reset(&mut self) {
        self.last_tick_ms = None;
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
