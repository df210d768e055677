//! In-memory store for accepted readings

use iotmon_shared::SensorField;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default number of readings returned by a query
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Upper bound on the number of readings returned by a query
pub const MAX_QUERY_LIMIT: usize = 1000;

/// Readings kept before the oldest are evicted
pub const MAX_STORED_READINGS: usize = 10_000;

/// A reading accepted by the server
#[derive(Debug, Clone, Serialize)]
pub struct StoredReading {
    pub id: u64,
    pub sensor_id: Option<String>,
    pub device_id: Option<String>,
    pub sensor_type: SensorField,
    pub sensor_value: f64,
    /// Reading time in milliseconds since Unix epoch
    pub timestamp_ms: u64,
    /// Arrival time in milliseconds since Unix epoch
    pub received_at_ms: u64,
}

/// Shared, append-only reading store
#[derive(Clone, Default)]
pub struct ReadingStore {
    readings: Arc<RwLock<VecDeque<StoredReading>>>,
    next_id: Arc<AtomicU64>,
}

impl ReadingStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next reading id
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Append a reading, evicting the oldest past capacity
    pub async fn insert(&self, reading: StoredReading) {
        let mut readings = self.readings.write().await;
        if readings.len() >= MAX_STORED_READINGS {
            readings.pop_front();
        }
        readings.push_back(reading);
    }

    /// Newest-first readings, optionally filtered by field
    pub async fn query(&self, field: Option<SensorField>, limit: usize) -> Vec<StoredReading> {
        let limit = limit.min(MAX_QUERY_LIMIT);
        let readings = self.readings.read().await;
        readings
            .iter()
            .rev()
            .filter(|r| field.map_or(true, |f| r.sensor_type == f))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of stored readings
    pub async fn len(&self) -> usize {
        self.readings.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.readings.read().await.is_empty()
    }
}
