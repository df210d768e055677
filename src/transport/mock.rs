//! Scripted transport for tests

use super::traits::{Transport, TransportError};
use async_trait::async_trait;
use iotmon_shared::SensorPayload;
use std::collections::HashMap;
use std::sync::Mutex;

/// How a mocked host answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostBehavior {
    /// Answer every request with this status
    Status(u16),
    /// Connection refused
    Down,
}

/// Answers per host (the `host:port` part of the URL) and records calls
#[derive(Default)]
pub struct MockTransport {
    hosts: Mutex<HashMap<String, HostBehavior>>,
    posts: Mutex<Vec<(String, SensorPayload)>>,
    probes: Mutex<Vec<String>>,
}

fn host_of(url: &str) -> String {
    let rest = url.strip_prefix("http://").unwrap_or(url);
    rest.split('/').next().unwrap_or(rest).to_string()
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, host: &str, behavior: HostBehavior) {
        self.hosts
            .lock()
            .unwrap()
            .insert(host.to_string(), behavior);
    }

    /// Hosts that received a POST, in call order
    pub fn posted_hosts(&self) -> Vec<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| host_of(url))
            .collect()
    }

    pub fn posts(&self) -> Vec<(String, SensorPayload)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.lock().unwrap().len()
    }

    fn answer(&self, url: &str) -> Result<u16, TransportError> {
        let behavior = self
            .hosts
            .lock()
            .unwrap()
            .get(&host_of(url))
            .copied()
            .unwrap_or(HostBehavior::Down);
        match behavior {
            HostBehavior::Status(code) => Ok(code),
            HostBehavior::Down => Err(TransportError::Connect(url.to_string())),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, url: &str, payload: &SensorPayload) -> Result<u16, TransportError> {
        self.posts
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        self.answer(url)
    }

    async fn probe(&self, url: &str) -> Result<u16, TransportError> {
        self.probes.lock().unwrap().push(url.to_string());
        self.answer(url)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
