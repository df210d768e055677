//! Network link supervision
//!
//! The node only needs to know whether it has a usable network link and to
//! wait for one to come back. On a host the link is "up" when any
//! non-loopback interface holds an address.

use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{info, warn};

/// Link reconnection settings
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Link state polls before giving up
    pub reconnect_attempts: u32,
    /// Delay between polls
    pub reconnect_delay: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: 20,
            reconnect_delay: Duration::from_millis(500),
        }
    }
}

/// A network link the node delivers over
#[async_trait]
pub trait NetworkLink: Send + Sync {
    /// Whether the link is currently usable
    fn is_up(&self) -> bool;

    /// Address the node is reachable on, if any
    fn local_addr(&self) -> Option<IpAddr>;

    /// Wait for the link to come back, polling its state
    async fn reconnect(&self, config: &LinkConfig) -> bool {
        for attempt in 1..=config.reconnect_attempts {
            if self.is_up() {
                info!("[LINK] Link up after {} poll(s)", attempt);
                return true;
            }
            tokio::time::sleep(config.reconnect_delay).await;
        }

        let up = self.is_up();
        if !up {
            warn!(
                "[LINK] Link still down after {} polls",
                config.reconnect_attempts
            );
        }
        up
    }
}

/// Link state from the host's network interfaces
#[derive(Debug, Default)]
pub struct InterfaceLink;

impl InterfaceLink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NetworkLink for InterfaceLink {
    fn is_up(&self) -> bool {
        self.local_addr().is_some()
    }

    fn local_addr(&self) -> Option<IpAddr> {
        match if_addrs::get_if_addrs() {
            Ok(interfaces) => interfaces
                .into_iter()
                .find(|iface| !iface.is_loopback())
                .map(|iface| iface.ip()),
            Err(e) => {
                warn!("[LINK] Failed to enumerate interfaces: {}", e);
                None
            }
        }
    }
}

/// Link with a state flipped by tests
#[cfg(test)]
#[derive(Default)]
pub struct StaticLink {
    up: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl StaticLink {
    pub fn new(up: bool) -> Self {
        Self {
            up: std::sync::atomic::AtomicBool::new(up),
        }
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
#[async_trait]
impl NetworkLink for StaticLink {
    fn is_up(&self) -> bool {
        self.up.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn local_addr(&self) -> Option<IpAddr> {
        self.is_up().then(|| IpAddr::from([192, 168, 1, 50]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn fast() -> LinkConfig {
        LinkConfig {
            reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_reconnect_when_already_up() {
        let link = StaticLink::new(true);
        assert!(link.reconnect(&fast()).await);
    }

    #[tokio::test]
    async fn test_reconnect_gives_up() {
        let link = StaticLink::new(false);
        assert!(!link.reconnect(&fast()).await);
        assert!(link.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_reconnect_waits_for_link() {
        let link = Arc::new(StaticLink::new(false));
        let flipper = link.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(15)).await;
            flipper.set_up(true);
        });

        assert!(link.reconnect(&fast()).await);
    }
}
