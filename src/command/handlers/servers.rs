//! Server registry command handlers

use super::HandlerContext;
use crate::command::CommandResult;
use crate::registry::RegistryError;

/// Handle `add:<ip>`
pub async fn handle_add(ctx: HandlerContext<'_>, address: &str) -> CommandResult {
    match ctx.delivery.add_server(address).await {
        Ok(slot) => {
            let url = ctx
                .delivery
                .registry()
                .get(slot)
                .and_then(|r| r.resolved_url.clone())
                .unwrap_or_default();
            CommandResult::line(format!("Added server {} in slot {}: {}", address, slot, url))
        }
        Err(e @ RegistryError::Unreachable(_)) => CommandResult::Failed {
            message: e.to_string(),
        },
        Err(e) => CommandResult::Rejected {
            message: e.to_string(),
        },
    }
}

/// Handle `scan`
///
/// Forced discovery: the pin is dropped and may be re-established by the
/// next successful delivery.
pub async fn handle_scan(ctx: HandlerContext<'_>) -> CommandResult {
    let active = ctx.delivery.discover(true).await;
    let known = ctx.delivery.registry().len();
    CommandResult::line(format!("Scan complete: {}/{} server(s) active", active, known))
}

/// Handle `clear`
pub fn handle_clear(ctx: HandlerContext<'_>) -> CommandResult {
    ctx.delivery.clear();
    CommandResult::line("All servers marked inactive")
}

/// Handle `list`
pub fn handle_list(ctx: &HandlerContext<'_>) -> CommandResult {
    let registry = ctx.delivery.registry();
    if registry.is_empty() {
        return CommandResult::line("No servers registered");
    }

    let pinned = ctx.delivery.selector().pinned();
    let mut lines = vec![format!(
        "Servers ({}/{} slots):",
        registry.len(),
        registry.capacity()
    )];
    for (i, record) in registry.records().iter().enumerate() {
        lines.push(format!(
            "  [{}] {}:{} {}{}{}",
            i,
            record.address,
            record.port,
            if record.is_active { "ACTIVE" } else { "inactive" },
            record
                .resolved_url
                .as_deref()
                .map(|url| format!(" {}", url))
                .unwrap_or_default(),
            if pinned == Some(i) { " (pinned)" } else { "" },
        ));
    }
    CommandResult::Completed { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::{DeliveryConfig, DeliveryManager};
    use crate::registry::{RegistryConfig, ServerRegistry};
    use crate::report::NodeStatus;
    use crate::transport::mock::{HostBehavior, MockTransport};
    use iotmon_shared::{DeviceIdentity, Sample};
    use std::sync::Arc;

    async fn manager(transport: Arc<MockTransport>, hosts: &[&str]) -> DeliveryManager {
        let hosts: Vec<String> = hosts.iter().map(|h| h.to_string()).collect();
        let registry = ServerRegistry::with_candidates(RegistryConfig::default(), &hosts).unwrap();
        let mut mgr = DeliveryManager::new(
            DeliveryConfig::default(),
            DeviceIdentity::new("ESP32_001"),
            transport,
            registry,
        );
        mgr.start(0).await;
        mgr
    }

    fn sample() -> Sample {
        Sample {
            temperature: 20.0,
            humidity: 50.0,
            vibration: 0,
            luminosity: 1000,
            timestamp: 1_718_000_000,
        }
    }

    #[tokio::test]
    async fn test_add_reports_slot_and_unreachable() {
        let transport = Arc::new(MockTransport::new());
        transport.set("10.0.0.9:8000", HostBehavior::Status(200));
        let mut mgr = manager(transport, &["10.0.0.1"]).await;
        let status = NodeStatus::default();

        let result = handle_add(HandlerContext::new(&mut mgr, &status), "10.0.0.9").await;
        assert_eq!(
            result.into_lines(),
            vec!["Added server 10.0.0.9 in slot 0: http://10.0.0.9:8000/data".to_string()]
        );

        let result = handle_add(HandlerContext::new(&mut mgr, &status), "10.0.0.10").await;
        assert!(matches!(result, CommandResult::Failed { .. }));

        let result = handle_add(HandlerContext::new(&mut mgr, &status), "").await;
        assert!(matches!(result, CommandResult::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_scan_unpins_and_counts() {
        let transport = Arc::new(MockTransport::new());
        transport.set("10.0.0.1:8000", HostBehavior::Status(200));
        let mut mgr = manager(transport, &["10.0.0.1", "10.0.0.2"]).await;
        mgr.send_to_all(&sample()).await;
        assert_eq!(mgr.selector().pinned(), Some(0));
        let status = NodeStatus::default();

        let result = handle_scan(HandlerContext::new(&mut mgr, &status)).await;
        assert_eq!(
            result.into_lines(),
            vec!["Scan complete: 1/2 server(s) active".to_string()]
        );
        assert_eq!(mgr.selector().pinned(), None);
    }

    #[tokio::test]
    async fn test_clear_then_list() {
        let transport = Arc::new(MockTransport::new());
        transport.set("10.0.0.1:8000", HostBehavior::Status(200));
        let mut mgr = manager(transport, &["10.0.0.1", "10.0.0.2"]).await;
        mgr.send_to_all(&sample()).await;
        let status = NodeStatus::default();

        let lines = handle_list(&HandlerContext::new(&mut mgr, &status)).into_lines();
        assert_eq!(lines[1], "  [0] 10.0.0.1:8000 ACTIVE http://10.0.0.1:8000/data (pinned)");
        assert_eq!(lines[2], "  [1] 10.0.0.2:8000 inactive");

        handle_clear(HandlerContext::new(&mut mgr, &status));
        let lines = handle_list(&HandlerContext::new(&mut mgr, &status)).into_lines();
        assert_eq!(lines[1], "  [0] 10.0.0.1:8000 inactive");
        assert_eq!(mgr.selector().pinned(), None);
    }
}
