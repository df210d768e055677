//! Status command handler

use super::HandlerContext;
use crate::command::CommandResult;

/// Handle `status`
pub fn handle_status(ctx: &HandlerContext<'_>) -> CommandResult {
    let status = ctx.status;
    let registry = ctx.delivery.registry();

    let time = match &status.local_time {
        Some(local) => format!("Time: synchronised, {}", local),
        None => "Time: NOT synchronised".to_string(),
    };

    CommandResult::Completed {
        lines: vec![
            format!("Link: {}", if status.link_up { "up" } else { "DOWN" }),
            time,
            format!("Uptime: {}s", status.uptime_secs),
            format!("Measurements: {}", status.measurement),
            format!(
                "Servers: {}/{} active",
                registry.active_count(),
                registry.len()
            ),
            format!("Strategy: {}", ctx.delivery.strategy()),
            format!("CSV fallback lines: {}", status.csv_lines),
        ],
    }
}
