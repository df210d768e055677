//! Reliable-server command handlers

use super::HandlerContext;
use crate::command::CommandResult;
use crate::registry::MAX_CONSECUTIVE_FAILURES;

/// Handle `reliable`
pub fn handle_reliable(ctx: &HandlerContext<'_>) -> CommandResult {
    let selector = ctx.delivery.selector();
    if !ctx.delivery.strategy().uses_pin() {
        return CommandResult::line(format!(
            "Reliable server: disabled ({} strategy)",
            ctx.delivery.strategy()
        ));
    }

    match selector
        .pinned()
        .and_then(|i| ctx.delivery.registry().get(i).map(|r| (i, r)))
    {
        Some((index, record)) => CommandResult::line(format!(
            "Reliable server: [{}] {}:{} ({}/{} failures)",
            index,
            record.address,
            record.port,
            selector.failure_count(),
            MAX_CONSECUTIVE_FAILURES
        )),
        None => CommandResult::line("Reliable server: none"),
    }
}

/// Handle `reset`
pub fn handle_reset(ctx: HandlerContext<'_>) -> CommandResult {
    ctx.delivery.reset_pin();
    CommandResult::line("Reliable server cleared")
}
