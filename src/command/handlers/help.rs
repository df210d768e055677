//! Help command handler

use crate::command::CommandResult;

const COMMANDS: [(&str, &str); 8] = [
    ("add:<ip>[:port]", "health-check and register a server"),
    ("scan", "rediscover all servers (drops the reliable server)"),
    ("clear", "mark every server inactive"),
    ("list", "show registered servers"),
    ("status", "show link, time and delivery state"),
    ("reliable", "show the reliable server"),
    ("reset", "forget the reliable server"),
    ("help", "show this list"),
];

/// Handle `help`
pub fn handle_help() -> CommandResult {
    let mut lines = vec!["Commands:".to_string()];
    lines.extend(
        COMMANDS
            .iter()
            .map(|(cmd, what)| format!("  {:<16} {}", cmd, what)),
    );
    CommandResult::Completed { lines }
}
