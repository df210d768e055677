//! Command executor - parses and dispatches console commands

use super::handlers::{self, HandlerContext};
use tracing::{debug, info};

/// A recognised console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// `add:<ip>` or `add:<ip>:<port>`
    Add(String),
    Scan,
    Clear,
    List,
    Status,
    Reliable,
    Reset,
    Help,
}

impl ConsoleCommand {
    /// Parse a console line; `None` for anything unrecognised
    ///
    /// Matching is case-sensitive after trimming surrounding whitespace.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if let Some(address) = line.strip_prefix("add:") {
            return Some(ConsoleCommand::Add(address.trim().to_string()));
        }

        match line {
            "scan" => Some(ConsoleCommand::Scan),
            "clear" => Some(ConsoleCommand::Clear),
            "list" => Some(ConsoleCommand::List),
            "status" => Some(ConsoleCommand::Status),
            "reliable" => Some(ConsoleCommand::Reliable),
            "reset" => Some(ConsoleCommand::Reset),
            "help" => Some(ConsoleCommand::Help),
            _ => None,
        }
    }
}

/// Result of command execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Command completed; lines to show the operator
    Completed { lines: Vec<String> },
    /// Command ran but its action failed
    Failed { message: String },
    /// Command refused without changing any state
    Rejected { message: String },
}

impl CommandResult {
    pub fn line(message: impl Into<String>) -> Self {
        CommandResult::Completed {
            lines: vec![message.into()],
        }
    }

    /// Console lines for this result
    pub fn into_lines(self) -> Vec<String> {
        match self {
            CommandResult::Completed { lines } => lines,
            CommandResult::Failed { message } => vec![format!("ERROR: {}", message)],
            CommandResult::Rejected { message } => vec![format!("REJECTED: {}", message)],
        }
    }
}

/// Executes console commands against the node
#[derive(Debug, Default)]
pub struct CommandExecutor {
    executed: u64,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands executed so far
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Execute one console line
    ///
    /// Unrecognised input yields `None` and is otherwise ignored.
    pub async fn execute(&mut self, line: &str, ctx: HandlerContext<'_>) -> Option<CommandResult> {
        let Some(command) = ConsoleCommand::parse(line) else {
            debug!("[CMD] Ignoring {:?}", line.trim());
            return None;
        };

        info!("[CMD] Executing {:?}", command);
        self.executed += 1;

        let result = match command {
            ConsoleCommand::Add(address) => handlers::handle_add(ctx, &address).await,
            ConsoleCommand::Scan => handlers::handle_scan(ctx).await,
            ConsoleCommand::Clear => handlers::handle_clear(ctx),
            ConsoleCommand::List => handlers::handle_list(&ctx),
            ConsoleCommand::Status => handlers::handle_status(&ctx),
            ConsoleCommand::Reliable => handlers::handle_reliable(&ctx),
            ConsoleCommand::Reset => handlers::handle_reset(ctx),
            ConsoleCommand::Help => handlers::handle_help(),
        };

        match &result {
            CommandResult::Completed { .. } => debug!("[CMD] Completed"),
            CommandResult::Failed { message } => info!("[CMD] Failed: {}", message),
            CommandResult::Rejected { message } => info!("[CMD] Rejected: {}", message),
        }
        Some(result)
    }
}
