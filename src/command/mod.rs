//! Operator command handling for the sensor node
//!
//! This module handles:
//! - Parsing console lines into commands
//! - Dispatching to the appropriate command handlers
//! - Rendering command results as console lines

mod executor;
pub mod handlers;

pub use executor::{CommandExecutor, CommandResult, ConsoleCommand};
