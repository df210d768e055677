//! Command handlers for different console commands

mod help;
mod reliable;
mod servers;
mod status;

pub use help::handle_help;
pub use reliable::{handle_reliable, handle_reset};
pub use servers::{handle_add, handle_clear, handle_list, handle_scan};
pub use status::handle_status;

use crate::delivery::DeliveryManager;
use crate::report::NodeStatus;

/// Context passed to command handlers
pub struct HandlerContext<'a> {
    pub delivery: &'a mut DeliveryManager,
    /// Node state captured just before the command ran
    pub status: &'a NodeStatus,
}

impl<'a> HandlerContext<'a> {
    pub fn new(delivery: &'a mut DeliveryManager, status: &'a NodeStatus) -> Self {
        Self { delivery, status }
    }
}
