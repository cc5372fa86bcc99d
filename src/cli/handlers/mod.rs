//! Command handlers
//!
//! Each handler receives an open [`HandlerContext`] and an
//! [`OutputFormatter`](crate::cli::OutputFormatter); the dispatcher closes the
//! context once the handler returns.

mod common;
mod directory;
mod notifications;
mod tickets;

pub use common::HandlerContext;
pub use directory::handle_directory_command;
pub use notifications::handle_notification_command;
pub use tickets::{
    CreateParams, ListParams, handle_assign, handle_comment, handle_create, handle_init,
    handle_list, handle_rate, handle_show, handle_stats, handle_status,
};
