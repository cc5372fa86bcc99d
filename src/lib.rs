//! helpdesk - IT support ticket lifecycle engine
//!
//! This crate implements the transactional core of an internal help desk:
//! - Ticket creation with validated attachments and human-readable numbers
//! - Assignment, status transitions and comments with an append-only audit trail
//! - Provider ratings with a recomputed average
//! - Per-user notifications dispatched after commit by a background worker
//!
//! # Example
//!
//! ```rust,ignore
//! use helpdesk::attachments::{AttachmentValidator, LocalFileStore};
//! use helpdesk::lifecycle::TicketLifecycle;
//!
//! let db = Database::connect(&config.database).await?;
//! let (queue, _worker) = NotificationQueue::spawn(worker);
//! let lifecycle = TicketLifecycle::new(db, validator, files, queue);
//!
//! let created = lifecycle.create(employee_id, input, &uploads).await?;
//! lifecycle.assign(created.ticket_id, provider_id, admin_id).await?;
//! ```

// Allow missing error documentation for internal implementations
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_async)]
#![allow(clippy::cast_possible_wrap)]

pub mod attachments;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod lifecycle;
pub mod notifications;
pub mod rating;
pub mod storage;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use error::{HelpdeskError, Result};
