//! In-app notifications and their delivery
//!
//! [`NotificationDispatcher`] owns the `notifications` table. Lifecycle
//! operations never call it directly: they submit a [`NotificationJob`] to the
//! [`NotificationQueue`] after their transaction commits, and the background
//! [`NotificationWorker`] resolves recipients, writes the rows and sends email.

mod dispatcher;
mod email;
mod queue;

pub use dispatcher::NotificationDispatcher;
pub use email::{EmailNotifier, LogMailTransport, MailTransport};
pub use queue::{NotificationJob, NotificationQueue, NotificationWorker};

#[cfg(test)]
pub use email::MockMailTransport;

use crate::core::{NotificationId, Status, TicketId, UserId};
use crate::error::{HelpdeskError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of event a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewTicket,
    TicketAssigned,
    TicketStatusChange,
    NewComment,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewTicket => "new_ticket",
            Self::TicketAssigned => "ticket_assigned",
            Self::TicketStatusChange => "ticket_status_change",
            Self::NewComment => "new_comment",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "new_ticket" => Ok(Self::NewTicket),
            "ticket_assigned" => Ok(Self::TicketAssigned),
            "ticket_status_change" => Ok(Self::TicketStatusChange),
            "new_comment" => Ok(Self::NewComment),
            other => Err(HelpdeskError::validation(format!(
                "Unknown notification type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub ticket_id: Option<TicketId>,
    /// Number of the linked ticket, when there is one
    pub ticket_number: Option<String>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Notification content shared by every recipient of one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub ticket_id: Option<TicketId>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            ticket_id: None,
        }
    }

    #[must_use]
    pub const fn for_ticket(mut self, ticket_id: TicketId) -> Self {
        self.ticket_id = Some(ticket_id);
        self
    }

    /// Admin alert for a ticket awaiting assignment
    pub fn new_ticket(ticket_id: TicketId, ticket_number: &str) -> Self {
        Self::new(
            NotificationKind::NewTicket,
            "New Ticket Submitted",
            format!("A new ticket #{ticket_number} has been submitted and requires assignment"),
        )
        .for_ticket(ticket_id)
    }

    /// Provider alert for a ticket assigned to them
    pub fn ticket_assigned(ticket_id: TicketId, ticket_number: &str) -> Self {
        Self::new(
            NotificationKind::TicketAssigned,
            "New Ticket Assigned",
            format!("You have been assigned to ticket #{ticket_number}"),
        )
        .for_ticket(ticket_id)
    }

    /// Employee alert for a status transition
    pub fn status_changed(ticket_id: TicketId, ticket_number: &str, status: Status) -> Self {
        Self::new(
            NotificationKind::TicketStatusChange,
            "Ticket Status Updated",
            format!("Ticket #{ticket_number}: {}", status_message(status)),
        )
        .for_ticket(ticket_id)
    }

    pub fn new_comment(ticket_id: TicketId, ticket_number: &str) -> Self {
        Self::new(
            NotificationKind::NewComment,
            "New Comment",
            format!("New comment on ticket #{ticket_number}"),
        )
        .for_ticket(ticket_id)
    }
}

/// Employee-facing sentence describing a status
#[must_use]
pub fn status_message(status: Status) -> String {
    match status {
        Status::Assigned => "Your ticket has been assigned to a service provider".to_string(),
        Status::InProgress => "Work has started on your ticket".to_string(),
        Status::Resolved => "Your ticket has been resolved".to_string(),
        Status::Closed => "Your ticket has been closed".to_string(),
        Status::Pending => format!("Your ticket status has been updated to {status}"),
    }
}
