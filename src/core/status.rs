//! Enumerations persisted as text columns

use crate::error::{HelpdeskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ticket priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parse a caller-supplied priority, falling back to `medium`
    ///
    /// Ticket creation never fails on priority: absent or unknown values
    /// become the default.
    #[must_use]
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for Priority {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(HelpdeskError::validation(format!("Unknown priority '{other}'"))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket lifecycle status
///
/// `pending → assigned → in_progress → resolved → closed`. Only `pending`
/// tickets are without an assigned provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    Assigned,
    InProgress,
    Resolved,
    Closed,
}

impl Status {
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Assigned,
        Self::InProgress,
        Self::Resolved,
        Self::Closed,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Statuses `update_status` may move a ticket into
    #[must_use]
    pub const fn is_update_target(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether a provider may still be (re)assigned from this status
    #[must_use]
    pub const fn is_assignable(self) -> bool {
        matches!(self, Self::Pending | Self::Assigned | Self::InProgress)
    }

    /// Parse a transition target for `update_status`
    pub fn parse_update_target(value: &str) -> Result<Self> {
        match value.parse::<Self>() {
            Ok(status) if status.is_update_target() => Ok(status),
            _ => Err(HelpdeskError::InvalidStatus(value.to_string())),
        }
    }
}

impl FromStr for Status {
    type Err = HelpdeskError;

    /// Exact stored spelling only
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| HelpdeskError::InvalidStatus(s.to_string()))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of audit trail entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    Comment,
    Assignment,
    StatusChange,
}

impl UpdateType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Assignment => "assignment",
            Self::StatusChange => "status_change",
        }
    }
}

impl FromStr for UpdateType {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "comment" => Ok(Self::Comment),
            "assignment" => Ok(Self::Assignment),
            "status_change" => Ok(Self::StatusChange),
            other => Err(HelpdeskError::custom(format!("Unknown update type '{other}'"))),
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Employee,
    ServiceProvider,
    Admin,
}

impl UserType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::ServiceProvider => "service_provider",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for UserType {
    type Err = HelpdeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "employee" => Ok(Self::Employee),
            "service_provider" => Ok(Self::ServiceProvider),
            "admin" => Ok(Self::Admin),
            other => Err(HelpdeskError::custom(format!("Unknown user type '{other}'"))),
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
