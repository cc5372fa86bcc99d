use super::{
    AttachmentId, DepartmentId, DeviceTypeId, EmployeeId, Priority, ProviderId, RatingId, Status,
    TicketId, TicketUpdateId, UpdateType, UserId, UserType,
};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TICKET_NUMBER_PREFIX: &str = "TKT";
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

static TICKET_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^TKT-\d{8}-[A-Z0-9]{4}$").expect("ticket number pattern is valid"));

/// Generate a human-readable ticket number: `TKT-YYYYMMDD-XXXX`
///
/// The suffix is four random base36 characters. Uniqueness is enforced by the
/// store, which retries on collision.
#[must_use]
pub fn generate_ticket_number(date: NaiveDate) -> String {
    let value = loop {
        // the low 62 bits of a v4 uuid are random
        let (_, low) = uuid::Uuid::new_v4().as_u64_pair();
        if let Some(value) = accept_suffix_value(low & RANDOM_MASK) {
            break value;
        }
    };
    format!(
        "{TICKET_NUMBER_PREFIX}-{}-{}",
        date.format("%Y%m%d"),
        suffix_from(value)
    )
}

const SUFFIX_LEN: u32 = 4;
const SUFFIX_SPACE: u64 = 36u64.pow(SUFFIX_LEN);
const RANDOM_MASK: u64 = (1 << 62) - 1;
/// Largest multiple of `SUFFIX_SPACE` not above 2^62; draws at or past it are rejected
const SUFFIX_LIMIT: u64 = (RANDOM_MASK + 1) - (RANDOM_MASK + 1) % SUFFIX_SPACE;

const fn accept_suffix_value(random: u64) -> Option<u64> {
    if random < SUFFIX_LIMIT {
        Some(random % SUFFIX_SPACE)
    } else {
        None
    }
}

/// Four base36 digits, most significant first
fn suffix_from(mut value: u64) -> String {
    let mut digits = [b'0'; SUFFIX_LEN as usize];
    for digit in digits.iter_mut().rev() {
        *digit = BASE36[(value % 36) as usize];
        value /= 36;
    }
    digits.iter().map(|d| char::from(*d)).collect()
}

/// Check that a string has the ticket number shape
#[must_use]
pub fn is_ticket_number(value: &str) -> bool {
    TICKET_NUMBER_PATTERN.is_match(value)
}

/// A support ticket row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub ticket_number: String,
    pub employee_id: EmployeeId,
    /// Employee's department at creation time; never re-derived
    pub department_id: DepartmentId,
    pub device_type_id: DeviceTypeId,
    pub device_name: String,
    pub issue_description: String,
    pub priority: Priority,
    pub status: Status,
    pub assigned_provider_id: Option<ProviderId>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Ticket joined with the names shown in listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketSummary {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub employee_first_name: String,
    pub employee_last_name: String,
    pub department_name: String,
    pub device_type_name: String,
    pub provider_name: Option<String>,
}

impl TicketSummary {
    #[must_use]
    pub fn employee_name(&self) -> String {
        format!("{} {}", self.employee_first_name, self.employee_last_name)
    }
}

/// Full ticket view with its owned collections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketDetails {
    #[serde(flatten)]
    pub summary: TicketSummary,
    pub employee_user_id: UserId,
    pub employee_email: String,
    pub contact_number: Option<String>,
    pub department_category: String,
    pub provider_user_id: Option<UserId>,
    pub provider_email: Option<String>,
    pub attachments: Vec<Attachment>,
    /// Audit trail, oldest first
    pub updates: Vec<TicketUpdate>,
    pub rating: Option<Rating>,
}

impl TicketDetails {
    #[must_use]
    pub const fn ticket(&self) -> &Ticket {
        &self.summary.ticket
    }
}

/// Attachment metadata; the bytes live in the file store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub ticket_id: TicketId,
    pub file_name: String,
    pub stored_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// One audit trail entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketUpdate {
    pub id: TicketUpdateId,
    pub ticket_id: TicketId,
    pub user_id: UserId,
    pub update_type: UpdateType,
    pub message: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_email: String,
    pub author_type: UserType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub id: RatingId,
    pub ticket_id: TicketId,
    pub provider_id: ProviderId,
    pub employee_id: EmployeeId,
    pub score: i64,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied ticket fields, validated by the lifecycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketInput {
    pub device_type_id: Option<DeviceTypeId>,
    pub device_name: Option<String>,
    pub issue_description: Option<String>,
    pub priority: Option<String>,
}

/// Identity of a freshly created ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTicket {
    pub ticket_id: TicketId,
    pub ticket_number: String,
}

/// Listing filters, AND-combined
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketFilter {
    pub employee_id: Option<EmployeeId>,
    pub provider_id: Option<ProviderId>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring over ticket number, description and
    /// employee name
    pub search: Option<String>,
}

/// Scope of the dashboard aggregate
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StatisticsFilter {
    pub employee_id: Option<EmployeeId>,
    pub provider_id: Option<ProviderId>,
}

/// Ticket totals for dashboards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStatistics {
    pub total: i64,
    pub by_status: BTreeMap<Status, i64>,
    pub by_priority: BTreeMap<Priority, i64>,
}
