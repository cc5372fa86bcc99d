//! Raw row shapes and their conversion into domain types
//!
//! Enumerations are stored as text and parsed on the way out so that a bad
//! value in the database surfaces as an error instead of a panic.

use crate::core::{
    Attachment, AttachmentId, DepartmentId, DeviceTypeId, EmployeeId, ProviderId, Rating,
    RatingId, Ticket, TicketId, TicketSummary, TicketUpdate, TicketUpdateId, UserId,
};
use crate::error::{HelpdeskError, Result};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
pub(crate) struct TicketRow {
    pub id: TicketId,
    pub ticket_number: String,
    pub employee_id: EmployeeId,
    pub department_id: DepartmentId,
    pub device_type_id: DeviceTypeId,
    pub device_name: String,
    pub issue_description: String,
    pub priority: String,
    pub status: String,
    pub assigned_provider_id: Option<ProviderId>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = HelpdeskError;

    fn try_from(row: TicketRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            ticket_number: row.ticket_number,
            employee_id: row.employee_id,
            department_id: row.department_id,
            device_type_id: row.device_type_id,
            device_name: row.device_name,
            issue_description: row.issue_description,
            priority: row.priority.parse()?,
            status: row.status.parse()?,
            assigned_provider_id: row.assigned_provider_id,
            version: row.version,
            created_at: row.created_at,
            assigned_at: row.assigned_at,
            resolved_at: row.resolved_at,
            closed_at: row.closed_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct SummaryRow {
    #[sqlx(flatten)]
    pub ticket: TicketRow,
    pub employee_first_name: String,
    pub employee_last_name: String,
    pub department_name: String,
    pub device_type_name: String,
    pub provider_name: Option<String>,
}

impl TryFrom<SummaryRow> for TicketSummary {
    type Error = HelpdeskError;

    fn try_from(row: SummaryRow) -> Result<Self> {
        Ok(Self {
            ticket: row.ticket.try_into()?,
            employee_first_name: row.employee_first_name,
            employee_last_name: row.employee_last_name,
            department_name: row.department_name,
            device_type_name: row.device_type_name,
            provider_name: row.provider_name,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct DetailsRow {
    #[sqlx(flatten)]
    pub summary: SummaryRow,
    pub employee_user_id: UserId,
    pub employee_email: String,
    pub contact_number: Option<String>,
    pub department_category: String,
    pub provider_user_id: Option<UserId>,
    pub provider_email: Option<String>,
}

#[derive(Debug, FromRow)]
pub(crate) struct AttachmentRow {
    pub id: AttachmentId,
    pub ticket_id: TicketId,
    pub file_name: String,
    pub file_path: String,
    pub file_type: String,
    pub file_size: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<AttachmentRow> for Attachment {
    fn from(row: AttachmentRow) -> Self {
        Self {
            id: row.id,
            ticket_id: row.ticket_id,
            file_name: row.file_name,
            stored_path: row.file_path,
            mime_type: row.file_type,
            size_bytes: row.file_size,
            uploaded_at: row.uploaded_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct UpdateRow {
    pub id: TicketUpdateId,
    pub ticket_id: TicketId,
    pub user_id: UserId,
    pub update_type: String,
    pub message: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author_email: String,
    pub author_type: String,
}

impl TryFrom<UpdateRow> for TicketUpdate {
    type Error = HelpdeskError;

    fn try_from(row: UpdateRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            ticket_id: row.ticket_id,
            user_id: row.user_id,
            update_type: row.update_type.parse()?,
            message: row.message,
            old_value: row.old_value,
            new_value: row.new_value,
            created_at: row.created_at,
            author_email: row.author_email,
            author_type: row.author_type.parse()?,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct RatingRow {
    pub id: RatingId,
    pub ticket_id: TicketId,
    pub provider_id: ProviderId,
    pub employee_id: EmployeeId,
    pub rating: i64,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Self {
            id: row.id,
            ticket_id: row.ticket_id,
            provider_id: row.provider_id,
            employee_id: row.employee_id,
            score: row.rating,
            feedback: row.feedback,
            created_at: row.created_at,
        }
    }
}
