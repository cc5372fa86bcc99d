use super::audit::AuditTrail;
use super::db::Database;
use super::rows::{AttachmentRow, DetailsRow, RatingRow, SummaryRow, TicketRow};
use crate::core::{
    Attachment, AttachmentId, DepartmentId, DeviceTypeId, EmployeeId, Priority, ProviderId,
    Rating, StatisticsFilter, Status, Ticket, TicketDetails, TicketFilter, TicketId,
    TicketStatistics, TicketSummary,
};
use crate::error::{HelpdeskError, Result};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

const TICKET_COLUMNS: &str = "t.id, t.ticket_number, t.employee_id, t.department_id, \
     t.device_type_id, t.device_name, t.issue_description, t.priority, t.status, \
     t.assigned_provider_id, t.version, t.created_at, t.assigned_at, t.resolved_at, \
     t.closed_at, t.updated_at";

const SUMMARY_COLUMNS: &str = "e.first_name AS employee_first_name, \
     e.last_name AS employee_last_name, d.name AS department_name, \
     dt.type_name AS device_type_name, sp.provider_name AS provider_name";

const SUMMARY_JOINS: &str = " FROM tickets t \
     JOIN employees e ON t.employee_id = e.id \
     JOIN departments d ON t.department_id = d.id \
     JOIN device_types dt ON t.device_type_id = dt.id \
     LEFT JOIN service_providers sp ON t.assigned_provider_id = sp.id";

/// Maximum page size accepted by `query`
pub const MAX_PAGE_SIZE: i64 = 200;

/// Fields for a new ticket row
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub ticket_number: String,
    pub employee_id: EmployeeId,
    pub department_id: DepartmentId,
    pub device_type_id: DeviceTypeId,
    pub device_name: String,
    pub issue_description: String,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new attachment row
#[derive(Debug, Clone)]
pub struct NewAttachment<'a> {
    pub ticket_id: TicketId,
    pub file_name: &'a str,
    pub stored_path: &'a str,
    pub mime_type: &'a str,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Relational access to tickets and their joins
///
/// Write methods take the connection of the caller's transaction so that a
/// lifecycle operation commits or rolls back as one unit. Read methods
/// acquire their own pooled connection under the database timeout.
#[derive(Debug, Clone)]
pub struct TicketStore {
    db: Database,
}

impl TicketStore {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, ticket: &NewTicket) -> Result<TicketId> {
        let result = sqlx::query(
            "INSERT INTO tickets \
             (ticket_number, employee_id, department_id, device_type_id, device_name, \
              issue_description, priority, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?)",
        )
        .bind(&ticket.ticket_number)
        .bind(ticket.employee_id)
        .bind(ticket.department_id)
        .bind(ticket.device_type_id)
        .bind(&ticket.device_name)
        .bind(&ticket.issue_description)
        .bind(ticket.priority.as_str())
        .bind(ticket.created_at)
        .bind(ticket.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(TicketId(result.last_insert_rowid()))
    }

    pub async fn ticket_number_exists(
        &self,
        conn: &mut SqliteConnection,
        ticket_number: &str,
    ) -> Result<bool> {
        let found: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM tickets WHERE ticket_number = ?")
            .bind(ticket_number)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(found.is_some())
    }

    pub async fn insert_attachment(
        &self,
        conn: &mut SqliteConnection,
        attachment: &NewAttachment<'_>,
    ) -> Result<AttachmentId> {
        let result = sqlx::query(
            "INSERT INTO ticket_attachments \
             (ticket_id, file_name, file_path, file_type, file_size, uploaded_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(attachment.ticket_id)
        .bind(attachment.file_name)
        .bind(attachment.stored_path)
        .bind(attachment.mime_type)
        .bind(attachment.size_bytes)
        .bind(attachment.uploaded_at)
        .execute(&mut *conn)
        .await?;

        Ok(AttachmentId(result.last_insert_rowid()))
    }

    /// Plain ticket row, read through the caller's connection
    pub async fn find(&self, conn: &mut SqliteConnection, id: TicketId) -> Result<Option<Ticket>> {
        let row: Option<TicketRow> =
            sqlx::query_as(&format!("SELECT {TICKET_COLUMNS} FROM tickets t WHERE t.id = ?"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        row.map(Ticket::try_from).transpose()
    }

    /// Ticket with joined names, attachments, chronological history and rating
    ///
    /// Returns `None` when the ticket does not exist. A ticket without
    /// attachments, history or rating yields empty collections and `None`.
    pub async fn get_by_id(&self, id: TicketId) -> Result<Option<TicketDetails>> {
        self.db
            .timed("get_ticket", async {
                let mut conn = self.db.pool().acquire().await?;
                self.details(&mut conn, id).await
            })
            .await
    }

    pub(crate) async fn details(
        &self,
        conn: &mut SqliteConnection,
        id: TicketId,
    ) -> Result<Option<TicketDetails>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS}, {SUMMARY_COLUMNS}, \
             e.user_id AS employee_user_id, u.email AS employee_email, e.contact_number, \
             d.category AS department_category, sp.user_id AS provider_user_id, \
             spu.email AS provider_email \
             {SUMMARY_JOINS} \
             JOIN users u ON e.user_id = u.id \
             LEFT JOIN users spu ON sp.user_id = spu.id \
             WHERE t.id = ?"
        );
        let Some(row) = sqlx::query_as::<_, DetailsRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };

        let attachments = self.attachments(conn, id).await?;
        let updates = AuditTrail::load(conn, id).await?;
        let rating = self.rating(conn, id).await?;

        Ok(Some(TicketDetails {
            summary: row.summary.try_into()?,
            employee_user_id: row.employee_user_id,
            employee_email: row.employee_email,
            contact_number: row.contact_number,
            department_category: row.department_category,
            provider_user_id: row.provider_user_id,
            provider_email: row.provider_email,
            attachments,
            updates,
            rating,
        }))
    }

    async fn attachments(&self, conn: &mut SqliteConnection, id: TicketId) -> Result<Vec<Attachment>> {
        let rows: Vec<AttachmentRow> = sqlx::query_as(
            "SELECT id, ticket_id, file_name, file_path, file_type, file_size, uploaded_at \
             FROM ticket_attachments WHERE ticket_id = ? ORDER BY uploaded_at ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(Attachment::from).collect())
    }

    pub(crate) async fn rating(&self, conn: &mut SqliteConnection, id: TicketId) -> Result<Option<Rating>> {
        let row: Option<RatingRow> = sqlx::query_as(
            "SELECT id, ticket_id, provider_id, employee_id, rating, feedback, created_at \
             FROM ticket_ratings WHERE ticket_id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(Rating::from))
    }

    /// One page of tickets, most recent first
    pub async fn query(&self, filter: &TicketFilter, limit: i64, offset: i64) -> Result<Vec<TicketSummary>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = offset.max(0);

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {TICKET_COLUMNS}, {SUMMARY_COLUMNS}{SUMMARY_JOINS} WHERE 1=1"
        ));

        if let Some(employee_id) = filter.employee_id {
            qb.push(" AND t.employee_id = ").push_bind(employee_id);
        }
        if let Some(provider_id) = filter.provider_id {
            qb.push(" AND t.assigned_provider_id = ").push_bind(provider_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND t.status = ").push_bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND t.priority = ").push_bind(priority.as_str());
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
            qb.push(" AND (LOWER(t.ticket_number) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR LOWER(t.issue_description) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR LOWER(e.first_name || ' ' || e.last_name) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        qb.push(" ORDER BY t.created_at DESC, t.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        tracing::debug!(sql = qb.sql(), "Listing tickets");

        self.db
            .timed("list_tickets", async {
                let rows: Vec<SummaryRow> = qb.build_query_as().fetch_all(self.db.pool()).await?;
                rows.into_iter().map(TicketSummary::try_from).collect()
            })
            .await
    }

    /// Move a ticket to `status`, stamping first-entry timestamps
    ///
    /// `resolved_at` and `closed_at` are only ever set once; later
    /// transitions leave them untouched.
    pub async fn update_status(
        &self,
        conn: &mut SqliteConnection,
        id: TicketId,
        status: Status,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let resolved_at = (status == Status::Resolved).then_some(now);
        let closed_at = (status == Status::Closed).then_some(now);

        let result = sqlx::query(
            "UPDATE tickets SET status = ?, updated_at = ?, \
             resolved_at = COALESCE(resolved_at, ?), closed_at = COALESCE(closed_at, ?), \
             version = version + 1 \
             WHERE id = ? AND version = ?",
        )
        .bind(status.as_str())
        .bind(now)
        .bind(resolved_at)
        .bind(closed_at)
        .bind(id)
        .bind(expected_version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(HelpdeskError::ConcurrentModification { ticket_id: id.get() });
        }
        Ok(())
    }

    /// Assign a provider and move the ticket to `assigned`
    pub async fn assign_provider(
        &self,
        conn: &mut SqliteConnection,
        id: TicketId,
        provider_id: ProviderId,
        expected_version: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE tickets SET assigned_provider_id = ?, status = 'assigned', \
             assigned_at = ?, updated_at = ?, version = version + 1 \
             WHERE id = ? AND version = ?",
        )
        .bind(provider_id)
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(expected_version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(HelpdeskError::ConcurrentModification { ticket_id: id.get() });
        }
        Ok(())
    }

    /// Totals grouped by status and priority, with zero-filled buckets
    pub async fn statistics(&self, filter: StatisticsFilter) -> Result<TicketStatistics> {
        self.db
            .timed("ticket_statistics", async {
                let pool = self.db.pool();
                let mut stats = TicketStatistics {
                    total: 0,
                    by_status: Status::ALL.iter().map(|s| (*s, 0)).collect(),
                    by_priority: Priority::ALL.iter().map(|p| (*p, 0)).collect(),
                };

                let mut qb = QueryBuilder::<Sqlite>::new("SELECT status, COUNT(*) FROM tickets WHERE 1=1");
                push_scope(&mut qb, filter);
                qb.push(" GROUP BY status");
                let by_status: Vec<(String, i64)> = qb.build_query_as().fetch_all(pool).await?;
                for (status, count) in by_status {
                    stats.by_status.insert(status.parse()?, count);
                    stats.total += count;
                }

                let mut qb = QueryBuilder::<Sqlite>::new("SELECT priority, COUNT(*) FROM tickets WHERE 1=1");
                push_scope(&mut qb, filter);
                qb.push(" GROUP BY priority");
                let by_priority: Vec<(String, i64)> = qb.build_query_as().fetch_all(pool).await?;
                for (priority, count) in by_priority {
                    stats.by_priority.insert(priority.parse()?, count);
                }

                Ok(stats)
            })
            .await
    }
}

fn push_scope(qb: &mut QueryBuilder<'_, Sqlite>, filter: StatisticsFilter) {
    if let Some(employee_id) = filter.employee_id {
        qb.push(" AND employee_id = ").push_bind(employee_id);
    }
    if let Some(provider_id) = filter.provider_id {
        qb.push(" AND assigned_provider_id = ").push_bind(provider_id);
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
