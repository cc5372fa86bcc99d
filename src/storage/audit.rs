use super::db::Database;
use super::rows::UpdateRow;
use crate::core::{TicketId, TicketUpdate, TicketUpdateId, UpdateType, UserId};
use crate::error::Result;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

/// A new audit trail entry
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub ticket_id: TicketId,
    pub user_id: UserId,
    pub update_type: UpdateType,
    pub message: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        ticket_id: TicketId,
        user_id: UserId,
        update_type: UpdateType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            ticket_id,
            user_id,
            update_type,
            message: message.into(),
            old_value: None,
            new_value: None,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn values(mut self, old_value: Option<String>, new_value: Option<String>) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    #[must_use]
    pub const fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Append-only history of ticket activity (`ticket_updates`)
///
/// There is no update or delete path. Appends run on the lifecycle
/// transaction's connection, so a failed append aborts the operation.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    db: Database,
}

impl AuditTrail {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn append(&self, conn: &mut SqliteConnection, entry: &AuditEntry) -> Result<TicketUpdateId> {
        let result = sqlx::query(
            "INSERT INTO ticket_updates \
             (ticket_id, user_id, update_type, message, old_value, new_value, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.ticket_id)
        .bind(entry.user_id)
        .bind(entry.update_type.as_str())
        .bind(&entry.message)
        .bind(entry.old_value.as_deref())
        .bind(entry.new_value.as_deref())
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await?;

        tracing::debug!(
            ticket_id = %entry.ticket_id,
            update_type = %entry.update_type,
            "Audit entry appended"
        );
        Ok(TicketUpdateId(result.last_insert_rowid()))
    }

    /// Chronological history of a ticket
    pub async fn history(&self, ticket_id: TicketId) -> Result<Vec<TicketUpdate>> {
        self.db
            .timed("ticket_history", async {
                let mut conn = self.db.pool().acquire().await?;
                Self::load(&mut conn, ticket_id).await
            })
            .await
    }

    pub(crate) async fn load(conn: &mut SqliteConnection, ticket_id: TicketId) -> Result<Vec<TicketUpdate>> {
        let rows: Vec<UpdateRow> = sqlx::query_as(
            "SELECT tu.id, tu.ticket_id, tu.user_id, tu.update_type, tu.message, \
             tu.old_value, tu.new_value, tu.created_at, \
             u.email AS author_email, u.user_type AS author_type \
             FROM ticket_updates tu \
             JOIN users u ON tu.user_id = u.id \
             WHERE tu.ticket_id = ? \
             ORDER BY tu.created_at ASC, tu.id ASC",
        )
        .bind(ticket_id)
        .fetch_all(&mut *conn)
        .await?;

        rows.into_iter().map(TicketUpdate::try_from).collect()
    }
}
