use super::{NewNotification, Notification};
use crate::core::{NotificationId, TicketId, UserId};
use crate::error::{HelpdeskError, Result};
use crate::storage::Database;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};

const NOTIFICATION_SELECT: &str = "SELECT n.id, n.user_id, n.ticket_id, t.ticket_number, \
     n.notification_type, n.title, n.message, n.is_read, n.created_at, n.read_at \
     FROM notifications n \
     LEFT JOIN tickets t ON n.ticket_id = t.id";

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: NotificationId,
    user_id: UserId,
    ticket_id: Option<TicketId>,
    ticket_number: Option<String>,
    notification_type: String,
    title: String,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = HelpdeskError;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            ticket_id: row.ticket_id,
            ticket_number: row.ticket_number,
            kind: row.notification_type.parse()?,
            title: row.title,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
            read_at: row.read_at,
        })
    }
}

/// Writes and manages per-user notifications
///
/// Every read and write is scoped to the recipient: operations on another
/// user's notification behave as if it did not exist.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    db: Database,
}

impl NotificationDispatcher {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create one notification
    pub async fn notify(&self, user_id: UserId, notification: &NewNotification) -> Result<NotificationId> {
        self.db
            .timed("notify", async {
                let result = sqlx::query(
                    "INSERT INTO notifications \
                     (user_id, ticket_id, notification_type, title, message, is_read, created_at) \
                     VALUES (?, ?, ?, ?, ?, 0, ?)",
                )
                .bind(user_id)
                .bind(notification.ticket_id)
                .bind(notification.kind.as_str())
                .bind(&notification.title)
                .bind(&notification.message)
                .bind(Utc::now())
                .execute(self.db.pool())
                .await?;
                Ok(NotificationId(result.last_insert_rowid()))
            })
            .await
    }

    /// Fan the same notification out to many users in one insert
    ///
    /// Returns the number of rows written; an empty recipient list writes
    /// nothing.
    pub async fn notify_many(&self, user_ids: &[UserId], notification: &NewNotification) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut qb = QueryBuilder::<Sqlite>::new(
            "INSERT INTO notifications \
             (user_id, ticket_id, notification_type, title, message, is_read, created_at) ",
        );
        qb.push_values(user_ids, |mut row, user_id| {
            row.push_bind(*user_id)
                .push_bind(notification.ticket_id)
                .push_bind(notification.kind.as_str())
                .push_bind(notification.title.clone())
                .push_bind(notification.message.clone())
                .push_bind(false)
                .push_bind(now);
        });

        self.db
            .timed("notify_many", async {
                let result = qb.build().execute(self.db.pool()).await?;
                tracing::debug!(
                    recipients = user_ids.len(),
                    kind = %notification.kind,
                    "Notifications fanned out"
                );
                Ok(result.rows_affected())
            })
            .await
    }

    /// Unread notifications, newest first
    pub async fn get_unread(&self, user_id: UserId) -> Result<Vec<Notification>> {
        self.list(user_id, true, None).await
    }

    /// Notifications for a user, newest first
    pub async fn list(&self, user_id: UserId, unread_only: bool, limit: Option<i64>) -> Result<Vec<Notification>> {
        let mut qb = QueryBuilder::<Sqlite>::new(NOTIFICATION_SELECT);
        qb.push(" WHERE n.user_id = ").push_bind(user_id);
        if unread_only {
            qb.push(" AND n.is_read = 0");
        }
        qb.push(" ORDER BY n.created_at DESC, n.id DESC");
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit.max(1));
        }

        self.db
            .timed("list_notifications", async {
                let rows: Vec<NotificationRow> = qb.build_query_as().fetch_all(self.db.pool()).await?;
                rows.into_iter().map(Notification::try_from).collect()
            })
            .await
    }

    pub async fn unread_count(&self, user_id: UserId) -> Result<i64> {
        self.db
            .timed("unread_count", async {
                let (count,): (i64,) = sqlx::query_as(
                    "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
                )
                .bind(user_id)
                .fetch_one(self.db.pool())
                .await?;
                Ok(count)
            })
            .await
    }

    /// Mark one notification read
    ///
    /// Returns false when it is already read, missing, or owned by someone
    /// else.
    pub async fn mark_read(&self, id: NotificationId, user_id: UserId) -> Result<bool> {
        self.db
            .timed("mark_read", async {
                let result = sqlx::query(
                    "UPDATE notifications SET is_read = 1, read_at = ? \
                     WHERE id = ? AND user_id = ? AND is_read = 0",
                )
                .bind(Utc::now())
                .bind(id)
                .bind(user_id)
                .execute(self.db.pool())
                .await?;
                Ok(result.rows_affected() > 0)
            })
            .await
    }

    /// Mark every unread notification read; safe to repeat
    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64> {
        self.db
            .timed("mark_all_read", async {
                let result = sqlx::query(
                    "UPDATE notifications SET is_read = 1, read_at = ? \
                     WHERE user_id = ? AND is_read = 0",
                )
                .bind(Utc::now())
                .bind(user_id)
                .execute(self.db.pool())
                .await?;
                Ok(result.rows_affected())
            })
            .await
    }

    /// Delete a notification owned by `user_id`
    pub async fn delete(&self, id: NotificationId, user_id: UserId) -> Result<bool> {
        self.db
            .timed("delete_notification", async {
                let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
                    .bind(id)
                    .bind(user_id)
                    .execute(self.db.pool())
                    .await?;
                Ok(result.rows_affected() > 0)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Priority;
    use crate::notifications::NotificationKind;
    use crate::test_utils::TestDesk;

    fn ping() -> NewNotification {
        NewNotification::new(NotificationKind::NewComment, "New Comment", "ping")
    }

    #[tokio::test]
    async fn test_notify_many_writes_one_row_per_recipient() {
        let desk = TestDesk::new().await;
        let recipients = [desk.admin_user_id, desk.second_admin_user_id];

        let written = desk.dispatcher.notify_many(&recipients, &ping()).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(desk.dispatcher.unread_count(desk.admin_user_id).await.unwrap(), 1);
        assert_eq!(desk.dispatcher.unread_count(desk.second_admin_user_id).await.unwrap(), 1);

        assert_eq!(desk.dispatcher.notify_many(&[], &ping()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_is_scoped_to_owner() {
        let desk = TestDesk::new().await;
        let id = desk.dispatcher.notify(desk.admin_user_id, &ping()).await.unwrap();

        assert!(!desk.dispatcher.mark_read(id, desk.employee_user_id).await.unwrap());
        assert!(desk.dispatcher.mark_read(id, desk.admin_user_id).await.unwrap());
        // already read
        assert!(!desk.dispatcher.mark_read(id, desk.admin_user_id).await.unwrap());
        assert!(!desk.dispatcher.mark_read(NotificationId(999), desk.admin_user_id).await.unwrap());

        let all = desk.dispatcher.list(desk.admin_user_id, false, None).await.unwrap();
        assert!(all[0].is_read);
        assert!(all[0].read_at.is_some());
    }

    #[tokio::test]
    async fn test_mark_all_read_is_idempotent() {
        let desk = TestDesk::new().await;
        desk.dispatcher.notify(desk.employee_user_id, &ping()).await.unwrap();
        desk.dispatcher.notify(desk.employee_user_id, &ping()).await.unwrap();

        assert_eq!(desk.dispatcher.mark_all_read(desk.employee_user_id).await.unwrap(), 2);
        assert_eq!(desk.dispatcher.unread_count(desk.employee_user_id).await.unwrap(), 0);
        assert_eq!(desk.dispatcher.mark_all_read(desk.employee_user_id).await.unwrap(), 0);
        assert_eq!(desk.dispatcher.unread_count(desk.employee_user_id).await.unwrap(), 0);
        assert!(desk.dispatcher.get_unread(desk.employee_user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_carries_ticket_number() {
        let desk = TestDesk::new().await;
        let ticket_id = desk.insert_raw_ticket("Scanner", Priority::Low).await;
        let linked = NewNotification::new_ticket(ticket_id, "TKT-LINKED");
        desk.dispatcher.notify(desk.admin_user_id, &ping()).await.unwrap();
        desk.dispatcher.notify(desk.admin_user_id, &linked).await.unwrap();

        let unread = desk.dispatcher.get_unread(desk.admin_user_id).await.unwrap();
        assert_eq!(unread.len(), 2);
        assert_eq!(unread[0].kind, NotificationKind::NewTicket);
        assert!(unread[0].ticket_number.as_deref().unwrap().starts_with("TKT-"));
        assert!(unread[1].ticket_number.is_none());

        let limited = desk.dispatcher.list(desk.admin_user_id, false, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_requires_ownership() {
        let desk = TestDesk::new().await;
        let id = desk.dispatcher.notify(desk.admin_user_id, &ping()).await.unwrap();

        assert!(!desk.dispatcher.delete(id, desk.provider_user_id).await.unwrap());
        assert!(desk.dispatcher.delete(id, desk.admin_user_id).await.unwrap());
        assert!(desk.dispatcher.list(desk.admin_user_id, false, None).await.unwrap().is_empty());
    }
}
