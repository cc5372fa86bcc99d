//! Ticket lifecycle operations
//!
//! Every mutating operation runs as one transaction under the database
//! timeout: it validates, writes the ticket, appends to the audit trail and
//! commits. Notification jobs are submitted only after the commit succeeds,
//! so a rolled back operation never notifies anyone.
//!
//! ```text
//! pending → assigned → in_progress → resolved → closed
//! ```

use crate::attachments::{AttachmentUpload, AttachmentValidator, FileStore};
use crate::core::{
    CreatedTicket, DeviceTypeId, EmployeeId, Priority, ProviderId, StatisticsFilter, Status,
    Ticket, TicketDetails, TicketFilter, TicketId, TicketInput, TicketStatistics, TicketSummary,
    TicketUpdateId, UpdateType, UserId, generate_ticket_number,
};
use crate::error::{HelpdeskError, Result};
use crate::notifications::{NotificationJob, NotificationQueue};
use crate::rating::{NewRating, ProviderRating, RatingAggregator, validate_score};
use crate::storage::{AuditEntry, AuditTrail, Database, Directory, NewAttachment, NewTicket, TicketStore};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::sync::Arc;

/// Attempts at finding an unused ticket number before giving up
const MAX_NUMBER_ATTEMPTS: usize = 5;

/// Paging for ticket listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Page {
    #[must_use]
    pub const fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }
}

/// Entry point for ticket mutations and queries
#[derive(Clone)]
pub struct TicketLifecycle {
    db: Database,
    store: TicketStore,
    audit: AuditTrail,
    ratings: RatingAggregator,
    validator: AttachmentValidator,
    files: Arc<dyn FileStore>,
    queue: NotificationQueue,
    notify_on_comment: bool,
}

impl std::fmt::Debug for TicketLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketLifecycle")
            .field("validator", &self.validator)
            .field("files", &"Arc<dyn FileStore>")
            .field("notify_on_comment", &self.notify_on_comment)
            .finish_non_exhaustive()
    }
}

impl TicketLifecycle {
    pub fn new(
        db: Database,
        validator: AttachmentValidator,
        files: Arc<dyn FileStore>,
        queue: NotificationQueue,
    ) -> Self {
        Self {
            store: TicketStore::new(db.clone()),
            audit: AuditTrail::new(db.clone()),
            ratings: RatingAggregator::new(db.clone()),
            db,
            validator,
            files,
            queue,
            notify_on_comment: false,
        }
    }

    /// Notify the other party when a comment is added
    #[must_use]
    pub const fn notify_on_comment(mut self, enabled: bool) -> Self {
        self.notify_on_comment = enabled;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &TicketStore {
        &self.store
    }

    #[must_use]
    pub const fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    #[must_use]
    pub const fn ratings(&self) -> &RatingAggregator {
        &self.ratings
    }

    #[must_use]
    pub const fn queue(&self) -> &NotificationQueue {
        &self.queue
    }

    /// Open a ticket for an employee
    ///
    /// Fields and attachments are validated before anything is written. The
    /// department is copied from the employee record as it is now.
    pub async fn create(
        &self,
        employee_id: EmployeeId,
        input: TicketInput,
        uploads: &[AttachmentUpload],
    ) -> Result<CreatedTicket> {
        let (device_type_id, device_name, issue_description) = required_fields(&input)?;
        let priority = Priority::parse_or_default(input.priority.as_deref());
        let accepted = self.validator.validate(uploads)?;

        let result = self
            .db
            .timed("create_ticket", async {
                let mut tx = self.db.begin().await?;

                let employee = Directory::employee(&mut tx, employee_id)
                    .await?
                    .ok_or_else(|| HelpdeskError::not_found("Employee", employee_id))?;
                if !Directory::device_type_exists(&mut tx, device_type_id).await? {
                    return Err(HelpdeskError::not_found("Device type", device_type_id));
                }

                let now = Utc::now();
                let ticket_number = self.unique_ticket_number(&mut tx, now).await?;
                let ticket_id = self
                    .store
                    .insert(
                        &mut tx,
                        &NewTicket {
                            ticket_number: ticket_number.clone(),
                            employee_id,
                            department_id: employee.department_id,
                            device_type_id,
                            device_name,
                            issue_description,
                            priority,
                            created_at: now,
                        },
                    )
                    .await?;

                for file in &accepted {
                    let stored_path = self
                        .files
                        .store(&file.upload.file_name, &file.upload.bytes)
                        .await?;
                    self.store
                        .insert_attachment(
                            &mut tx,
                            &NewAttachment {
                                ticket_id,
                                file_name: &file.upload.file_name,
                                stored_path: &stored_path,
                                mime_type: file.mime_type,
                                size_bytes: i64::try_from(file.upload.bytes.len()).unwrap_or(i64::MAX),
                                uploaded_at: now,
                            },
                        )
                        .await?;
                }

                self.audit
                    .append(
                        &mut tx,
                        &AuditEntry::new(ticket_id, employee.user_id, UpdateType::Comment, "Ticket created")
                            .at(now),
                    )
                    .await?;

                tx.commit().await?;
                Ok(CreatedTicket {
                    ticket_id,
                    ticket_number,
                })
            })
            .await;

        let created = observe("create_ticket", result)?;
        tracing::info!(
            ticket_id = %created.ticket_id,
            ticket_number = %created.ticket_number,
            attachments = accepted.len(),
            "Ticket created"
        );
        self.queue.enqueue(NotificationJob::TicketCreated {
            ticket_id: created.ticket_id,
        });
        Ok(created)
    }

    async fn unique_ticket_number(
        &self,
        conn: &mut SqliteConnection,
        now: chrono::DateTime<Utc>,
    ) -> Result<String> {
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let candidate = generate_ticket_number(now.date_naive());
            if !self.store.ticket_number_exists(conn, &candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(ticket_number = %candidate, "Ticket number collision, retrying");
        }
        Err(HelpdeskError::custom("Could not generate a unique ticket number"))
    }

    /// Assign (or reassign) a provider
    ///
    /// Allowed while the ticket is pending, assigned or in progress.
    pub async fn assign(
        &self,
        ticket_id: TicketId,
        provider_id: ProviderId,
        acting_user_id: UserId,
    ) -> Result<Ticket> {
        let result = self
            .db
            .timed("assign_ticket", async {
                let mut tx = self.db.begin().await?;

                let ticket = self.find(&mut tx, ticket_id).await?;
                if !ticket.status.is_assignable() {
                    return Err(HelpdeskError::InvalidStatus(format!(
                        "Ticket {} is {} and can no longer be assigned",
                        ticket.ticket_number, ticket.status
                    )));
                }
                if !Directory::provider_exists(&mut tx, provider_id).await? {
                    return Err(HelpdeskError::not_found("Provider", provider_id));
                }

                let now = Utc::now();
                self.store
                    .assign_provider(&mut tx, ticket_id, provider_id, ticket.version, now)
                    .await?;
                self.audit
                    .append(
                        &mut tx,
                        &AuditEntry::new(
                            ticket_id,
                            acting_user_id,
                            UpdateType::Assignment,
                            "Ticket assigned to service provider",
                        )
                        .values(
                            ticket.assigned_provider_id.map(|id| id.to_string()),
                            Some(provider_id.to_string()),
                        )
                        .at(now),
                    )
                    .await?;

                let updated = self.find(&mut tx, ticket_id).await?;
                tx.commit().await?;
                Ok(updated)
            })
            .await;

        let ticket = observe("assign_ticket", result)?;
        tracing::info!(
            ticket_id = %ticket_id,
            provider_id = %provider_id,
            "Ticket assigned"
        );
        self.queue.enqueue(NotificationJob::TicketAssigned {
            ticket_id,
            provider_id,
        });
        Ok(ticket)
    }

    /// Move a ticket to `assigned`, `in_progress`, `resolved` or `closed`
    ///
    /// The audit message is the comment when one is given, otherwise a
    /// description of the transition.
    pub async fn update_status(
        &self,
        ticket_id: TicketId,
        status: &str,
        acting_user_id: UserId,
        comment: Option<&str>,
    ) -> Result<Ticket> {
        let new_status = Status::parse_update_target(status)?;
        let comment = comment.map(str::trim).filter(|c| !c.is_empty());

        let result = self
            .db
            .timed("update_status", async {
                let mut tx = self.db.begin().await?;

                let ticket = self.find(&mut tx, ticket_id).await?;
                if ticket.assigned_provider_id.is_none() {
                    return Err(HelpdeskError::InvalidStatus(format!(
                        "Ticket {} has no assigned provider; assign it first",
                        ticket.ticket_number
                    )));
                }

                let old_status = ticket.status;
                let now = Utc::now();
                self.store
                    .update_status(&mut tx, ticket_id, new_status, ticket.version, now)
                    .await?;

                let message = comment.map_or_else(
                    || format!("Status changed from {old_status} to {new_status}"),
                    str::to_string,
                );
                self.audit
                    .append(
                        &mut tx,
                        &AuditEntry::new(ticket_id, acting_user_id, UpdateType::StatusChange, message)
                            .values(
                                Some(old_status.as_str().to_string()),
                                Some(new_status.as_str().to_string()),
                            )
                            .at(now),
                    )
                    .await?;

                let updated = self.find(&mut tx, ticket_id).await?;
                tx.commit().await?;
                Ok((old_status, updated))
            })
            .await;

        let (old_status, ticket) = observe("update_status", result)?;
        tracing::info!(
            ticket_id = %ticket_id,
            from = %old_status,
            to = %new_status,
            "Ticket status updated"
        );
        self.queue.enqueue(NotificationJob::StatusChanged {
            ticket_id,
            old_status,
            new_status,
            comment: comment.map(str::to_string),
        });
        Ok(ticket)
    }

    /// Append a comment to the ticket history
    pub async fn add_comment(&self, ticket_id: TicketId, user_id: UserId, comment: &str) -> Result<TicketUpdateId> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(HelpdeskError::validation("Comment cannot be empty"));
        }

        let result = self
            .db
            .timed("add_comment", async {
                let mut tx = self.db.begin().await?;
                self.find(&mut tx, ticket_id).await?;
                let id = self
                    .audit
                    .append(&mut tx, &AuditEntry::new(ticket_id, user_id, UpdateType::Comment, comment))
                    .await?;
                tx.commit().await?;
                Ok(id)
            })
            .await;

        let id = observe("add_comment", result)?;
        tracing::info!(ticket_id = %ticket_id, "Comment added");
        if self.notify_on_comment {
            self.queue.enqueue(NotificationJob::CommentAdded {
                ticket_id,
                author_user_id: user_id,
                comment: comment.to_string(),
            });
        }
        Ok(id)
    }

    /// Record the employee's rating and refresh the provider aggregate
    pub async fn submit_rating(
        &self,
        ticket_id: TicketId,
        employee_id: EmployeeId,
        provider_id: ProviderId,
        score: i64,
        feedback: Option<&str>,
    ) -> Result<ProviderRating> {
        validate_score(score)?;
        let feedback = feedback.map(str::trim).filter(|f| !f.is_empty());

        let result = self
            .db
            .timed("submit_rating", async {
                let mut tx = self.db.begin().await?;

                self.find(&mut tx, ticket_id).await?;
                if !Directory::provider_exists(&mut tx, provider_id).await? {
                    return Err(HelpdeskError::not_found("Provider", provider_id));
                }
                if self.store.rating(&mut tx, ticket_id).await?.is_some() {
                    return Err(HelpdeskError::DuplicateRating {
                        ticket_id: ticket_id.get(),
                    });
                }

                self.ratings
                    .insert(
                        &mut tx,
                        &NewRating {
                            ticket_id,
                            provider_id,
                            employee_id,
                            score,
                            feedback: feedback.map(str::to_string),
                            created_at: Utc::now(),
                        },
                    )
                    .await?;
                let aggregate = self.ratings.recompute(&mut tx, provider_id).await?;

                tx.commit().await?;
                Ok(aggregate)
            })
            .await;

        let aggregate = observe("submit_rating", result)?;
        tracing::info!(
            ticket_id = %ticket_id,
            provider_id = %provider_id,
            score,
            total = aggregate.total,
            "Rating submitted"
        );
        Ok(aggregate)
    }

    /// One page of tickets matching `filter`, newest first
    pub async fn list_tickets(&self, filter: &TicketFilter, page: Page) -> Result<Vec<TicketSummary>> {
        observe("list_tickets", self.store.query(filter, page.limit, page.offset).await)
    }

    /// Full ticket view
    pub async fn get_ticket(&self, ticket_id: TicketId) -> Result<TicketDetails> {
        let result = self
            .store
            .get_by_id(ticket_id)
            .await
            .and_then(|details| details.ok_or_else(|| HelpdeskError::not_found("Ticket", ticket_id)));
        observe("get_ticket", result)
    }

    pub async fn get_statistics(&self, filter: StatisticsFilter) -> Result<TicketStatistics> {
        observe("get_statistics", self.store.statistics(filter).await)
    }

    async fn find(&self, conn: &mut SqliteConnection, ticket_id: TicketId) -> Result<Ticket> {
        self.store
            .find(conn, ticket_id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("Ticket", ticket_id))
    }
}

fn required_fields(input: &TicketInput) -> Result<(DeviceTypeId, String, String)> {
    let device_name = non_empty(input.device_name.as_deref());
    let issue_description = non_empty(input.issue_description.as_deref());

    let mut missing = Vec::new();
    if input.device_type_id.is_none() {
        missing.push("device_type_id");
    }
    if device_name.is_none() {
        missing.push("device_name");
    }
    if issue_description.is_none() {
        missing.push("issue_description");
    }

    match (input.device_type_id, device_name, issue_description) {
        (Some(device_type_id), Some(device_name), Some(issue_description)) => {
            Ok((device_type_id, device_name, issue_description))
        },
        _ => Err(HelpdeskError::validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        ))),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Log failures by class before they reach the caller
fn observe<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if e.is_infrastructure() {
            tracing::error!(operation, error = %e, "Lifecycle operation failed");
        } else {
            tracing::debug!(operation, error = %e, "Lifecycle operation rejected");
        }
    }
    result
}
