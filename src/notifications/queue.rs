use super::{EmailNotifier, NewNotification, NotificationDispatcher};
use crate::core::{ProviderId, Status, TicketDetails, TicketId, UserId};
use crate::error::{HelpdeskError, Result};
use crate::storage::{Directory, Provider, TicketStore};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Work submitted after a lifecycle operation commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationJob {
    /// Alert admins; confirm to the employee by email
    TicketCreated { ticket_id: TicketId },
    /// Alert the provider this assignment was made to, and the employee
    TicketAssigned {
        ticket_id: TicketId,
        provider_id: ProviderId,
    },
    /// Alert the employee
    StatusChanged {
        ticket_id: TicketId,
        old_status: Status,
        new_status: Status,
        comment: Option<String>,
    },
    /// Alert the other party of the conversation
    CommentAdded {
        ticket_id: TicketId,
        author_user_id: UserId,
        comment: String,
    },
}

impl NotificationJob {
    #[must_use]
    pub const fn ticket_id(&self) -> TicketId {
        match self {
            Self::TicketCreated { ticket_id }
            | Self::TicketAssigned { ticket_id, .. }
            | Self::StatusChanged { ticket_id, .. }
            | Self::CommentAdded { ticket_id, .. } => *ticket_id,
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::TicketCreated { .. } => "ticket_created",
            Self::TicketAssigned { .. } => "ticket_assigned",
            Self::StatusChanged { .. } => "status_changed",
            Self::CommentAdded { .. } => "comment_added",
        }
    }
}

/// Handle for submitting notification jobs to the background worker
///
/// Submitting never blocks and never fails the caller. Jobs are processed in
/// submission order.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::UnboundedSender<NotificationJob>,
    pending: Arc<watch::Sender<usize>>,
}

impl NotificationQueue {
    /// Start `worker` on the current runtime and return its queue
    pub fn spawn(worker: NotificationWorker) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = Arc::new(watch::channel(0usize).0);
        let handle = tokio::spawn(worker.run(receiver, Arc::clone(&pending)));
        (Self { sender, pending }, handle)
    }

    pub fn enqueue(&self, job: NotificationJob) {
        self.pending.send_modify(|n| *n += 1);
        if let Err(mpsc::error::SendError(job)) = self.sender.send(job) {
            self.pending.send_modify(|n| *n = n.saturating_sub(1));
            tracing::warn!(
                ticket_id = %job.ticket_id(),
                job = job.name(),
                "Notification worker stopped; job dropped"
            );
        }
    }

    /// Number of submitted jobs not yet finished
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Wait until every submitted job has been processed
    pub async fn wait_idle(&self) {
        let mut rx = self.pending.subscribe();
        // the sender lives in `self`, so this only ends once idle
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Turns jobs into notification rows and emails
#[derive(Debug)]
pub struct NotificationWorker {
    dispatcher: NotificationDispatcher,
    store: TicketStore,
    directory: Directory,
    mailer: Option<EmailNotifier>,
}

impl NotificationWorker {
    #[must_use]
    pub const fn new(dispatcher: NotificationDispatcher, store: TicketStore, directory: Directory) -> Self {
        Self {
            dispatcher,
            store,
            directory,
            mailer: None,
        }
    }

    /// Also send emails through `mailer`
    #[must_use]
    pub fn with_mailer(mut self, mailer: EmailNotifier) -> Self {
        self.mailer = Some(mailer);
        self
    }

    async fn run(self, mut receiver: mpsc::UnboundedReceiver<NotificationJob>, pending: Arc<watch::Sender<usize>>) {
        while let Some(job) = receiver.recv().await {
            if let Err(e) = self.handle(&job).await {
                tracing::warn!(
                    ticket_id = %job.ticket_id(),
                    job = job.name(),
                    error = %e,
                    "Notification dispatch failed"
                );
            }
            pending.send_modify(|n| *n = n.saturating_sub(1));
        }
        tracing::debug!("Notification worker stopped");
    }

    /// Process one job; failures are for the caller to log
    pub async fn handle(&self, job: &NotificationJob) -> Result<()> {
        let ticket_id = job.ticket_id();
        let details = self
            .store
            .get_by_id(ticket_id)
            .await?
            .ok_or_else(|| HelpdeskError::not_found("Ticket", ticket_id))?;
        let number = details.ticket().ticket_number.clone();

        match job {
            NotificationJob::TicketCreated { .. } => {
                let admins = self.directory.active_admin_ids().await?;
                self.dispatcher
                    .notify_many(&admins, &NewNotification::new_ticket(ticket_id, &number))
                    .await?;
                if let Some(mailer) = &self.mailer {
                    log_email(job, mailer.ticket_created(&details).await);
                }
            },
            NotificationJob::TicketAssigned { provider_id, .. } => {
                // the ticket may have been reassigned since this job was queued
                let provider = self
                    .directory
                    .provider(*provider_id)
                    .await?
                    .ok_or_else(|| HelpdeskError::not_found("Provider", provider_id))?;
                let details = assigned_to(details, &provider);
                self.dispatcher
                    .notify(provider.user_id, &NewNotification::ticket_assigned(ticket_id, &number))
                    .await?;
                self.dispatcher
                    .notify(
                        details.employee_user_id,
                        &NewNotification::status_changed(ticket_id, &number, Status::Assigned),
                    )
                    .await?;
                if let Some(mailer) = &self.mailer {
                    log_email(job, mailer.ticket_assigned(&details).await);
                    log_email(job, mailer.provider_new_ticket(&details).await);
                }
            },
            NotificationJob::StatusChanged {
                old_status,
                new_status,
                comment,
                ..
            } => {
                self.dispatcher
                    .notify(
                        details.employee_user_id,
                        &NewNotification::status_changed(ticket_id, &number, *new_status),
                    )
                    .await?;
                if let Some(mailer) = &self.mailer {
                    let sent = mailer
                        .status_changed(&details, *old_status, *new_status, comment.as_deref())
                        .await;
                    log_email(job, sent);
                }
            },
            NotificationJob::CommentAdded {
                author_user_id,
                comment,
                ..
            } => {
                let Some(recipient) = comment_recipient(&details, *author_user_id) else {
                    return Ok(());
                };
                self.dispatcher
                    .notify(recipient.user_id, &NewNotification::new_comment(ticket_id, &number))
                    .await?;
                if let (Some(mailer), Some(to)) = (&self.mailer, recipient.email) {
                    let author = if *author_user_id == details.employee_user_id {
                        details.summary.employee_name()
                    } else {
                        details.summary.provider_name.clone().unwrap_or_else(|| "Support".to_string())
                    };
                    let sent = mailer
                        .new_comment(to, &recipient.name, &details, &author, comment)
                        .await;
                    log_email(job, sent);
                }
            },
        }

        tracing::debug!(ticket_id = %ticket_id, job = job.name(), "Notifications dispatched");
        Ok(())
    }

}

/// Email failures never fail the job
fn log_email(job: &NotificationJob, sent: Result<()>) {
    if let Err(e) = sent {
        tracing::warn!(
            ticket_id = %job.ticket_id(),
            job = job.name(),
            error = %e,
            "Email delivery failed"
        );
    }
}

/// Ticket view as of the assignment to `provider`
fn assigned_to(mut details: TicketDetails, provider: &Provider) -> TicketDetails {
    details.summary.ticket.assigned_provider_id = Some(provider.id);
    details.summary.provider_name = Some(provider.provider_name.clone());
    details.provider_user_id = Some(provider.user_id);
    details.provider_email = Some(provider.email.clone());
    details
}

struct CommentRecipient<'a> {
    user_id: UserId,
    email: Option<&'a str>,
    name: String,
}

/// The employee hears about provider comments and vice versa. Comments by
/// anyone else go to the employee.
fn comment_recipient(details: &TicketDetails, author: UserId) -> Option<CommentRecipient<'_>> {
    if author == details.employee_user_id {
        let provider_user_id = details.provider_user_id?;
        Some(CommentRecipient {
            user_id: provider_user_id,
            email: details.provider_email.as_deref(),
            name: details
                .summary
                .provider_name
                .clone()
                .unwrap_or_else(|| "Service Provider".to_string()),
        })
    } else {
        Some(CommentRecipient {
            user_id: details.employee_user_id,
            email: Some(details.employee_email.as_str()),
            name: details.summary.employee_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Priority;
    use crate::notifications::{MockMailTransport, NotificationKind};
    use crate::test_utils::TestDesk;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_created_job_alerts_every_admin() {
        let desk = TestDesk::new().await;
        let ticket_id = desk.insert_raw_ticket("Projector", Priority::Medium).await;

        desk.queue.enqueue(NotificationJob::TicketCreated { ticket_id });
        desk.queue.wait_idle().await;
        assert_eq!(desk.queue.pending(), 0);

        for admin in [desk.admin_user_id, desk.second_admin_user_id] {
            let unread = desk.dispatcher.get_unread(admin).await.unwrap();
            assert_eq!(unread.len(), 1);
            assert_eq!(unread[0].kind, NotificationKind::NewTicket);
            assert_eq!(unread[0].ticket_id, Some(ticket_id));
        }
    }

    #[tokio::test]
    async fn test_failed_job_does_not_stop_worker() {
        let desk = TestDesk::new().await;
        let ticket_id = desk.insert_raw_ticket("Webcam", Priority::Low).await;

        desk.queue.enqueue(NotificationJob::TicketAssigned {
            ticket_id: TicketId(12345),
            provider_id: desk.provider_id,
        });
        desk.queue.enqueue(NotificationJob::StatusChanged {
            ticket_id,
            old_status: Status::Assigned,
            new_status: Status::InProgress,
            comment: None,
        });
        desk.queue.wait_idle().await;

        let unread = desk.dispatcher.get_unread(desk.employee_user_id).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert!(unread[0].message.ends_with("Work has started on your ticket"));
    }

    #[tokio::test]
    async fn test_mail_failure_is_swallowed() {
        let desk = TestDesk::new().await;
        let ticket_id = desk.insert_raw_ticket("Dock", Priority::Low).await;

        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let mut transport = MockMailTransport::new();
        transport.expect_send().returning(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(HelpdeskError::custom("smtp down"))
        });
        let mailer = EmailNotifier::new(Arc::new(transport), "IT Support").unwrap();
        let worker = desk.worker().with_mailer(mailer);

        worker
            .handle(&NotificationJob::TicketCreated { ticket_id })
            .await
            .unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(desk.dispatcher.unread_count(desk.admin_user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_employee_comment_without_provider_is_dropped() {
        let desk = TestDesk::new().await;
        let ticket_id = desk.insert_raw_ticket("Cable", Priority::Low).await;

        desk.worker()
            .handle(&NotificationJob::CommentAdded {
                ticket_id,
                author_user_id: desk.employee_user_id,
                comment: "any news?".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(desk.dispatcher.unread_count(desk.provider_user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_assignment_job_targets_committed_provider() {
        let desk = TestDesk::new().await;
        let ticket_id = desk.insert_raw_ticket("Docking station", Priority::Medium).await;
        let (lee_user_id, lee) = desk
            .directory
            .add_provider(&crate::storage::NewProvider {
                email: "lee@example.com".to_string(),
                provider_name: "Lee Support".to_string(),
                specialization: None,
                max_concurrent_tickets: 5,
            })
            .await
            .unwrap();

        // reassigned to Lee before the job for Sam is processed
        desk.lifecycle.assign(ticket_id, lee, desk.admin_user_id).await.unwrap();
        desk.queue.wait_idle().await;
        desk.dispatcher.mark_all_read(lee_user_id).await.unwrap();

        let recipients = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sent = Arc::clone(&recipients);
        let mut transport = MockMailTransport::new();
        transport.expect_send().returning(move |to, _, _| {
            sent.lock().unwrap().push(to.to_string());
            Ok(())
        });
        let mailer = EmailNotifier::new(Arc::new(transport), "IT Support").unwrap();

        desk.worker()
            .with_mailer(mailer)
            .handle(&NotificationJob::TicketAssigned {
                ticket_id,
                provider_id: desk.provider_id,
            })
            .await
            .unwrap();

        let sam = desk.dispatcher.get_unread(desk.provider_user_id).await.unwrap();
        assert_eq!(sam.len(), 1);
        assert_eq!(sam[0].kind, NotificationKind::TicketAssigned);
        assert_eq!(desk.dispatcher.unread_count(lee_user_id).await.unwrap(), 0);

        let recipients = recipients.lock().unwrap();
        assert!(recipients.contains(&"sam@example.com".to_string()));
        assert!(!recipients.contains(&"lee@example.com".to_string()));
    }
}
