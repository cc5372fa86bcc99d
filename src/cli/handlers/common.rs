use crate::attachments::{AttachmentValidator, FileStore, LocalFileStore};
use crate::config::Config;
use crate::error::Result;
use crate::lifecycle::TicketLifecycle;
use crate::notifications::{EmailNotifier, NotificationDispatcher, NotificationQueue, NotificationWorker};
use crate::storage::{Database, Directory, TicketStore};
use std::sync::Arc;

/// Wired engine shared by all command handlers
pub struct HandlerContext {
    pub config: Config,
    pub db: Database,
    pub directory: Directory,
    pub dispatcher: NotificationDispatcher,
    pub lifecycle: TicketLifecycle,
    queue: NotificationQueue,
}

impl HandlerContext {
    /// Open the configured database, apply migrations and start the
    /// notification worker
    pub async fn open(config: Config) -> Result<Self> {
        let db = Database::connect(&config.database).await?;
        db.migrate().await?;

        let store = TicketStore::new(db.clone());
        let directory = Directory::new(db.clone());
        let dispatcher = NotificationDispatcher::new(db.clone());

        let mut worker = NotificationWorker::new(dispatcher.clone(), store, directory.clone());
        if config.notifications.email_enabled {
            worker = worker.with_mailer(EmailNotifier::from_config(&config.notifications)?);
        }
        let (queue, _handle) = NotificationQueue::spawn(worker);

        let files: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(config.uploads.dir.clone()));
        let lifecycle = TicketLifecycle::new(
            db.clone(),
            AttachmentValidator::new(config.attachments.clone()),
            files,
            queue.clone(),
        )
        .notify_on_comment(config.notifications.notify_on_comment);

        Ok(Self {
            config,
            db,
            directory,
            dispatcher,
            lifecycle,
            queue,
        })
    }

    /// Drain pending notifications and close the database
    pub async fn finish(self) {
        self.queue.wait_idle().await;
        self.db.close().await;
    }
}
