//! Test fixtures shared across the crate's unit tests
//!
//! [`TestDesk`] wires every component against a private in-memory database
//! seeded with one department, device type, employee and provider, plus two
//! admins.

#![cfg(test)]

use crate::attachments::{AttachmentPolicy, AttachmentUpload, AttachmentValidator, FileStore};
use crate::core::{
    DepartmentId, DeviceTypeId, EmployeeId, Priority, ProviderId, TicketId, TicketInput,
    TicketInputBuilder, UserId,
    generate_ticket_number,
};
use crate::error::Result;
use crate::lifecycle::TicketLifecycle;
use crate::notifications::{NotificationDispatcher, NotificationQueue, NotificationWorker};
use crate::rating::RatingAggregator;
use crate::storage::{AuditTrail, Database, Directory, NewEmployee, NewProvider, NewTicket, TicketStore};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex};

/// File store that keeps uploads in memory
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: Mutex<Vec<(String, usize)>>,
}

impl MemoryFileStore {
    /// Names of the files stored so far
    pub fn stored(&self) -> Vec<String> {
        self.files
            .lock()
            .expect("file store lock poisoned")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        let mut files = self.files.lock().expect("file store lock poisoned");
        files.push((file_name.to_string(), bytes.len()));
        Ok(format!("memory/{}-{file_name}", files.len()))
    }
}

/// Fully wired engine over a seeded in-memory database
pub struct TestDesk {
    pub db: Database,
    pub store: TicketStore,
    pub audit: AuditTrail,
    pub directory: Directory,
    pub ratings: RatingAggregator,
    pub dispatcher: NotificationDispatcher,
    pub queue: NotificationQueue,
    pub lifecycle: TicketLifecycle,
    pub files: Arc<MemoryFileStore>,
    pub department_id: DepartmentId,
    pub device_type_id: DeviceTypeId,
    pub employee_id: EmployeeId,
    pub employee_user_id: UserId,
    pub provider_id: ProviderId,
    pub provider_user_id: UserId,
    pub admin_user_id: UserId,
    pub second_admin_user_id: UserId,
}

impl TestDesk {
    pub async fn new() -> Self {
        let files = Arc::new(MemoryFileStore::default());
        let mut desk = Self::with_file_store(Arc::clone(&files) as Arc<dyn FileStore>).await;
        desk.files = files;
        desk
    }

    /// Build the desk around a custom attachment store
    pub async fn with_file_store(file_store: Arc<dyn FileStore>) -> Self {
        let db = Database::in_memory().await.expect("Failed to open in-memory database");
        let directory = Directory::new(db.clone());

        let department_id = directory
            .add_department("Finance", "Administration")
            .await
            .expect("Failed to add department");
        let device_type_id = directory
            .add_device_type("Laptop")
            .await
            .expect("Failed to add device type");
        let (employee_user_id, employee_id) = directory
            .add_employee(&NewEmployee {
                email: "ana@example.com".to_string(),
                first_name: "Ana".to_string(),
                last_name: "Lopez".to_string(),
                contact_number: Some("555-0100".to_string()),
                department_id,
            })
            .await
            .expect("Failed to add employee");
        let (provider_user_id, provider_id) = directory
            .add_provider(&NewProvider {
                email: "sam@example.com".to_string(),
                provider_name: "Sam Tech".to_string(),
                specialization: Some("Hardware".to_string()),
                max_concurrent_tickets: 5,
            })
            .await
            .expect("Failed to add provider");
        let admin_user_id = directory
            .add_admin("admin@example.com")
            .await
            .expect("Failed to add admin");
        let second_admin_user_id = directory
            .add_admin("ops@example.com")
            .await
            .expect("Failed to add admin");

        let store = TicketStore::new(db.clone());
        let dispatcher = NotificationDispatcher::new(db.clone());
        let (queue, _worker) = NotificationQueue::spawn(NotificationWorker::new(
            dispatcher.clone(),
            store.clone(),
            directory.clone(),
        ));
        let lifecycle = TicketLifecycle::new(
            db.clone(),
            AttachmentValidator::new(AttachmentPolicy::default()),
            file_store,
            queue.clone(),
        );

        Self {
            audit: AuditTrail::new(db.clone()),
            ratings: RatingAggregator::new(db.clone()),
            db,
            store,
            directory,
            dispatcher,
            queue,
            lifecycle,
            files: Arc::new(MemoryFileStore::default()),
            department_id,
            device_type_id,
            employee_id,
            employee_user_id,
            provider_id,
            provider_user_id,
            admin_user_id,
            second_admin_user_id,
        }
    }

    /// A worker over this desk's database, not attached to any queue
    pub fn worker(&self) -> NotificationWorker {
        NotificationWorker::new(self.dispatcher.clone(), self.store.clone(), self.directory.clone())
    }

    /// Complete creation input for the seeded device type
    pub fn ticket_input(&self, description: &str) -> TicketInput {
        TicketInputBuilder::new()
            .device_type(self.device_type_id)
            .device_name("ThinkPad T14")
            .description(description)
            .build()
    }

    /// Insert a pending ticket directly, bypassing the lifecycle
    pub async fn insert_raw_ticket(&self, description: &str, priority: Priority) -> TicketId {
        let mut conn = self.db.pool().acquire().await.expect("Failed to acquire connection");
        let now = Utc::now();
        self.store
            .insert(
                &mut conn,
                &NewTicket {
                    ticket_number: generate_ticket_number(now.date_naive()),
                    employee_id: self.employee_id,
                    department_id: self.department_id,
                    device_type_id: self.device_type_id,
                    device_name: "ThinkPad T14".to_string(),
                    issue_description: description.to_string(),
                    priority,
                    created_at: now,
                },
            )
            .await
            .expect("Failed to insert ticket")
    }
}

pub fn png_upload(name: &str) -> AttachmentUpload {
    AttachmentUpload::new(name, "image/png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec())
}

pub fn pdf_upload(name: &str) -> AttachmentUpload {
    AttachmentUpload::new(name, "application/pdf", b"%PDF-1.4\n%test".to_vec())
}

pub fn exe_upload(name: &str) -> AttachmentUpload {
    AttachmentUpload::new(name, "application/x-msdownload", b"MZ\x90\0\x03\0".to_vec())
}
