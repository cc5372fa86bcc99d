//! SQLite persistence for tickets, history and reference data

mod audit;
mod db;
mod directory;
pub(crate) mod rows;
mod store;

pub use audit::{AuditEntry, AuditTrail};
pub use db::Database;
pub use directory::{DeviceType, Directory, EmployeeRecord, NewEmployee, NewProvider, Provider};
pub use store::{MAX_PAGE_SIZE, NewAttachment, NewTicket, TicketStore};
