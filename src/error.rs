//! Error types for the helpdesk engine
//!
//! Domain errors are recoverable and carry a message that can be shown to the
//! caller verbatim. Infrastructure errors (storage, timeouts, migrations) are
//! logged server-side and rendered to callers as a generic failure.

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, HelpdeskError>;

/// Main error type for helpdesk operations
#[derive(Error, Debug)]
pub enum HelpdeskError {
    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Status value outside the accepted transition targets
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Rating score outside 1..=5 or not an integer
    #[error("Invalid rating value: {0}")]
    InvalidRating(String),

    /// Attachment batch exceeds the configured file count
    #[error("Maximum {max} files allowed, got {actual}")]
    TooManyFiles { max: usize, actual: usize },

    /// One or more attachments violate the upload policy
    #[error("Invalid attachment: {}", .0.join(", "))]
    InvalidFile(Vec<String>),

    /// Ticket already carries a rating
    #[error("Ticket {ticket_id} has already been rated")]
    DuplicateRating { ticket_id: i64 },

    /// Row changed between read and write inside a lifecycle operation
    #[error("Ticket {ticket_id} was modified concurrently")]
    ConcurrentModification { ticket_id: i64 },

    /// Database call exceeded the configured timeout
    #[error("Operation '{operation}' timed out")]
    Timeout { operation: String },

    /// Database errors
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Schema migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// File system errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Email template rendering errors
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

impl HelpdeskError {
    /// Create a custom error with a message
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error for the named entity
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Check if this is an infrastructure failure rather than a domain rule
    #[must_use]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Storage(_)
                | Self::Migration(_)
                | Self::Io(_)
                | Self::Template(_)
                | Self::Serialization(_)
        )
    }

    /// Check if the caller can correct the input and retry
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound { .. }
                | Self::InvalidStatus(_)
                | Self::InvalidRating(_)
                | Self::TooManyFiles { .. }
                | Self::InvalidFile(_)
                | Self::ConcurrentModification { .. }
                | Self::Timeout { .. }
        )
    }

    /// Check if this is a configuration error
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Message safe to show to the caller
    ///
    /// Infrastructure details never leave the server; they are logged where
    /// they occur.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout { .. } => {
                "The request took too long to complete. Please try again.".to_string()
            },
            Self::Storage(_) | Self::Migration(_) | Self::Io(_) => {
                "An internal error occurred. Please contact the administrator.".to_string()
            },
            Self::Template(_) | Self::Serialization(_) => {
                "Failed to render the response. Please contact the administrator.".to_string()
            },
            other => other.to_string(),
        }
    }

    /// Get suggested actions for this error
    #[must_use]
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Validation(_) => vec![
                "Provide a device type, a device name and an issue description".to_string(),
            ],
            Self::NotFound { entity, .. } => vec![
                format!("Check the {} id", entity.to_lowercase()),
                "Run 'helpdesk list' to see existing tickets".to_string(),
            ],
            Self::InvalidStatus(_) => vec![
                "Valid statuses: assigned, in_progress, resolved, closed".to_string(),
            ],
            Self::InvalidRating(_) => vec!["Use a whole number between 1 and 5".to_string()],
            Self::TooManyFiles { max, .. } => {
                vec![format!("Attach at most {max} files per ticket")]
            },
            Self::InvalidFile(_) => vec![
                "Allowed file types: jpg, jpeg, png, pdf, doc, docx".to_string(),
                "Files must be 10MB or smaller".to_string(),
            ],
            Self::ConcurrentModification { .. } => {
                vec!["Reload the ticket and retry the operation".to_string()]
            },
            Self::Config(_) => vec![
                "Check helpdesk.yaml or HELPDESK__* environment variables".to_string(),
            ],
            Self::Migration(_) => vec!["Run 'helpdesk init' to create the schema".to_string()],
            _ => vec![],
        }
    }
}

impl From<config::ConfigError> for HelpdeskError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
