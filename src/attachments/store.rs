use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Storage for attachment bytes
///
/// The engine persists only the returned path. A write that succeeds before
/// the surrounding transaction rolls back leaves an orphaned file behind.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist the bytes and return a stable stored path
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String>;
}

/// Writes attachments to a local directory under generated names
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Relative prefix recorded in `stored_path`
    pub const PUBLIC_PREFIX: &'static str = "uploads/tickets";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.root.join("tickets");
        tokio::fs::create_dir_all(&dir).await?;

        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let stored_name = format!("{}.{extension}", uuid::Uuid::new_v4().simple());

        tokio::fs::write(dir.join(&stored_name), bytes).await?;
        tracing::debug!(file_name, stored_name = %stored_name, "Attachment written");

        Ok(format!("{}/{stored_name}", Self::PUBLIC_PREFIX))
    }
}
