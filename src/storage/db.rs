use crate::config::DatabaseConfig;
use crate::error::{HelpdeskError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Shared database handle
///
/// Cheap to clone; every component receives its own copy instead of opening
/// a connection of its own.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    timeout: Duration,
}

impl Database {
    /// Connect using the configured URL, creating the file if needed
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(config.timeout());

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(config.timeout())
            .connect_with(options)
            .await?;

        tracing::debug!(url = %config.url, "Connected to database");
        Ok(Self {
            pool,
            timeout: config.timeout(),
        })
    }

    /// Private in-memory database, already migrated
    ///
    /// Held on a single connection that never expires, since every new
    /// in-memory connection would see an empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            timeout: Duration::from_secs(10),
        };
        db.migrate().await?;
        Ok(db)
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        Ok(())
    }

    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Start a transaction; dropping it without commit rolls back
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Run a database operation under the configured timeout
    ///
    /// On expiry the future is dropped, which rolls back any transaction it
    /// owned, and `Timeout` is returned.
    pub async fn timed<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(operation, timeout = ?self.timeout, "Database operation timed out");
                Err(HelpdeskError::Timeout {
                    operation: operation.to_string(),
                })
            },
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
