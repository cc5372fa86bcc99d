//! Layered configuration
//!
//! Values are resolved from built-in defaults, then an optional YAML file,
//! then `HELPDESK__*` environment variables (e.g. `HELPDESK__DATABASE__URL`).

use crate::attachments::AttachmentPolicy;
use crate::error::Result;
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "helpdesk.yaml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub attachments: AttachmentPolicy,
    pub uploads: UploadsConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub url: String,
    pub max_connections: u32,
    /// Upper bound for any single database operation
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: 5,
            timeout_secs: 10,
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadsConfig {
    /// Directory attachment bytes are written to
    pub dir: PathBuf,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            dir: data_dir().join("uploads"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Notify the other party when a comment is added
    pub notify_on_comment: bool,
    /// Send templated emails alongside in-app notifications
    pub email_enabled: bool,
    pub from_address: String,
    pub from_name: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            notify_on_comment: false,
            email_enabled: false,
            from_address: "helpdesk@localhost".to_string(),
            from_name: "IT Support".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit file, environment overrides applied
    pub fn load(path: &Path) -> Result<Self> {
        Self::build(Some(path), true)
    }

    /// Load `helpdesk.yaml` from the working directory if present, otherwise
    /// fall back to defaults. Environment overrides always apply.
    pub fn load_or_default() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_FILE);
        Self::build(Some(path), false)
    }

    fn build(path: Option<&Path>, required: bool) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default())?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Yaml)
                    .required(required),
            );
        }

        let settings = builder
            .add_source(
                Environment::with_prefix("HELPDESK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        tracing::debug!(database = %config.database.url, "Configuration loaded");
        Ok(config)
    }
}

fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "helpdesk")
        .map_or_else(|| PathBuf::from(".helpdesk"), |dirs| dirs.data_dir().to_path_buf())
}

fn default_database_url() -> String {
    format!("sqlite://{}?mode=rwc", data_dir().join("helpdesk.db").display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database.timeout(), Duration::from_secs(10));
        assert_eq!(config.attachments.max_files, 5);
        assert_eq!(config.attachments.max_size_bytes, 10_485_760);
        assert!(!config.notifications.email_enabled);
    }

    #[test]
    #[serial]
    fn test_yaml_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "database:\n  url: \"sqlite::memory:\"\n  timeout_secs: 3\nnotifications:\n  notify_on_comment: true"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.timeout_secs, 3);
        assert!(config.notifications.notify_on_comment);
        // untouched sections keep their defaults
        assert_eq!(config.attachments.max_files, 5);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "database:\n  max_connections: 2").unwrap();

        unsafe { std::env::set_var("HELPDESK__DATABASE__MAX_CONNECTIONS", "9") };
        let config = Config::load(file.path());
        unsafe { std::env::remove_var("HELPDESK__DATABASE__MAX_CONNECTIONS") };

        assert_eq!(config.unwrap().database.max_connections, 9);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        let err = Config::load(Path::new("/nonexistent/helpdesk.yaml")).unwrap_err();
        assert!(err.is_config_error());
    }
}
