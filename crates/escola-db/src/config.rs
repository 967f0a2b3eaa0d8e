//! # School Configuration
//!
//! Settings for the database layer and the enrollment defaults.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ESCOLA_DB_PATH=/var/lib/escola/escola.db                           │
//! │     ESCOLA_LOCK_TIMEOUT_MS=2000                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/escola/escola.toml (Linux)                               │
//! │     ~/Library/Application Support/br.escola.escola/escola.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "escola.db"
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30
//! lock_timeout_ms = 5000
//!
//! [enrollment]
//! default_student_status = "active"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use escola_core::StudentStatus;

// =============================================================================
// Config Error
// =============================================================================

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path, created if missing.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// How long an enrollment waits for its class lock before giving up.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("escola.db")
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_lock_timeout() -> u64 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            lock_timeout_ms: default_lock_timeout(),
        }
    }
}

// =============================================================================
// Enrollment Settings
// =============================================================================

/// `[enrollment]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentSettings {
    /// Status given to students created directly without an explicit one.
    #[serde(default)]
    pub default_student_status: StudentStatus,
}

// =============================================================================
// School Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoolConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub enrollment: EnrollmentSettings,
}

impl SchoolConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (escola.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading school config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file without applying environment overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let db = &self.database;

        if db.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if db.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if db.min_connections > db.max_connections {
            return Err(ConfigError::Invalid(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                db.min_connections, db.max_connections
            )));
        }
        if db.lock_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "database.lock_timeout_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("ESCOLA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("ESCOLA_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid ESCOLA_MAX_CONNECTIONS"),
            }
        }

        if let Ok(timeout) = std::env::var("ESCOLA_LOCK_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) => self.database.lock_timeout_ms = ms,
                Err(_) => warn!(value = %timeout, "Ignoring invalid ESCOLA_LOCK_TIMEOUT_MS"),
            }
        }

        if let Ok(status) = std::env::var("ESCOLA_DEFAULT_STUDENT_STATUS") {
            match StudentStatus::parse(&status) {
                Some(parsed) => self.enrollment.default_student_status = parsed,
                None => warn!(value = %status, "Unknown student status in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("br", "escola", "escola")
            .map(|dirs| dirs.config_dir().join("escola.toml"))
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.database.lock_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchoolConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.lock_timeout_ms, 5000);
        assert_eq!(
            config.enrollment.default_student_status,
            StudentStatus::Active
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SchoolConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/escola-test.db"

            [enrollment]
            default_student_status = "inactive"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/escola-test.db"));
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(
            config.enrollment.default_student_status,
            StudentStatus::Inactive
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = SchoolConfig::default();

        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 2;
        config.database.min_connections = 3;
        assert!(config.validate().is_err());

        config.database.min_connections = 1;
        config.database.lock_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let path = std::env::temp_dir().join(format!("escola-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[database]\nlock_timeout_ms = 250\n").unwrap();

        let config = SchoolConfig::from_file(&path).unwrap();
        assert_eq!(config.lock_timeout(), Duration::from_millis(250));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&SchoolConfig::default()).unwrap();
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[enrollment]"));
    }
}
