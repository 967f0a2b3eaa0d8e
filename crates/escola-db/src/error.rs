//! # Database Error Types
//!
//! Error types for database operations and units of work.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)         CoreError (escola-core rules)      │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  DbError (this module) ◄──── DbError::Domain(CoreError)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError::kind() → NotFound | Validation | StateConflict |             │
//! │                    Forbidden | StorageFailure                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  API layer picks the status code                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use escola_core::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

/// Trigger message raised when a write would overfill a class.
pub(crate) const TRIGGER_CLASS_FULL: &str = "class capacity exceeded";

/// Trigger message raised when a capacity edit drops below the headcount.
pub(crate) const TRIGGER_CAPACITY_FLOOR: &str = "capacity below occupancy";

/// Database operation errors.
///
/// Storage failures carry the sqlx context; business outcomes travel
/// unchanged inside [`DbError::Domain`].
#[derive(Debug, Error)]
pub enum DbError {
    /// A rule in escola-core refused the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - `fetch_one` returns no rows outside a typed lookup
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation that no repository translated.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    ///
    /// ## When This Occurs
    /// - Referencing a class or student that was deleted concurrently
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed (includes SQLITE_BUSY).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed to begin or commit.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The per-class enrollment lock was not acquired in time.
    #[error("Timed out after {waited_ms}ms waiting for class {class_id}")]
    LockTimeout { class_id: String, waited_ms: u64 },

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Turns a raw unique violation into a `Validation(Duplicate)` naming
    /// the offending field and value. Other errors pass through.
    pub fn or_duplicate(self, field: &str, value: &str) -> Self {
        match self {
            DbError::UniqueViolation { .. } => {
                DbError::Domain(CoreError::Validation(ValidationError::Duplicate {
                    field: field.to_string(),
                    value: value.to_string(),
                }))
            }
            other => other,
        }
    }

    /// Classifies this error for the outer layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Domain(err) => err.kind(),
            DbError::NotFound { .. } | DbError::ForeignKeyViolation { .. } => ErrorKind::NotFound,
            DbError::UniqueViolation { .. } => ErrorKind::Validation,
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::TransactionFailed(_)
            | DbError::PoolExhausted
            | DbError::LockTimeout { .. }
            | DbError::Internal(_) => ErrorKind::StorageFailure,
        }
    }

    /// Storage failures may succeed if the caller tries again; business
    /// outcomes never do. Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StorageFailure
    }

    /// Returns the wrapped domain error, if any.
    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            DbError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound              → DbError::NotFound
/// Database: unique violation            → DbError::UniqueViolation
/// Database: foreign key violation       → DbError::ForeignKeyViolation
/// Database: "class capacity exceeded"   → Domain(ClassFull)
/// Database: "capacity below occupancy"  → Domain(CapacityBelowOccupancy)
/// sqlx::Error::PoolTimedOut             → DbError::PoolExhausted
/// Other                                 → DbError::Internal
/// ```
///
/// Trigger aborts carry no row context, so the mapped domain errors hold
/// placeholder fields. Units of work check first and only hit the trigger
/// when something bypassed them.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if msg.contains(TRIGGER_CLASS_FULL) {
                    DbError::Domain(CoreError::ClassFull {
                        class_name: "unknown".to_string(),
                        capacity: 0,
                    })
                } else if msg.contains(TRIGGER_CAPACITY_FLOOR) {
                    DbError::Domain(CoreError::CapacityBelowOccupancy {
                        class_id: "unknown".to_string(),
                        requested: 0,
                        occupancy: 0,
                    })
                } else if db_err.is_unique_violation() {
                    // "UNIQUE constraint failed: <table>.<column>"
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if db_err.is_foreign_key_violation() {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================
