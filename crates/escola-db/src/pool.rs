//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Service Startup                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SchoolConfig::load() → DbConfig::from(&config)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐   ┌────────────────────┐  │
//! │  │            SqlitePool                    │   │    ClassLocks      │  │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │   │  class_id → Mutex  │  │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │   │  (shared by all    │  │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │   │   Database clones) │  │
//! │  └─────────────────────────────────────────┘   └────────────────────┘  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.classes() db.students() db.links()        (repositories)           │
//! │  db.enrollment() db.requests() db.roster()    (services)               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so roster reads never
//! wait on an enrollment that is being written.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use escola_core::StudentStatus;

use crate::config::SchoolConfig;
use crate::enrollment::EnrollmentEngine;
use crate::error::{DbError, DbResult};
use crate::locks::ClassLocks;
use crate::migrations;
use crate::repository::class::ClassRepository;
use crate::repository::link::LinkRepository;
use crate::repository::student::StudentRepository;
use crate::repository::teacher::TeacherRepository;
use crate::roster::RosterQuery;
use crate::workflow::RequestWorkflow;

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/escola.db")
///     .max_connections(5)
///     .lock_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Upper bound on waiting for a class lock.
    /// Default: 5 seconds
    pub lock_timeout: Duration,

    /// Status for directly created students that don't specify one.
    /// Default: active
    pub default_student_status: StudentStatus,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            lock_timeout: Duration::from_secs(5),
            default_student_status: StudentStatus::Active,
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the class lock timeout.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets the default status of directly created students.
    pub fn default_student_status(mut self, status: StudentStatus) -> Self {
        self.default_student_status = status;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            lock_timeout: Duration::from_secs(5),
            default_student_status: StudentStatus::Active,
            run_migrations: true,
        }
    }
}

impl From<&SchoolConfig> for DbConfig {
    fn from(config: &SchoolConfig) -> Self {
        DbConfig::new(config.database.path.clone())
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .connect_timeout(Duration::from_secs(config.database.connect_timeout_secs))
            .lock_timeout(config.lock_timeout())
            .default_student_status(config.enrollment.default_student_status)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository and service access.
///
/// Cheap to clone: the pool and the class lock registry are shared.
///
/// ## Usage in an API handler
/// ```rust,ignore
/// async fn enroll(db: Database, student_id: String, class_id: String)
///     -> Result<EnrollmentReceipt, DbError>
/// {
///     db.enrollment().enroll(&student_id, &class_id).await
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Per-class mutexes for units of work.
    locks: ClassLocks,

    default_student_status: StudentStatus,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - NORMAL synchronous (balance of safety/speed)
    ///    - Foreign keys enabled (class deletion nulls student.class_id)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            // writers queue behind BEGIN IMMEDIATE for as long as a class lock
            .busy_timeout(config.lock_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            lock_timeout_ms = config.lock_timeout.as_millis() as u64,
            "Database pool created"
        );

        let db = Database {
            pool,
            locks: ClassLocks::new(config.lock_timeout),
            default_student_status: config.default_student_status,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Automatically called by `new()` if `run_migrations` is true.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// Prefer repository methods: writes that bypass the class locks only
    /// have the schema triggers left to protect capacity.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the class repository.
    pub fn classes(&self) -> ClassRepository {
        ClassRepository::new(self.pool.clone(), self.locks.clone())
    }

    /// Returns the student repository.
    pub fn students(&self) -> StudentRepository {
        StudentRepository::new(self.pool.clone(), self.default_student_status)
    }

    /// Returns the link repository.
    pub fn links(&self) -> LinkRepository {
        LinkRepository::new(self.pool.clone())
    }

    /// Returns the teacher repository.
    pub fn teachers(&self) -> TeacherRepository {
        TeacherRepository::new(self.pool.clone())
    }

    /// Returns the enrollment engine.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let receipt = db.enrollment().enroll(&student_id, &class_id).await?;
    /// ```
    pub fn enrollment(&self) -> EnrollmentEngine {
        EnrollmentEngine::new(self.pool.clone(), self.locks.clone())
    }

    /// Returns the enrollment request workflow.
    pub fn requests(&self) -> RequestWorkflow {
        RequestWorkflow::new(self.pool.clone(), self.locks.clone())
    }

    /// Returns the roster queries.
    pub fn roster(&self) -> RosterQuery {
        RosterQuery::new(self.pool.clone())
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Opens a write transaction. Dropping it without [`commit`] rolls back.
///
/// Units of work read before they write. A deferred transaction would hold
/// only a read snapshot and fail with SQLITE_BUSY once another connection
/// commits, whatever the busy timeout. `BEGIN IMMEDIATE` takes the write
/// lock up front, so concurrent units of work queue on the busy timeout
/// instead.
pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

pub(crate) async fn commit(tx: Transaction<'static, Sqlite>) -> DbResult<()> {
    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================
