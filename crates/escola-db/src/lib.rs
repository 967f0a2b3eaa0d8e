//! # escola-db: Database Layer for Escola
//!
//! This crate provides database access for the Escola school system:
//! classes, students, teachers, enrollment requests and links, stored in
//! SQLite via sqlx, plus the units of work that keep class headcounts within
//! capacity.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Escola Data Flow                                 │
//! │                                                                         │
//! │  API handler (enroll, approve, list students)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    escola-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐  ┌────────────────┐  ┌──────────────────┐  │   │
//! │  │   │   Database   │  │  Repositories  │  │  Units of work   │  │   │
//! │  │   │  (pool.rs)   │  │ class/student/ │  │ enrollment.rs    │  │   │
//! │  │   │              │  │ request/link   │  │ workflow.rs      │  │   │
//! │  │   │ SqlitePool   │◄─│                │◄─│ (ClassLocks +    │  │   │
//! │  │   │ ClassLocks   │  │ roster.rs      │  │  transactions)   │  │   │
//! │  │   └──────────────┘  └────────────────┘  └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   escola.db (path from escola.toml / ESCOLA_DB_PATH)            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and the `Database` handle
//! - [`config`] - `escola.toml` + environment settings
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`locks`] - Per-class async mutexes
//! - [`repository`] - Class, student, teacher, request and link storage
//! - [`enrollment`] - Enroll / unenroll engine
//! - [`workflow`] - Enrollment request filing and resolution
//! - [`roster`] - Occupancy and statistics reads
//!
//! ## Usage
//!
//! ```rust,ignore
//! use escola_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/escola.db")).await?;
//!
//! let receipt = db.enrollment().enroll(&student_id, &class_id).await?;
//! let stats = db.roster().system_statistics().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod enrollment;
pub mod error;
pub mod locks;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod roster;
pub mod workflow;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, SchoolConfig};
pub use enrollment::EnrollmentEngine;
pub use error::{DbError, DbResult};
pub use locks::ClassLocks;
pub use pool::{Database, DbConfig};
pub use roster::RosterQuery;
pub use workflow::RequestWorkflow;

// Repository re-exports for convenience
pub use repository::class::ClassRepository;
pub use repository::link::LinkRepository;
pub use repository::request::RequestRepository;
pub use repository::student::StudentRepository;
pub use repository::teacher::TeacherRepository;

// =============================================================================
// Test Fixtures
// =============================================================================
