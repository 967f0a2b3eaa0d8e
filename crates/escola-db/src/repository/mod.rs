//! # Repository Module
//!
//! Database repository implementations for Escola.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  API handler                                                           │
//! │       │                                                                 │
//! │       │  db.classes().list()                                           │
//! │       ▼                                                                 │
//! │  ClassRepository / StudentRepository / LinkRepository                  │
//! │  ├── pub async methods on &self (own a SqlitePool clone)               │
//! │  └── pub(crate) fetch_* / insert_* fns generic over SqliteExecutor     │
//! │             │                                                           │
//! │             ├── called with &pool  (plain reads)                       │
//! │             └── called with &mut *tx (inside units of work in          │
//! │                 enrollment.rs and workflow.rs)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ClassRepository`](class::ClassRepository) - Class CRUD, occupancy, capacity edits
//! - [`StudentRepository`](student::StudentRepository) - Student CRUD and filtered listing
//! - [`RequestRepository`](request::RequestRepository) - Enrollment request storage
//! - [`LinkRepository`](link::LinkRepository) - Principal → student links
//! - [`TeacherRepository`](teacher::TeacherRepository) - Teacher register

pub mod class;
pub mod link;
pub mod request;
pub mod student;
pub mod teacher;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

/// Generates a new entity id (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// The date age rules are evaluated against.
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
