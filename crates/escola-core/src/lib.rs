//! # escola-core: Pure Enrollment Rules for Escola
//!
//! This crate holds the business rules of the school enrollment system as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Escola Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           API layer (HTTP, auth) - outside this workspace       │   │
//! │  │     hands over an authenticated Principal { id, role }          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ escola-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌──────────────────┐ │   │
//! │  │  │  types   │ │ capacity │ │ enrollment │ │    validation    │ │   │
//! │  │  │ Class    │ │ has_room │ │ precond.   │ │ names, ages,     │ │   │
//! │  │  │ Student  │ │ percent  │ │ ordering   │ │ emails, capacity │ │   │
//! │  │  │ Request  │ └──────────┘ │ request    │ └──────────────────┘ │   │
//! │  │  └──────────┘              │ transitions│                      │   │
//! │  │                            └────────────┘                      │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 escola-db (Database Layer)                      │   │
//! │  │     SQLite, repositories, enrollment engine, request workflow   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Class, Student, Teacher, EnrollmentRequest, Principal)
//! - [`capacity`] - The capacity guard and occupancy arithmetic
//! - [`enrollment`] - Enrollment preconditions and request transitions
//! - [`validation`] - Input validation for names, dates, emails, capacity
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use escola_core::capacity::{has_room, occupancy_percent};
//!
//! assert!(has_room(25, 24));
//! assert!(!has_room(25, 25));
//! assert_eq!(occupancy_percent(1, 3), 33.3);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod capacity;
pub mod enrollment;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Smallest capacity a class may be created or edited with.
pub const MIN_CLASS_CAPACITY: i64 = 1;

/// Largest capacity a class may be created or edited with.
pub const MAX_CLASS_CAPACITY: i64 = 50;

/// Class name length bounds (characters, after trimming).
pub const MIN_CLASS_NAME_LEN: usize = 2;
pub const MAX_CLASS_NAME_LEN: usize = 100;

/// Student name length bounds (characters, after trimming).
pub const MIN_STUDENT_NAME_LEN: usize = 3;
pub const MAX_STUDENT_NAME_LEN: usize = 80;

/// Student age bounds in whole years at evaluation time.
///
/// ## Business Reason
/// The school serves students from kindergarten up to late secondary
/// and adult-continuation programs.
pub const MIN_STUDENT_AGE: i32 = 5;
pub const MAX_STUDENT_AGE: i32 = 25;

/// Maximum email length (after trimming and lower-casing).
pub const MAX_EMAIL_LEN: usize = 120;

/// Teacher field bounds (characters, after trimming). Teacher names share
/// the student minimum and character rules.
pub const MAX_TEACHER_NAME_LEN: usize = 100;
pub const MIN_SPECIALTY_LEN: usize = 2;
pub const MAX_SPECIALTY_LEN: usize = 100;
pub const MAX_PHONE_LEN: usize = 20;

/// Response stored when an admin approves without writing one.
pub const DEFAULT_APPROVAL_RESPONSE: &str = "Request approved";

/// Response stored when an admin rejects without writing one.
pub const DEFAULT_REJECTION_RESPONSE: &str = "Request rejected";
