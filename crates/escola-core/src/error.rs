//! # Error Types
//!
//! Domain-specific error types for escola-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  escola-core errors (this file)                                        │
//! │  ├── CoreError        - Domain outcomes (not found, full, forbidden)   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  escola-db errors (separate crate)                                     │
//! │  └── DbError          - Storage failures + wrapped CoreError           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → API layer               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error maps onto one [`ErrorKind`], which is what an outer HTTP
//! layer uses to pick a status code.

use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of a failure.
///
/// ```text
/// NotFound        → an id or name did not resolve
/// Validation      → input broke a field rule
/// StateConflict   → the current state forbids the operation
/// Forbidden       → the principal's role does not allow it
/// StorageFailure  → the store itself failed (only produced by escola-db)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    StateConflict,
    Forbidden,
    StorageFailure,
}

// =============================================================================
// Core Error
// =============================================================================

/// Domain outcomes of the enrollment rules.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Student id does not resolve.
    #[error("Student not found: {0}")]
    StudentNotFound(String),

    /// Class id (or, during approval, class name) does not resolve.
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    /// Enrollment request id does not resolve.
    #[error("Enrollment request not found: {0}")]
    RequestNotFound(String),

    /// Link id does not resolve.
    #[error("Link not found: {0}")]
    LinkNotFound(String),

    #[error("Teacher not found: {0}")]
    TeacherNotFound(String),

    /// The student already belongs to a class.
    ///
    /// There is no implicit transfer: the student must be un-enrolled
    /// first.
    #[error("Student {student_id} is already enrolled in class {class_id}")]
    AlreadyEnrolled {
        student_id: String,
        class_id: String,
    },

    /// The class has no free seat.
    ///
    /// ## User Workflow
    /// ```text
    /// enroll(student, "3º Ano A")
    ///      │
    ///      ▼
    /// occupancy = 25, capacity = 25
    ///      │
    ///      ▼
    /// ClassFull { class_name: "3º Ano A", capacity: 25 }
    /// ```
    #[error("Class {class_name} is full (capacity {capacity})")]
    ClassFull { class_name: String, capacity: i64 },

    /// A class with students cannot be deleted.
    #[error("Class {class_id} still has {occupancy} students")]
    ClassNotEmpty { class_id: String, occupancy: i64 },

    /// Capacity edit would drop below the current headcount.
    #[error("Capacity {requested} is below current occupancy {occupancy} for class {class_id}")]
    CapacityBelowOccupancy {
        class_id: String,
        requested: i64,
        occupancy: i64,
    },

    /// The request was already approved or rejected.
    #[error("Enrollment request {request_id} is already {status}")]
    AlreadyResolved { request_id: String, status: String },

    /// The principal's role does not permit the operation.
    #[error("Operation not permitted: {0}")]
    Forbidden(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies this error for the outer layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::StudentNotFound(_)
            | CoreError::ClassNotFound(_)
            | CoreError::RequestNotFound(_)
            | CoreError::LinkNotFound(_)
            | CoreError::TeacherNotFound(_) => ErrorKind::NotFound,
            CoreError::AlreadyEnrolled { .. }
            | CoreError::ClassFull { .. }
            | CoreError::ClassNotEmpty { .. }
            | CoreError::CapacityBelowOccupancy { .. }
            | CoreError::AlreadyResolved { .. } => ErrorKind::StateConflict,
            CoreError::Forbidden(_) => ErrorKind::Forbidden,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any store access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., bad email, forbidden characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A date that must be in the past lies in the future.
    #[error("{field} cannot be in the future")]
    InFuture { field: String },

    /// Duplicate value (class name, student email, link).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::ClassFull {
            class_name: "3º Ano A".to_string(),
            capacity: 25,
        };
        assert_eq!(err.to_string(), "Class 3º Ano A is full (capacity 25)");

        let err = CoreError::CapacityBelowOccupancy {
            class_id: "c1".to_string(),
            requested: 5,
            occupancy: 10,
        };
        assert_eq!(
            err.to_string(),
            "Capacity 5 is below current occupancy 10 for class c1"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::InFuture {
            field: "birth_date".to_string(),
        };
        assert_eq!(err.to_string(), "birth_date cannot be in the future");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CoreError::StudentNotFound("s".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::TeacherNotFound("t".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::AlreadyResolved {
                request_id: "r".into(),
                status: "approved".into()
            }
            .kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            CoreError::Forbidden("approve".into()).kind(),
            ErrorKind::Forbidden
        );
    }
}
