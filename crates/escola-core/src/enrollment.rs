//! # Enrollment Rules
//!
//! Preconditions for placing a student in a class, and the transitions of
//! an enrollment request. Both the enrollment engine and request approval
//! in escola-db go through these functions, so the ordering of checks lives
//! in exactly one place.
//!
//! ## Enrollment Preconditions (first failure wins)
//! ```text
//! enroll(student_id, class_id)
//!      │
//!      ├── student missing?        → StudentNotFound
//!      ├── class missing?          → ClassNotFound
//!      ├── student has a class?    → AlreadyEnrolled
//!      ├── occupancy >= capacity?  → ClassFull
//!      │
//!      └── OK → assign class, status = active
//! ```
//!
//! ## Request Lifecycle
//! ```text
//!              approve (admin)
//!   ┌─────────┐ ──────────────► ┌──────────┐
//!   │ pending │                 │ approved │
//!   └─────────┘ ──────────────► ├──────────┤
//!              reject (admin)   │ rejected │
//!                               └──────────┘
//!   Resolved requests never change again.
//! ```

use crate::capacity::ensure_room;
use crate::error::{CoreError, CoreResult};
use crate::types::{Class, EnrollmentRequest, Principal, RequestStatus, Student};
use crate::validation::normalize_optional_text;

// =============================================================================
// Enrollment
// =============================================================================

/// Checks every enrollment precondition in order.
///
/// `student` and `class` are whatever the store returned for the given ids;
/// `occupancy` is the class headcount read in the same unit of work. On
/// success both records are handed back, known to exist.
pub fn check_enrollment<'a>(
    student_id: &str,
    student: Option<&'a Student>,
    class_id: &str,
    class: Option<&'a Class>,
    occupancy: i64,
) -> CoreResult<(&'a Student, &'a Class)> {
    let student = student.ok_or_else(|| CoreError::StudentNotFound(student_id.to_string()))?;
    let class = class.ok_or_else(|| CoreError::ClassNotFound(class_id.to_string()))?;

    if let Some(current) = &student.class_id {
        return Err(CoreError::AlreadyEnrolled {
            student_id: student.id.clone(),
            class_id: current.clone(),
        });
    }

    ensure_room(class, occupancy)?;
    Ok((student, class))
}

// =============================================================================
// Request Transitions
// =============================================================================

/// Only administrators may resolve requests.
pub fn ensure_admin(principal: &Principal, action: &str) -> CoreResult<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(CoreError::Forbidden(format!(
            "{action} requires an administrator"
        )))
    }
}

/// A request may be resolved once.
pub fn ensure_pending(request: &EnrollmentRequest) -> CoreResult<()> {
    match request.status {
        RequestStatus::Pending => Ok(()),
        resolved => Err(CoreError::AlreadyResolved {
            request_id: request.id.clone(),
            status: resolved.as_str().to_string(),
        }),
    }
}

/// The admin's response text, or `default` when blank.
pub fn response_or_default(response: Option<&str>, default: &str) -> String {
    normalize_optional_text(response).unwrap_or_else(|| default.to_string())
}

/// Which class an approval should enroll the new student into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalTarget {
    /// The admin picked a class explicitly.
    ClassId(String),
    /// Fall back to the class named on the request, resolved now.
    ClassName(String),
    /// Approve without enrolling.
    NoClass,
}

/// An explicit class id wins over the request's desired class name.
pub fn approval_target(request: &EnrollmentRequest, class_id: Option<&str>) -> ApprovalTarget {
    if let Some(id) = normalize_optional_text(class_id) {
        return ApprovalTarget::ClassId(id);
    }
    match normalize_optional_text(request.desired_class_name.as_deref()) {
        Some(name) => ApprovalTarget::ClassName(name),
        None => ApprovalTarget::NoClass,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StudentStatus;
    use chrono::{NaiveDate, Utc};

    fn student(class_id: Option<&str>) -> Student {
        Student {
            id: "s1".to_string(),
            name: "Ana Silva".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2010, 3, 15).unwrap(),
            email: None,
            status: StudentStatus::Inactive,
            class_id: class_id.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn class(capacity: i64) -> Class {
        Class {
            id: "c1".to_string(),
            name: "1º Ano A".to_string(),
            capacity,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(status: RequestStatus, desired: Option<&str>) -> EnrollmentRequest {
        EnrollmentRequest {
            id: "r1".to_string(),
            principal_id: "u1".to_string(),
            student_name: "Maria Souza".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2010, 5, 1).unwrap(),
            email: None,
            notes: None,
            desired_class_name: desired.map(str::to_string),
            status,
            submitted_at: Utc::now(),
            resolved_at: None,
            admin_response: None,
            student_id: None,
        }
    }

    #[test]
    fn test_enrollment_ok() {
        let s = student(None);
        let c = class(30);
        assert!(check_enrollment("s1", Some(&s), "c1", Some(&c), 29).is_ok());
    }

    #[test]
    fn test_missing_student_checked_before_class() {
        let err = check_enrollment("s1", None, "c1", None, 0).unwrap_err();
        assert!(matches!(err, CoreError::StudentNotFound(id) if id == "s1"));
    }

    #[test]
    fn test_missing_class() {
        let s = student(None);
        let err = check_enrollment("s1", Some(&s), "c9", None, 0).unwrap_err();
        assert!(matches!(err, CoreError::ClassNotFound(id) if id == "c9"));
    }

    #[test]
    fn test_already_enrolled_wins_over_full() {
        let s = student(Some("c2"));
        let c = class(1);
        let err = check_enrollment("s1", Some(&s), "c1", Some(&c), 1).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyEnrolled { class_id, .. } if class_id == "c2"));
    }

    #[test]
    fn test_full_class() {
        let s = student(None);
        let c = class(1);
        let err = check_enrollment("s1", Some(&s), "c1", Some(&c), 1).unwrap_err();
        assert!(matches!(err, CoreError::ClassFull { capacity: 1, .. }));
    }

    #[test]
    fn test_ensure_admin() {
        assert!(ensure_admin(&Principal::admin("a1"), "approve").is_ok());
        assert!(matches!(
            ensure_admin(&Principal::user("u1"), "approve"),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[test]
    fn test_ensure_pending() {
        assert!(ensure_pending(&request(RequestStatus::Pending, None)).is_ok());
        let err = ensure_pending(&request(RequestStatus::Rejected, None)).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyResolved { status, .. } if status == "rejected"));
    }

    #[test]
    fn test_response_or_default() {
        assert_eq!(response_or_default(None, "Request approved"), "Request approved");
        assert_eq!(response_or_default(Some("  "), "Request approved"), "Request approved");
        assert_eq!(response_or_default(Some(" Welcome "), "Request approved"), "Welcome");
    }

    #[test]
    fn test_approval_target() {
        let with_desired = request(RequestStatus::Pending, Some("2º Ano A"));
        assert_eq!(
            approval_target(&with_desired, Some("c1")),
            ApprovalTarget::ClassId("c1".to_string())
        );
        assert_eq!(
            approval_target(&with_desired, None),
            ApprovalTarget::ClassName("2º Ano A".to_string())
        );
        assert_eq!(
            approval_target(&request(RequestStatus::Pending, None), Some("  ")),
            ApprovalTarget::NoClass
        );
    }
}
