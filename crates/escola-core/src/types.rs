//! # Domain Types
//!
//! Core domain types used throughout Escola.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌──────────────────────┐  │
//! │  │     Class       │◄──│    Student      │◄──│        Link          │  │
//! │  │  ─────────────  │ 0..1 ─────────────  │   │  ──────────────────  │  │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  principal_id        │  │
//! │  │  name (unique)  │   │  name           │   │  student_id (FK)     │  │
//! │  │  capacity 1..50 │   │  birth_date     │   │  kind                │  │
//! │  └─────────────────┘   │  email? status  │   └──────────────────────┘  │
//! │                        │  class_id?      │                              │
//! │                        └────────▲────────┘                              │
//! │                                 │ student_id (set on approval)          │
//! │                        ┌────────┴──────────┐                            │
//! │                        │ EnrollmentRequest │  pending ──► approved      │
//! │                        │  ───────────────  │     └──────► rejected      │
//! │                        │  principal_id     │                            │
//! │                        │  desired_class?   │                            │
//! │                        └───────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every stored entity has an `id`: UUID v4 string, immutable, used for
//! relations. Class names are unique as well, and requests refer to their
//! desired class by name only.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Principal & Role
// =============================================================================

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

/// The already-authenticated caller of an operation.
///
/// Credentials are checked elsewhere; the core only looks at the role and
/// uses the id to scope request and link visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn admin(id: impl Into<String>) -> Self {
        Principal {
            id: id.into(),
            role: Role::Admin,
        }
    }

    pub fn user(id: impl Into<String>) -> Self {
        Principal {
            id: id.into(),
            role: Role::User,
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// =============================================================================
// Class
// =============================================================================

/// A class (turma) with a fixed number of seats.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Class {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, unique across the school ("1º Ano A").
    pub name: String,

    /// Maximum number of enrolled students (1..=50).
    pub capacity: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a class.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewClass {
    pub name: String,
    pub capacity: i64,
}

/// Partial edit of a class. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClassUpdate {
    pub name: Option<String>,
    pub capacity: Option<i64>,
}

/// Headcount snapshot of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ClassOccupancy {
    pub class_id: String,
    pub class_name: String,
    pub capacity: i64,
    pub occupancy: i64,
    /// `capacity - occupancy`, never negative while the invariant holds.
    pub available: i64,
}

// =============================================================================
// Student Status
// =============================================================================

/// Whether a student is currently attending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    Active,
    Inactive,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
        }
    }

    /// Parses the lowercase form used in storage and configuration.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Some(StudentStatus::Active),
            "inactive" => Some(StudentStatus::Inactive),
            _ => None,
        }
    }
}

impl Default for StudentStatus {
    fn default() -> Self {
        StudentStatus::Active
    }
}

// =============================================================================
// Student
// =============================================================================

/// A student (aluno).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Student {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub birth_date: NaiveDate,
    /// Lower-cased, unique when present.
    pub email: Option<String>,
    pub status: StudentStatus,
    /// The class the student is enrolled in, if any.
    pub class_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Student {
    #[inline]
    pub fn is_enrolled(&self) -> bool {
        self.class_id.is_some()
    }
}

/// A student row joined with its class name, as returned by listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StudentListing {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub birth_date: NaiveDate,
    pub email: Option<String>,
    pub status: StudentStatus,
    pub class_id: Option<String>,
    pub class_name: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a student directly (without a class).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewStudent {
    pub name: String,
    #[ts(as = "String")]
    pub birth_date: NaiveDate,
    pub email: Option<String>,
    /// Falls back to the configured default when absent.
    pub status: Option<StudentStatus>,
}

/// Partial edit of a student.
///
/// `email: Some("")` clears the address; `None` leaves it untouched.
/// The class is not editable here: use enroll/unenroll.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StudentUpdate {
    pub name: Option<String>,
    #[ts(as = "Option<String>")]
    pub birth_date: Option<NaiveDate>,
    pub email: Option<String>,
    pub status: Option<StudentStatus>,
}

/// Filters for listing students. All present filters must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StudentFilter {
    /// Case-insensitive substring over name or email.
    pub search: Option<String>,
    pub class_id: Option<String>,
    pub status: Option<StudentStatus>,
}

/// Result of a successful enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EnrollmentReceipt {
    pub student_id: String,
    pub student_name: String,
    pub class_id: String,
    pub class_name: String,
    pub status: StudentStatus,
}

// =============================================================================
// Teacher
// =============================================================================

/// Whether a teacher is currently on staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TeacherStatus {
    Active,
    Inactive,
}

impl TeacherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeacherStatus::Active => "active",
            TeacherStatus::Inactive => "inactive",
        }
    }
}

impl Default for TeacherStatus {
    fn default() -> Self {
        TeacherStatus::Active
    }
}

/// A teacher (professor). Not tied to classes or enrollment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Teacher {
    pub id: String,
    pub name: String,
    /// Lower-cased and unique. Unlike a student's, always present.
    pub email: String,
    pub specialty: String,
    pub phone: Option<String>,
    pub status: TeacherStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a teacher.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTeacher {
    pub name: String,
    pub email: String,
    pub specialty: String,
    pub phone: Option<String>,
    /// `Active` when absent.
    pub status: Option<TeacherStatus>,
}

/// Partial edit of a teacher.
///
/// `phone: Some("")` clears the number; `None` leaves it untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TeacherUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub specialty: Option<String>,
    pub phone: Option<String>,
    pub status: Option<TeacherStatus>,
}

// =============================================================================
// Enrollment Request
// =============================================================================

/// Lifecycle of an enrollment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::Pending
    }
}

/// A pending or resolved request from a principal to admit a student.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct EnrollmentRequest {
    pub id: String,
    /// Who filed the request.
    pub principal_id: String,
    pub student_name: String,
    #[ts(as = "String")]
    pub birth_date: NaiveDate,
    pub email: Option<String>,
    pub notes: Option<String>,
    /// Free text, resolved against class names only at approval time.
    pub desired_class_name: Option<String>,
    pub status: RequestStatus,
    #[ts(as = "String")]
    pub submitted_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub resolved_at: Option<DateTime<Utc>>,
    pub admin_response: Option<String>,
    /// The student materialized by approval.
    pub student_id: Option<String>,
}

/// Input for filing a request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RequestForm {
    pub student_name: String,
    #[ts(as = "String")]
    pub birth_date: NaiveDate,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub desired_class_name: Option<String>,
}

// =============================================================================
// Link
// =============================================================================

/// How a principal relates to a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Guardian,
    Father,
    Mother,
    Tutor,
}

impl Default for LinkKind {
    fn default() -> Self {
        LinkKind::Guardian
    }
}

/// Visibility grant from a principal to a student (vinculação).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Link {
    pub id: String,
    pub principal_id: String,
    pub student_id: String,
    pub kind: LinkKind,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Statistics
// =============================================================================

/// Per-class line of [`SystemStatistics`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClassStatistics {
    pub class_id: String,
    pub class_name: String,
    pub capacity: i64,
    pub occupancy: i64,
    /// Rounded to one decimal place.
    pub occupancy_percent: f64,
}

/// School-wide headcount summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SystemStatistics {
    pub total_students: i64,
    pub active_students: i64,
    pub inactive_students: i64,
    pub total_classes: i64,
    pub students_without_class: i64,
    pub per_class: Vec<ClassStatistics>,
}

// =============================================================================
// Unit Tests
// =============================================================================
