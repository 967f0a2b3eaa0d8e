//! # Enrollment Engine
//!
//! Places students into classes without ever exceeding capacity.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  enroll(student_id, class_id)                                          │
//! │                                                                         │
//! │  1. pre-flight   read student, class, occupancy (pool, no lock)        │
//! │                  check_enrollment() → early, clear rejection           │
//! │                                                                         │
//! │  2. lock(class_id)          bounded by lock_timeout → LockTimeout      │
//! │                                                                         │
//! │  3. BEGIN                                                              │
//! │     re-read student, class, occupancy                                  │
//! │     check_enrollment()      same rules, fresh data                     │
//! │     UPDATE students SET class_id = C, status = 'active'                │
//! │       WHERE id = S AND class_id IS NULL                                │
//! │         AND count(C) < capacity(C)   ← 0 rows → ClassFull             │
//! │     COMMIT                                                             │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction (rollback).             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The schema triggers are the last line: a write that slips past all of
//! this still aborts with `ClassFull`.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use escola_core::enrollment::check_enrollment;
use escola_core::{CoreError, EnrollmentReceipt, StudentStatus};

use crate::error::DbResult;
use crate::locks::ClassLocks;
use crate::pool::{begin, commit};
use crate::repository::class::{count_in_class, fetch_class};
use crate::repository::student::fetch_student;

/// Enroll / unenroll service.
#[derive(Debug, Clone)]
pub struct EnrollmentEngine {
    pool: SqlitePool,
    locks: ClassLocks,
}

impl EnrollmentEngine {
    pub fn new(pool: SqlitePool, locks: ClassLocks) -> Self {
        EnrollmentEngine { pool, locks }
    }

    /// Enrolls a student into a class and marks them active.
    ///
    /// ## Errors (first failure wins)
    /// 1. `StudentNotFound`
    /// 2. `ClassNotFound`
    /// 3. `AlreadyEnrolled`
    /// 4. `ClassFull`
    ///
    /// Plus `LockTimeout` and other storage failures.
    pub async fn enroll(&self, student_id: &str, class_id: &str) -> DbResult<EnrollmentReceipt> {
        debug!(student_id = %student_id, class_id = %class_id, "Enrollment requested");

        // Pre-flight: may be stale, only used to fail early.
        {
            let student = fetch_student(&self.pool, student_id).await?;
            let class = fetch_class(&self.pool, class_id).await?;
            let occupancy = match &class {
                Some(c) => count_in_class(&self.pool, &c.id).await?,
                None => 0,
            };
            if let Err(err) =
                check_enrollment(student_id, student.as_ref(), class_id, class.as_ref(), occupancy)
            {
                warn!(student_id = %student_id, class_id = %class_id, error = %err, "Enrollment refused");
                return Err(err.into());
            }
        }

        let _guard = self.locks.acquire(class_id).await?;
        let mut tx = begin(&self.pool).await?;

        let receipt = match enroll_in_tx(&mut *tx, student_id, class_id).await {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(student_id = %student_id, class_id = %class_id, error = %err, "Enrollment refused");
                return Err(err);
            }
        };

        commit(tx).await?;

        info!(
            student_id = %receipt.student_id,
            class_id = %receipt.class_id,
            class_name = %receipt.class_name,
            "Student enrolled"
        );
        Ok(receipt)
    }

    /// Removes a student from their class.
    ///
    /// A student without a class is left as is; status is never touched.
    pub async fn unenroll(&self, student_id: &str) -> DbResult<()> {
        let student = fetch_student(&self.pool, student_id)
            .await?
            .ok_or_else(|| CoreError::StudentNotFound(student_id.to_string()))?;

        let Some(class_id) = student.class_id else {
            debug!(student_id = %student_id, "Student has no class, nothing to unenroll");
            return Ok(());
        };

        sqlx::query("UPDATE students SET class_id = NULL, updated_at = ?2 WHERE id = ?1")
            .bind(student_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        info!(student_id = %student_id, class_id = %class_id, "Student unenrolled");
        Ok(())
    }
}

/// Enrollment step of a unit of work. The caller holds the class lock and
/// owns the transaction.
pub(crate) async fn enroll_in_tx(
    conn: &mut SqliteConnection,
    student_id: &str,
    class_id: &str,
) -> DbResult<EnrollmentReceipt> {
    let student = fetch_student(&mut *conn, student_id).await?;
    let class = fetch_class(&mut *conn, class_id).await?;
    let occupancy = match &class {
        Some(c) => count_in_class(&mut *conn, &c.id).await?,
        None => 0,
    };

    let (student, class) =
        check_enrollment(student_id, student.as_ref(), class_id, class.as_ref(), occupancy)?;

    let result = sqlx::query(
        r#"
        UPDATE students
        SET class_id = ?2, status = ?3, updated_at = ?4
        WHERE id = ?1
          AND class_id IS NULL
          AND (SELECT COUNT(*) FROM students WHERE class_id = ?2)
              < (SELECT capacity FROM classes WHERE id = ?2)
        "#,
    )
    .bind(student_id)
    .bind(class_id)
    .bind(StudentStatus::Active)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ClassFull {
            class_name: class.name.clone(),
            capacity: class.capacity,
        }
        .into());
    }

    Ok(EnrollmentReceipt {
        student_id: student.id.clone(),
        student_name: student.name.clone(),
        class_id: class.id.clone(),
        class_name: class.name.clone(),
        status: StudentStatus::Active,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
