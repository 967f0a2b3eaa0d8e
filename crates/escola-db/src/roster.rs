//! # Roster Query
//!
//! Read-only views over classes and students: single-class occupancy,
//! school-wide statistics, and "my students" scoped by role.
//!
//! Nothing here takes a class lock. Numbers are a snapshot and may be
//! stale by the time the caller looks at them.

use sqlx::SqlitePool;
use tracing::debug;

use escola_core::capacity::occupancy_percent;
use escola_core::{
    ClassOccupancy, ClassStatistics, CoreError, Principal, StudentFilter, StudentListing,
    StudentStatus, SystemStatistics,
};

use crate::error::DbResult;
use crate::repository::class::{fetch_occupancy, OCCUPANCY_SELECT};
use crate::repository::student::StudentRepository;

/// Headcount reads.
#[derive(Debug, Clone)]
pub struct RosterQuery {
    pool: SqlitePool,
}

impl RosterQuery {
    pub fn new(pool: SqlitePool) -> Self {
        RosterQuery { pool }
    }

    /// `available = capacity - occupancy`.
    pub async fn class_occupancy(&self, class_id: &str) -> DbResult<ClassOccupancy> {
        fetch_occupancy(&self.pool, class_id)
            .await?
            .ok_or_else(|| CoreError::ClassNotFound(class_id.to_string()).into())
    }

    /// Totals plus one line per class, ordered by class name.
    pub async fn system_statistics(&self) -> DbResult<SystemStatistics> {
        let (total_students, active_students, inactive_students, students_without_class): (
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'inactive' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN class_id IS NULL THEN 1 ELSE 0 END), 0)
            FROM students
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let sql = format!("{OCCUPANCY_SELECT} GROUP BY c.id, c.name, c.capacity ORDER BY c.name");
        let classes = sqlx::query_as::<_, ClassOccupancy>(&sql)
            .fetch_all(&self.pool)
            .await?;

        let per_class: Vec<ClassStatistics> = classes
            .into_iter()
            .map(|c| ClassStatistics {
                occupancy_percent: occupancy_percent(c.occupancy, c.capacity),
                class_id: c.class_id,
                class_name: c.class_name,
                capacity: c.capacity,
                occupancy: c.occupancy,
            })
            .collect();

        debug!(
            total_students,
            total_classes = per_class.len(),
            "Computed system statistics"
        );

        Ok(SystemStatistics {
            total_students,
            active_students,
            inactive_students,
            total_classes: per_class.len() as i64,
            students_without_class,
            per_class,
        })
    }

    /// Admins see every student; users see the students linked to them.
    pub async fn my_students(&self, principal: &Principal) -> DbResult<Vec<StudentListing>> {
        let students = StudentRepository::new(self.pool.clone(), StudentStatus::default());

        if principal.is_admin() {
            students.list(&StudentFilter::default()).await
        } else {
            students.list_linked_to(&principal.id).await
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
