//! # Class Repository
//!
//! Database operations for classes (turmas).
//!
//! ## Key Operations
//! - CRUD with unique names
//! - Occupancy counts (the `COUNT(*)` every capacity check is based on)
//! - Capacity edits and deletion, both under the class lock
//!
//! ## Capacity Edit
//! ```text
//! update(C, capacity = 5)
//!      │
//!      ├── validate 1..=50
//!      ├── lock(C)
//!      ├── tx: read C, count students in C
//!      ├── 5 < occupancy? → CapacityBelowOccupancy (rollback)
//!      └── UPDATE, commit
//! ```

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, info, warn};

use escola_core::capacity::{check_capacity_change, check_class_delete};
use escola_core::validation::{validate_capacity, validate_class_name};
use escola_core::{Class, ClassOccupancy, ClassUpdate, CoreError, NewClass};

use crate::error::{DbError, DbResult};
use crate::locks::ClassLocks;
use crate::pool::{begin, commit};
use crate::repository::generate_id;

/// Repository for class database operations.
///
/// ## Usage
/// ```rust,ignore
/// let class = db.classes().create(&NewClass { name: "1º Ano A".into(), capacity: 30 }).await?;
/// let seats = db.classes().list().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ClassRepository {
    pool: SqlitePool,
    locks: ClassLocks,
}

impl ClassRepository {
    /// Creates a new ClassRepository.
    pub fn new(pool: SqlitePool, locks: ClassLocks) -> Self {
        ClassRepository { pool, locks }
    }

    /// Creates a class.
    ///
    /// ## Errors
    /// - `Validation` for a bad name or capacity
    /// - `Validation(Duplicate)` when the name is taken
    pub async fn create(&self, input: &NewClass) -> DbResult<Class> {
        let name = validate_class_name(&input.name)?;
        validate_capacity(input.capacity)?;

        let now = Utc::now();
        let class = Class {
            id: generate_id(),
            name,
            capacity: input.capacity,
            created_at: now,
            updated_at: now,
        };

        debug!(name = %class.name, capacity = class.capacity, "Creating class");

        sqlx::query(
            r#"
            INSERT INTO classes (id, name, capacity, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&class.id)
        .bind(&class.name)
        .bind(class.capacity)
        .bind(class.created_at)
        .bind(class.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).or_duplicate("name", &class.name))?;

        info!(class_id = %class.id, name = %class.name, "Class created");
        Ok(class)
    }

    /// Gets a class by ID.
    pub async fn get(&self, id: &str) -> DbResult<Class> {
        fetch_class(&self.pool, id)
            .await?
            .ok_or_else(|| CoreError::ClassNotFound(id.to_string()).into())
    }

    /// Finds a class by its exact (case-sensitive) name.
    pub async fn find_by_name(&self, name: &str) -> DbResult<Class> {
        fetch_class_by_name(&self.pool, name)
            .await?
            .ok_or_else(|| CoreError::ClassNotFound(name.to_string()).into())
    }

    /// Number of students currently enrolled in the class.
    pub async fn count_students(&self, class_id: &str) -> DbResult<i64> {
        count_in_class(&self.pool, class_id).await
    }

    /// Lists every class with its occupancy, ordered by name.
    pub async fn list(&self) -> DbResult<Vec<ClassOccupancy>> {
        let sql = format!("{OCCUPANCY_SELECT} GROUP BY c.id, c.name, c.capacity ORDER BY c.name");

        let rows = sqlx::query_as::<_, ClassOccupancy>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Listed classes");
        Ok(rows)
    }

    /// Occupancy snapshot of one class.
    pub async fn occupancy(&self, class_id: &str) -> DbResult<ClassOccupancy> {
        fetch_occupancy(&self.pool, class_id)
            .await?
            .ok_or_else(|| CoreError::ClassNotFound(class_id.to_string()).into())
    }

    /// Edits name and/or capacity.
    ///
    /// ## Errors
    /// - `Validation` for a bad name or capacity
    /// - `ClassNotFound`
    /// - `CapacityBelowOccupancy` when shrinking below the headcount
    /// - `Validation(Duplicate)` when renaming onto a taken name
    pub async fn update(&self, id: &str, input: &ClassUpdate) -> DbResult<Class> {
        let new_name = input
            .name
            .as_deref()
            .map(validate_class_name)
            .transpose()?;
        if let Some(capacity) = input.capacity {
            validate_capacity(capacity)?;
        }

        let _guard = self.locks.acquire(id).await?;
        let mut tx = begin(&self.pool).await?;

        let current = fetch_class(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::ClassNotFound(id.to_string()))?;

        let capacity = input.capacity.unwrap_or(current.capacity);
        if input.capacity.is_some() {
            let occupancy = count_in_class(&mut *tx, id).await?;
            if let Err(err) = check_capacity_change(id, capacity, occupancy) {
                warn!(class_id = %id, capacity, occupancy, "Refused capacity below occupancy");
                return Err(err.into());
            }
        }

        let name = new_name.unwrap_or(current.name);
        let now = Utc::now();

        sqlx::query("UPDATE classes SET name = ?1, capacity = ?2, updated_at = ?3 WHERE id = ?4")
            .bind(&name)
            .bind(capacity)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).or_duplicate("name", &name))?;

        commit(tx).await?;

        info!(class_id = %id, name = %name, capacity, "Class updated");
        Ok(Class {
            id: id.to_string(),
            name,
            capacity,
            created_at: current.created_at,
            updated_at: now,
        })
    }

    /// Deletes an empty class.
    ///
    /// ## Errors
    /// - `ClassNotFound`
    /// - `ClassNotEmpty` while any student is enrolled
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let guard = self.locks.acquire(id).await?;
        let mut tx = begin(&self.pool).await?;

        if fetch_class(&mut *tx, id).await?.is_none() {
            return Err(CoreError::ClassNotFound(id.to_string()).into());
        }

        let occupancy = count_in_class(&mut *tx, id).await?;
        if let Err(err) = check_class_delete(id, occupancy) {
            warn!(class_id = %id, occupancy, "Refused to delete non-empty class");
            return Err(err.into());
        }

        sqlx::query("DELETE FROM classes WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        commit(tx).await?;
        drop(guard);
        self.locks.forget(id);

        info!(class_id = %id, "Class deleted");
        Ok(())
    }

    /// Counts all classes.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM classes")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Executor-generic queries (shared with units of work)
// =============================================================================

pub(crate) async fn fetch_class<'e, E>(executor: E, id: &str) -> DbResult<Option<Class>>
where
    E: SqliteExecutor<'e>,
{
    let class = sqlx::query_as::<_, Class>(
        "SELECT id, name, capacity, created_at, updated_at FROM classes WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(class)
}

pub(crate) async fn fetch_class_by_name<'e, E>(executor: E, name: &str) -> DbResult<Option<Class>>
where
    E: SqliteExecutor<'e>,
{
    let class = sqlx::query_as::<_, Class>(
        "SELECT id, name, capacity, created_at, updated_at FROM classes WHERE name = ?1",
    )
    .bind(name)
    .fetch_optional(executor)
    .await?;

    Ok(class)
}

pub(crate) const OCCUPANCY_SELECT: &str = r#"
    SELECT
        c.id AS class_id,
        c.name AS class_name,
        c.capacity,
        COUNT(s.id) AS occupancy,
        c.capacity - COUNT(s.id) AS available
    FROM classes c
    LEFT JOIN students s ON s.class_id = c.id
"#;

pub(crate) async fn fetch_occupancy<'e, E>(executor: E, class_id: &str) -> DbResult<Option<ClassOccupancy>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("{OCCUPANCY_SELECT} WHERE c.id = ?1 GROUP BY c.id, c.name, c.capacity");

    let row = sqlx::query_as::<_, ClassOccupancy>(&sql)
        .bind(class_id)
        .fetch_optional(executor)
        .await?;

    Ok(row)
}

pub(crate) async fn count_in_class<'e, E>(executor: E, class_id: &str) -> DbResult<i64>
where
    E: SqliteExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students WHERE class_id = ?1")
        .bind(class_id)
        .fetch_one(executor)
        .await?;

    Ok(count)
}

// =============================================================================
// Unit Tests
// =============================================================================
