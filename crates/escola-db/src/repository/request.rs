//! # Enrollment Request Repository
//!
//! Storage for enrollment requests. The lifecycle rules (who may resolve,
//! what approval creates) live in [`crate::workflow`]; this module only
//! reads and writes rows.
//!
//! Resolution is a guarded write: `UPDATE ... WHERE status = 'pending'`.
//! Zero rows affected means someone else resolved the request first.

use chrono::{DateTime, Utc};
use sqlx::{SqliteExecutor, SqlitePool};

use escola_core::{CoreError, EnrollmentRequest, RequestStatus};

use crate::error::DbResult;

const REQUEST_COLUMNS: &str = "id, principal_id, student_name, birth_date, email, notes, \
     desired_class_name, status, submitted_at, resolved_at, admin_response, student_id";

/// Read access to stored requests.
#[derive(Debug, Clone)]
pub struct RequestRepository {
    pool: SqlitePool,
}

impl RequestRepository {
    /// Creates a new RequestRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RequestRepository { pool }
    }

    /// Gets a request by ID.
    pub async fn get(&self, id: &str) -> DbResult<EnrollmentRequest> {
        fetch_request(&self.pool, id)
            .await?
            .ok_or_else(|| CoreError::RequestNotFound(id.to_string()).into())
    }

    /// All requests, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<EnrollmentRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM enrollment_requests \
             ORDER BY submitted_at DESC, rowid DESC"
        );

        let requests = sqlx::query_as::<_, EnrollmentRequest>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(requests)
    }

    /// Requests filed by one principal, newest first.
    pub async fn list_by_principal(&self, principal_id: &str) -> DbResult<Vec<EnrollmentRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM enrollment_requests \
             WHERE principal_id = ?1 \
             ORDER BY submitted_at DESC, rowid DESC"
        );

        let requests = sqlx::query_as::<_, EnrollmentRequest>(&sql)
            .bind(principal_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(requests)
    }

    /// Number of requests waiting for an admin.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM enrollment_requests WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Executor-generic queries (shared with the workflow)
// =============================================================================

pub(crate) async fn fetch_request<'e, E>(executor: E, id: &str) -> DbResult<Option<EnrollmentRequest>>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM enrollment_requests WHERE id = ?1");

    let request = sqlx::query_as::<_, EnrollmentRequest>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(request)
}

pub(crate) async fn insert_request<'e, E>(executor: E, request: &EnrollmentRequest) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO enrollment_requests (
            id, principal_id, student_name, birth_date, email, notes,
            desired_class_name, status, submitted_at, resolved_at, admin_response, student_id
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&request.id)
    .bind(&request.principal_id)
    .bind(&request.student_name)
    .bind(request.birth_date)
    .bind(&request.email)
    .bind(&request.notes)
    .bind(&request.desired_class_name)
    .bind(request.status)
    .bind(request.submitted_at)
    .bind(request.resolved_at)
    .bind(&request.admin_response)
    .bind(&request.student_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Moves a pending request to `status`. Returns false if it was no longer
/// pending.
pub(crate) async fn resolve_request<'e, E>(
    executor: E,
    id: &str,
    status: RequestStatus,
    resolved_at: DateTime<Utc>,
    response: &str,
    student_id: Option<&str>,
) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE enrollment_requests
        SET status = ?2, resolved_at = ?3, admin_response = ?4, student_id = ?5
        WHERE id = ?1 AND status = 'pending'
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(resolved_at)
    .bind(response)
    .bind(student_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}
