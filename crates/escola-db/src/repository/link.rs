//! # Link Repository
//!
//! Links (vinculações) grant a principal visibility of a student. One is
//! created automatically when a request is approved; admins can also
//! manage them directly.

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use escola_core::{CoreError, Link, LinkKind};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use crate::repository::student::fetch_student;

/// Repository for principal → student links.
#[derive(Debug, Clone)]
pub struct LinkRepository {
    pool: SqlitePool,
}

impl LinkRepository {
    /// Creates a new LinkRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LinkRepository { pool }
    }

    /// Links a principal to an existing student.
    ///
    /// ## Errors
    /// - `StudentNotFound`
    /// - `Validation(Duplicate)` when the pair is already linked
    pub async fn create(
        &self,
        principal_id: &str,
        student_id: &str,
        kind: LinkKind,
    ) -> DbResult<Link> {
        if fetch_student(&self.pool, student_id).await?.is_none() {
            return Err(CoreError::StudentNotFound(student_id.to_string()).into());
        }

        let link = build_link(principal_id, student_id, kind);
        insert_link(&self.pool, &link).await?;

        info!(principal_id = %principal_id, student_id = %student_id, kind = ?kind, "Link created");
        Ok(link)
    }

    /// Removes a link.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM student_links WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::LinkNotFound(id.to_string()).into());
        }

        debug!(link_id = %id, "Link deleted");
        Ok(())
    }

    /// Lists every link, newest first.
    pub async fn list(&self) -> DbResult<Vec<Link>> {
        let links = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, principal_id, student_id, kind, created_at
            FROM student_links
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }

    /// Lists the links of one principal, newest first.
    pub async fn list_for_principal(&self, principal_id: &str) -> DbResult<Vec<Link>> {
        let links = sqlx::query_as::<_, Link>(
            r#"
            SELECT id, principal_id, student_id, kind, created_at
            FROM student_links
            WHERE principal_id = ?1
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }
}

pub(crate) fn build_link(principal_id: &str, student_id: &str, kind: LinkKind) -> Link {
    Link {
        id: generate_id(),
        principal_id: principal_id.to_string(),
        student_id: student_id.to_string(),
        kind,
        created_at: Utc::now(),
    }
}

pub(crate) async fn insert_link<'e, E>(executor: E, link: &Link) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO student_links (id, principal_id, student_id, kind, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&link.id)
    .bind(&link.principal_id)
    .bind(&link.student_id)
    .bind(link.kind)
    .bind(link.created_at)
    .execute(executor)
    .await
    .map_err(|e| {
        DbError::from(e).or_duplicate("link", &format!("{}/{}", link.principal_id, link.student_id))
    })?;

    Ok(())
}
