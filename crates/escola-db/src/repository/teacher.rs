//! # Teacher Repository
//!
//! Database operations for the teacher register (professores).
//!
//! Teachers stand apart from enrollment: no class or student references
//! them, so every write here is a single statement on the pool.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use escola_core::validation::{validate_new_teacher, validate_teacher_update};
use escola_core::{CoreError, NewTeacher, Teacher, TeacherUpdate};

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;

const TEACHER_SELECT: &str = r#"
    SELECT id, name, email, specialty, phone, status, created_at, updated_at
    FROM teachers
"#;

/// Repository for teacher database operations.
#[derive(Debug, Clone)]
pub struct TeacherRepository {
    pool: SqlitePool,
}

impl TeacherRepository {
    /// Creates a new TeacherRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TeacherRepository { pool }
    }

    /// Registers a teacher.
    ///
    /// ## Errors
    /// - `Validation` for name, email, specialty or phone
    /// - `Validation(Duplicate)` when the email is taken
    pub async fn create(&self, input: &NewTeacher) -> DbResult<Teacher> {
        let input = validate_new_teacher(input)?;

        let now = Utc::now();
        let teacher = Teacher {
            id: generate_id(),
            name: input.name,
            email: input.email,
            specialty: input.specialty,
            phone: input.phone,
            status: input.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        debug!(name = %teacher.name, "Creating teacher");

        sqlx::query(
            r#"
            INSERT INTO teachers (id, name, email, specialty, phone, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&teacher.id)
        .bind(&teacher.name)
        .bind(&teacher.email)
        .bind(&teacher.specialty)
        .bind(&teacher.phone)
        .bind(teacher.status)
        .bind(teacher.created_at)
        .bind(teacher.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).or_duplicate("email", &teacher.email))?;

        info!(teacher_id = %teacher.id, "Teacher created");
        Ok(teacher)
    }

    /// Gets a teacher by ID.
    pub async fn get(&self, id: &str) -> DbResult<Teacher> {
        let sql = format!("{TEACHER_SELECT} WHERE id = ?1");
        sqlx::query_as::<_, Teacher>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::TeacherNotFound(id.to_string()).into())
    }

    /// Edits any subset of the teacher's fields.
    pub async fn update(&self, id: &str, input: &TeacherUpdate) -> DbResult<Teacher> {
        let input = validate_teacher_update(input)?;
        let current = self.get(id).await?;

        let phone = match input.phone {
            None => current.phone,
            Some(p) if p.is_empty() => None,
            Some(p) => Some(p),
        };
        let updated = Teacher {
            name: input.name.unwrap_or(current.name),
            email: input.email.unwrap_or(current.email),
            specialty: input.specialty.unwrap_or(current.specialty),
            phone,
            status: input.status.unwrap_or(current.status),
            updated_at: Utc::now(),
            ..current
        };

        debug!(teacher_id = %id, "Updating teacher");

        let result = sqlx::query(
            r#"
            UPDATE teachers
            SET name = ?1, email = ?2, specialty = ?3, phone = ?4, status = ?5, updated_at = ?6
            WHERE id = ?7
            "#,
        )
        .bind(&updated.name)
        .bind(&updated.email)
        .bind(&updated.specialty)
        .bind(&updated.phone)
        .bind(updated.status)
        .bind(updated.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).or_duplicate("email", &updated.email))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::TeacherNotFound(id.to_string()).into());
        }

        Ok(updated)
    }

    /// Removes a teacher from the register.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM teachers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::TeacherNotFound(id.to_string()).into());
        }

        info!(teacher_id = %id, "Teacher deleted");
        Ok(())
    }

    /// All teachers ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Teacher>> {
        let sql = format!("{TEACHER_SELECT} ORDER BY name, id");
        let teachers = sqlx::query_as::<_, Teacher>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(teachers)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teachers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use escola_core::{CoreError, NewTeacher, TeacherStatus, TeacherUpdate, ValidationError};

    use crate::error::DbError;
    use crate::test_support::test_db;

    fn new_teacher(name: &str, email: &str) -> NewTeacher {
        NewTeacher {
            name: name.to_string(),
            email: email.to_string(),
            specialty: "Matemática".to_string(),
            phone: None,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;

        let mut input = new_teacher(" Helena Prado ", "Helena@Escola.com");
        input.phone = Some("(11) 3333-4444".to_string());
        let teacher = db.teachers().create(&input).await.unwrap();

        assert_eq!(teacher.name, "Helena Prado");
        assert_eq!(teacher.email, "helena@escola.com");
        assert_eq!(teacher.status, TeacherStatus::Active);

        let fetched = db.teachers().get(&teacher.id).await.unwrap();
        assert_eq!(fetched.phone.as_deref(), Some("(11) 3333-4444"));
        assert_eq!(fetched.specialty, "Matemática");
    }

    #[tokio::test]
    async fn test_email_required_and_unique() {
        let db = test_db().await;

        let err = db
            .teachers()
            .create(&new_teacher("Helena Prado", "  "))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Required { .. }))
        ));

        db.teachers()
            .create(&new_teacher("Helena Prado", "helena@escola.com"))
            .await
            .unwrap();
        let err = db
            .teachers()
            .create(&new_teacher("Helena Souza", "HELENA@escola.com"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Duplicate { ref value, .. }))
                if value == "helena@escola.com"
        ));
        assert_eq!(db.teachers().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_clears_phone_and_checks_email() {
        let db = test_db().await;
        let mut input = new_teacher("Helena Prado", "helena@escola.com");
        input.phone = Some("11 99999-0000".to_string());
        let helena = db.teachers().create(&input).await.unwrap();
        let rui = db
            .teachers()
            .create(&new_teacher("Rui Barros", "rui@escola.com"))
            .await
            .unwrap();

        let updated = db
            .teachers()
            .update(
                &helena.id,
                &TeacherUpdate {
                    specialty: Some("Física".to_string()),
                    phone: Some(String::new()),
                    status: Some(TeacherStatus::Inactive),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.specialty, "Física");
        assert_eq!(updated.phone, None);
        assert_eq!(updated.email, "helena@escola.com");

        let fetched = db.teachers().get(&helena.id).await.unwrap();
        assert_eq!(fetched.phone, None);
        assert_eq!(fetched.status, TeacherStatus::Inactive);

        let err = db
            .teachers()
            .update(
                &rui.id,
                &TeacherUpdate {
                    email: Some("helena@escola.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));

        let err = db
            .teachers()
            .update("missing", &TeacherUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::TeacherNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let db = test_db().await;
        let rui = db
            .teachers()
            .create(&new_teacher("Rui Barros", "rui@escola.com"))
            .await
            .unwrap();
        db.teachers()
            .create(&new_teacher("Helena Prado", "helena@escola.com"))
            .await
            .unwrap();

        let names: Vec<_> = db
            .teachers()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Helena Prado", "Rui Barros"]);

        db.teachers().delete(&rui.id).await.unwrap();
        assert_eq!(db.teachers().count().await.unwrap(), 1);

        let err = db.teachers().delete(&rui.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::TeacherNotFound(_))));
        let err = db.teachers().get(&rui.id).await.unwrap_err();
        assert_eq!(err.kind(), escola_core::ErrorKind::NotFound);
    }
}
