//! # Student Repository
//!
//! Database operations for students (alunos).
//!
//! Students are created and edited here without a class. The `class_id`
//! column is only written by the enrollment engine and by request
//! approval, both of which hold the class lock.
//!
//! ## Listing Filters
//! ```text
//! StudentFilter { search, class_id, status }
//!      │
//!      ├── search   → case-insensitive substring of name or email
//!      ├── class_id → exact match
//!      └── status   → exact match
//!      (absent filters are skipped; results ordered by name)
//! ```

use chrono::Utc;
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::{debug, info};

use escola_core::validation::{validate_new_student, validate_search_query, validate_student_update};
use escola_core::{
    CoreError, NewStudent, Student, StudentFilter, StudentListing, StudentStatus, StudentUpdate,
};

use crate::error::{DbError, DbResult};
use crate::repository::{generate_id, today};

const LISTING_SELECT: &str = r#"
    SELECT
        s.id,
        s.name,
        s.birth_date,
        s.email,
        s.status,
        s.class_id,
        c.name AS class_name,
        s.created_at
    FROM students s
    LEFT JOIN classes c ON c.id = s.class_id
"#;

/// Repository for student database operations.
#[derive(Debug, Clone)]
pub struct StudentRepository {
    pool: SqlitePool,
    default_status: StudentStatus,
}

impl StudentRepository {
    /// Creates a new StudentRepository.
    pub fn new(pool: SqlitePool, default_status: StudentStatus) -> Self {
        StudentRepository {
            pool,
            default_status,
        }
    }

    /// Creates a student without a class.
    ///
    /// ## Errors
    /// - `Validation` for name, birth date or email
    /// - `Validation(Duplicate)` when the email is taken
    pub async fn create(&self, input: &NewStudent) -> DbResult<Student> {
        let input = validate_new_student(input, today())?;

        let now = Utc::now();
        let student = Student {
            id: generate_id(),
            name: input.name,
            birth_date: input.birth_date,
            email: input.email,
            status: input.status.unwrap_or(self.default_status),
            class_id: None,
            created_at: now,
            updated_at: now,
        };

        debug!(name = %student.name, "Creating student");
        insert_student(&self.pool, &student).await?;

        info!(student_id = %student.id, "Student created");
        Ok(student)
    }

    /// Gets a student by ID.
    pub async fn get(&self, id: &str) -> DbResult<Student> {
        fetch_student(&self.pool, id)
            .await?
            .ok_or_else(|| CoreError::StudentNotFound(id.to_string()).into())
    }

    /// Edits name, birth date, email and/or status.
    ///
    /// The class is left alone; use the enrollment engine for that.
    pub async fn update(&self, id: &str, input: &StudentUpdate) -> DbResult<Student> {
        let input = validate_student_update(input, today())?;
        let current = self.get(id).await?;

        let email = match input.email {
            None => current.email,
            Some(e) if e.is_empty() => None,
            Some(e) => Some(e),
        };
        let updated = Student {
            name: input.name.unwrap_or(current.name),
            birth_date: input.birth_date.unwrap_or(current.birth_date),
            email,
            status: input.status.unwrap_or(current.status),
            updated_at: Utc::now(),
            ..current
        };

        debug!(student_id = %id, "Updating student");

        sqlx::query(
            r#"
            UPDATE students
            SET name = ?1, birth_date = ?2, email = ?3, status = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(&updated.name)
        .bind(updated.birth_date)
        .bind(&updated.email)
        .bind(updated.status)
        .bind(updated.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).or_duplicate("email", updated.email.as_deref().unwrap_or("")))?;

        Ok(updated)
    }

    /// Deletes a student. Links cascade away; requests keep their history
    /// with `student_id` cleared.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::StudentNotFound(id.to_string()).into());
        }

        info!(student_id = %id, "Student deleted");
        Ok(())
    }

    /// Lists students matching every present filter, ordered by name.
    ///
    /// Class and status filter in SQL. The search term is matched here with
    /// Unicode lower-casing; `%` and `_` in it are plain characters.
    pub async fn list(&self, filter: &StudentFilter) -> DbResult<Vec<StudentListing>> {
        let search = match filter.search.as_deref() {
            Some(q) => Some(validate_search_query(q)?),
            None => None,
        }
        .filter(|q| !q.is_empty())
        .map(|q| q.to_lowercase());

        debug!(
            search = ?search,
            class_id = ?filter.class_id,
            status = ?filter.status,
            "Listing students"
        );

        let sql = format!(
            r#"{LISTING_SELECT}
            WHERE (?1 IS NULL OR s.class_id = ?1)
              AND (?2 IS NULL OR s.status = ?2)
            ORDER BY s.name, s.id
            "#
        );

        let students = sqlx::query_as::<_, StudentListing>(&sql)
            .bind(filter.class_id.as_deref())
            .bind(filter.status)
            .fetch_all(&self.pool)
            .await?;

        let Some(term) = search else {
            return Ok(students);
        };

        Ok(students
            .into_iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&term)
                    || s.email.as_deref().is_some_and(|e| e.to_lowercase().contains(&term))
            })
            .collect())
    }

    /// Students linked to a principal, ordered by name.
    pub async fn list_linked_to(&self, principal_id: &str) -> DbResult<Vec<StudentListing>> {
        let sql = format!(
            r#"{LISTING_SELECT}
            INNER JOIN student_links l ON l.student_id = s.id
            WHERE l.principal_id = ?1
            ORDER BY s.name, s.id
            "#
        );

        let students = sqlx::query_as::<_, StudentListing>(&sql)
            .bind(principal_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(students)
    }

    /// Counts all students.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM students")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Executor-generic queries (shared with units of work)
// =============================================================================

pub(crate) async fn fetch_student<'e, E>(executor: E, id: &str) -> DbResult<Option<Student>>
where
    E: SqliteExecutor<'e>,
{
    let student = sqlx::query_as::<_, Student>(
        r#"
        SELECT id, name, birth_date, email, status, class_id, created_at, updated_at
        FROM students
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(student)
}

/// Inserts a fully built student row (class included, if any).
pub(crate) async fn insert_student<'e, E>(executor: E, student: &Student) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO students (id, name, birth_date, email, status, class_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&student.id)
    .bind(&student.name)
    .bind(student.birth_date)
    .bind(&student.email)
    .bind(student.status)
    .bind(&student.class_id)
    .bind(student.created_at)
    .bind(student.updated_at)
    .execute(executor)
    .await
    .map_err(|e| DbError::from(e).or_duplicate("email", student.email.as_deref().unwrap_or("")))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use escola_core::{
        CoreError, NewClass, NewStudent, StudentFilter, StudentStatus, StudentUpdate,
        ValidationError,
    };

    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::test_support::{born_years_ago, new_student, test_db};

    #[tokio::test]
    async fn test_create_normalizes_and_defaults() {
        let db = test_db().await;

        let student = db
            .students()
            .create(&NewStudent {
                name: "  Ana Silva ".to_string(),
                birth_date: born_years_ago(16),
                email: Some(" Ana@Escola.COM ".to_string()),
                status: None,
            })
            .await
            .unwrap();

        assert_eq!(student.name, "Ana Silva");
        assert_eq!(student.email.as_deref(), Some("ana@escola.com"));
        assert_eq!(student.status, StudentStatus::Active);
        assert!(student.class_id.is_none());

        let fetched = db.students().get(&student.id).await.unwrap();
        assert_eq!(fetched.birth_date, student.birth_date);
    }

    #[tokio::test]
    async fn test_configured_default_status() {
        let config = DbConfig::in_memory().default_student_status(StudentStatus::Inactive);
        let db = Database::new(config).await.unwrap();

        let student = db.students().create(&new_student("Bruno Santos")).await.unwrap();
        assert_eq!(student.status, StudentStatus::Inactive);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let db = test_db().await;

        let mut too_young = new_student("Carla Costa");
        too_young.birth_date = chrono::Utc::now().date_naive();
        let err = db.students().create(&too_young).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let mut bad_email = new_student("Carla Costa");
        bad_email.email = Some("carla@".to_string());
        assert!(db.students().create(&bad_email).await.is_err());

        assert_eq!(db.students().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let db = test_db().await;

        let mut first = new_student("Diego Oliveira");
        first.email = Some("diego@escola.com".to_string());
        db.students().create(&first).await.unwrap();

        let mut second = new_student("Diego Souza");
        second.email = Some("DIEGO@escola.com".to_string());
        let err = db.students().create(&second).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Duplicate { ref value, .. }))
                if value == "diego@escola.com"
        ));
    }

    #[tokio::test]
    async fn test_update_and_clear_email() {
        let db = test_db().await;
        let mut input = new_student("Elena Lima");
        input.email = Some("elena@escola.com".to_string());
        let student = db.students().create(&input).await.unwrap();

        let updated = db
            .students()
            .update(
                &student.id,
                &StudentUpdate {
                    name: Some("Elena Lima Costa".to_string()),
                    email: Some(String::new()),
                    status: Some(StudentStatus::Inactive),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Elena Lima Costa");
        assert_eq!(updated.email, None);
        assert_eq!(updated.status, StudentStatus::Inactive);

        let fetched = db.students().get(&student.id).await.unwrap();
        assert_eq!(fetched.email, None);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = test_db().await;
        let student = db.students().create(&new_student("Ana Silva")).await.unwrap();

        db.students().delete(&student.id).await.unwrap();

        let err = db.students().delete(&student.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::StudentNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;
        let class = db
            .classes()
            .create(&NewClass {
                name: "1º Ano A".to_string(),
                capacity: 30,
            })
            .await
            .unwrap();

        let ana = db.students().create(&new_student("Ana Silva")).await.unwrap();
        let mut bruno = new_student("Bruno Santos");
        bruno.email = Some("bruno@escola.com".to_string());
        bruno.status = Some(StudentStatus::Inactive);
        db.students().create(&bruno).await.unwrap();

        db.enrollment().enroll(&ana.id, &class.id).await.unwrap();

        let all = db.students().list(&StudentFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Ana Silva");
        assert_eq!(all[0].class_name.as_deref(), Some("1º Ano A"));

        let by_search = db
            .students()
            .list(&StudentFilter {
                search: Some("BRUNO@".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_search.len(), 1);
        assert_eq!(by_search[0].name, "Bruno Santos");

        let by_class = db
            .students()
            .list(&StudentFilter {
                class_id: Some(class.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_class.len(), 1);
        assert_eq!(by_class[0].id, ana.id);

        let inactive = db
            .students()
            .list(&StudentFilter {
                status: Some(StudentStatus::Inactive),
                search: Some("   ".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].name, "Bruno Santos");
    }

    #[tokio::test]
    async fn test_search_folds_unicode_and_keeps_wildcards_literal() {
        let db = test_db().await;

        db.students().create(&new_student("Élodie Martin")).await.unwrap();
        let mut underscore = new_student("Ana Silva");
        underscore.email = Some("ana_silva@escola.com".to_string());
        db.students().create(&underscore).await.unwrap();
        let mut plain = new_student("Ana Souza");
        plain.email = Some("anaxsilva@escola.com".to_string());
        db.students().create(&plain).await.unwrap();

        let search = |term: &str| StudentFilter {
            search: Some(term.to_string()),
            ..Default::default()
        };

        let accented = db.students().list(&search("ÉLODIE")).await.unwrap();
        assert_eq!(accented.len(), 1);
        assert_eq!(accented[0].name, "Élodie Martin");

        let literal = db.students().list(&search("a_s")).await.unwrap();
        assert_eq!(literal.len(), 1);
        assert_eq!(literal[0].name, "Ana Silva");

        assert!(db.students().list(&search("%")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_class_delete_keeps_student() {
        let db = test_db().await;
        let class = db
            .classes()
            .create(&NewClass {
                name: "Temporária".to_string(),
                capacity: 5,
            })
            .await
            .unwrap();
        let student = db.students().create(&new_student("Ana Silva")).await.unwrap();

        // bypass the non-empty guard to exercise ON DELETE SET NULL
        db.enrollment().enroll(&student.id, &class.id).await.unwrap();
        sqlx::query("DELETE FROM classes WHERE id = ?1")
            .bind(&class.id)
            .execute(db.pool())
            .await
            .unwrap();

        let fetched = db.students().get(&student.id).await.unwrap();
        assert!(fetched.class_id.is_none());
    }
}
