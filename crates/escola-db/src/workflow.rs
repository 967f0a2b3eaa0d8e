//! # Enrollment Request Workflow
//!
//! Any principal may file a request to admit a student; an administrator
//! approves or rejects it exactly once.
//!
//! ## Approval Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  approve(admin, request_id, class_id?, response?)                      │
//! │                                                                         │
//! │  role != admin?                         → Forbidden                    │
//! │  pre-flight: request exists & pending   → RequestNotFound /            │
//! │                                           AlreadyResolved              │
//! │  resolve target class:                                                 │
//! │     explicit class_id                                                  │
//! │     else desired_class_name (exact)     → ClassNotFound if unknown     │
//! │     else none                                                          │
//! │  lock(target class)                                                    │
//! │  BEGIN                                                                 │
//! │     re-read request, still pending?                                    │
//! │     INSERT student (active, no class)                                  │
//! │     enroll_in_tx(student, class)        → ClassFull etc. (rollback:    │
//! │                                           no student, still pending)   │
//! │     UPDATE request → approved           (guarded on status='pending')  │
//! │     INSERT guardian link principal → student                           │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use escola_core::enrollment::{
    approval_target, ensure_admin, ensure_pending, response_or_default, ApprovalTarget,
};
use escola_core::validation::validate_request_form;
use escola_core::{
    CoreError, EnrollmentRequest, LinkKind, Principal, RequestForm, RequestStatus, Student,
    StudentStatus, DEFAULT_APPROVAL_RESPONSE, DEFAULT_REJECTION_RESPONSE,
};

use crate::enrollment::enroll_in_tx;
use crate::error::{DbError, DbResult};
use crate::locks::ClassLocks;
use crate::pool::{begin, commit};
use crate::repository::class::fetch_class_by_name;
use crate::repository::link::{build_link, insert_link};
use crate::repository::request::{fetch_request, insert_request, resolve_request, RequestRepository};
use crate::repository::student::insert_student;
use crate::repository::{generate_id, today};

/// Filing, listing and resolving enrollment requests.
#[derive(Debug, Clone)]
pub struct RequestWorkflow {
    pool: SqlitePool,
    locks: ClassLocks,
    repo: RequestRepository,
}

impl RequestWorkflow {
    pub fn new(pool: SqlitePool, locks: ClassLocks) -> Self {
        RequestWorkflow {
            repo: RequestRepository::new(pool.clone()),
            pool,
            locks,
        }
    }

    /// Files a pending request and returns its id.
    ///
    /// Creates no student and touches no class.
    pub async fn file_request(&self, principal: &Principal, form: &RequestForm) -> DbResult<String> {
        let form = validate_request_form(form, today())?;

        let request = EnrollmentRequest {
            id: generate_id(),
            principal_id: principal.id.clone(),
            student_name: form.student_name,
            birth_date: form.birth_date,
            email: form.email,
            notes: form.notes,
            desired_class_name: form.desired_class_name,
            status: RequestStatus::Pending,
            submitted_at: Utc::now(),
            resolved_at: None,
            admin_response: None,
            student_id: None,
        };

        insert_request(&self.pool, &request).await?;

        info!(
            request_id = %request.id,
            principal_id = %principal.id,
            "Enrollment request filed"
        );
        Ok(request.id)
    }

    /// Gets one request.
    pub async fn get_request(&self, id: &str) -> DbResult<EnrollmentRequest> {
        self.repo.get(id).await
    }

    /// Admins see every request; users only their own. Newest first.
    pub async fn list_for(&self, principal: &Principal) -> DbResult<Vec<EnrollmentRequest>> {
        if principal.is_admin() {
            self.repo.list_all().await
        } else {
            self.repo.list_by_principal(&principal.id).await
        }
    }

    /// Number of requests waiting for an admin.
    pub async fn pending_count(&self) -> DbResult<i64> {
        self.repo.count_pending().await
    }

    /// Approves a pending request: creates the student, optionally enrolls
    /// them, links them to the requester. All or nothing.
    ///
    /// ## Errors
    /// - `Forbidden` for non-admins
    /// - `RequestNotFound`, `AlreadyResolved`
    /// - `ClassNotFound`, `ClassFull` from the enrollment step
    /// - `Validation(Duplicate)` when the email now belongs to a student
    pub async fn approve(
        &self,
        principal: &Principal,
        request_id: &str,
        class_id: Option<&str>,
        response: Option<&str>,
    ) -> DbResult<EnrollmentRequest> {
        ensure_admin(principal, "approving a request")?;

        let request = self.pending_request(&self.pool, request_id).await?;
        let target_class = match approval_target(&request, class_id) {
            ApprovalTarget::ClassId(id) => Some(id),
            ApprovalTarget::ClassName(name) => match fetch_class_by_name(&self.pool, &name).await? {
                Some(class) => Some(class.id),
                None => {
                    warn!(request_id = %request_id, class_name = %name, "Desired class does not exist");
                    return Err(CoreError::ClassNotFound(name).into());
                }
            },
            ApprovalTarget::NoClass => None,
        };

        debug!(request_id = %request_id, class_id = ?target_class, "Approving request");

        let _guard = match &target_class {
            Some(id) => Some(self.locks.acquire(id).await?),
            None => None,
        };
        let mut tx = begin(&self.pool).await?;

        let request = self.pending_request(&mut *tx, request_id).await?;

        let now = Utc::now();
        let student = Student {
            id: generate_id(),
            name: request.student_name.clone(),
            birth_date: request.birth_date,
            email: request.email.clone(),
            status: StudentStatus::Active,
            class_id: None,
            created_at: now,
            updated_at: now,
        };
        insert_student(&mut *tx, &student).await?;

        if let Some(class_id) = &target_class {
            if let Err(err) = enroll_in_tx(&mut *tx, &student.id, class_id).await {
                warn!(request_id = %request_id, class_id = %class_id, error = %err, "Approval refused");
                return Err(err);
            }
        }

        let response = response_or_default(response, DEFAULT_APPROVAL_RESPONSE);
        let resolved = resolve_request(
            &mut *tx,
            request_id,
            RequestStatus::Approved,
            now,
            &response,
            Some(student.id.as_str()),
        )
        .await?;
        if !resolved {
            return Err(already_resolved(&mut *tx, request_id).await);
        }

        insert_link(&mut *tx, &build_link(&request.principal_id, &student.id, LinkKind::Guardian))
            .await?;

        commit(tx).await?;

        info!(
            request_id = %request_id,
            student_id = %student.id,
            class_id = ?target_class,
            "Enrollment request approved"
        );

        Ok(EnrollmentRequest {
            status: RequestStatus::Approved,
            resolved_at: Some(now),
            admin_response: Some(response),
            student_id: Some(student.id),
            ..request
        })
    }

    /// Rejects a pending request. Creates nothing.
    pub async fn reject(
        &self,
        principal: &Principal,
        request_id: &str,
        response: Option<&str>,
    ) -> DbResult<EnrollmentRequest> {
        ensure_admin(principal, "rejecting a request")?;

        let request = self.pending_request(&self.pool, request_id).await?;
        let response = response_or_default(response, DEFAULT_REJECTION_RESPONSE);
        let now = Utc::now();

        let resolved = resolve_request(
            &self.pool,
            request_id,
            RequestStatus::Rejected,
            now,
            &response,
            None,
        )
        .await?;
        if !resolved {
            return Err(already_resolved(&self.pool, request_id).await);
        }

        info!(request_id = %request_id, "Enrollment request rejected");

        Ok(EnrollmentRequest {
            status: RequestStatus::Rejected,
            resolved_at: Some(now),
            admin_response: Some(response),
            ..request
        })
    }

    async fn pending_request<'e, E>(&self, executor: E, request_id: &str) -> DbResult<EnrollmentRequest>
    where
        E: sqlx::SqliteExecutor<'e>,
    {
        let request = fetch_request(executor, request_id)
            .await?
            .ok_or_else(|| CoreError::RequestNotFound(request_id.to_string()))?;

        if let Err(err) = ensure_pending(&request) {
            warn!(request_id = %request_id, status = ?request.status, "Request already resolved");
            return Err(err.into());
        }
        Ok(request)
    }
}

/// Builds the error for a guarded resolve that matched no pending row.
async fn already_resolved<'e, E>(executor: E, request_id: &str) -> DbError
where
    E: sqlx::SqliteExecutor<'e>,
{
    match fetch_request(executor, request_id).await {
        Ok(Some(request)) => CoreError::AlreadyResolved {
            request_id: request_id.to_string(),
            status: request.status.as_str().to_string(),
        }
        .into(),
        Ok(None) => CoreError::RequestNotFound(request_id.to_string()).into(),
        Err(err) => err,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use escola_core::{
        CoreError, LinkKind, NewClass, Principal, RequestForm, RequestStatus, StudentFilter,
        StudentStatus, ValidationError,
    };

    use crate::error::DbError;
    use crate::pool::Database;
    use crate::test_support::{born_years_ago, enrolled_students, test_db};

    fn form(name: &str, desired: Option<&str>) -> RequestForm {
        RequestForm {
            student_name: name.to_string(),
            birth_date: born_years_ago(15),
            email: None,
            notes: Some("  transferred from another school ".to_string()),
            desired_class_name: desired.map(str::to_string),
        }
    }

    async fn class(db: &Database, name: &str, capacity: i64) -> String {
        db.classes()
            .create(&NewClass {
                name: name.to_string(),
                capacity,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_file_request_creates_nothing_else() {
        let db = test_db().await;
        let user = Principal::user("user-1");

        let id = db
            .requests()
            .file_request(&user, &form("Maria Souza", Some("  ")))
            .await
            .unwrap();

        let request = db.requests().get_request(&id).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.principal_id, "user-1");
        assert_eq!(request.notes.as_deref(), Some("transferred from another school"));
        assert_eq!(request.desired_class_name, None);
        assert_eq!(db.students().count().await.unwrap(), 0);
        assert_eq!(db.requests().pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_file_request_validates_like_a_student() {
        let db = test_db().await;
        let mut bad = form("M4ria", None);
        bad.email = Some("not-an-email".to_string());

        let err = db
            .requests()
            .file_request(&Principal::user("u"), &bad)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::InvalidFormat { .. }))
        ));
    }

    #[tokio::test]
    async fn test_only_admins_resolve() {
        let db = test_db().await;
        let user = Principal::user("user-1");
        let id = db.requests().file_request(&user, &form("Maria Souza", None)).await.unwrap();

        let err = db.requests().approve(&user, &id, None, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden(_))));

        let err = db.requests().reject(&user, &id, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Forbidden(_))));

        let request = db.requests().get_request(&id).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_scenario_approve_into_desired_class() {
        let db = test_db().await;
        let admin = Principal::admin("admin-1");
        let user = Principal::user("user-1");

        let class_id = class(&db, "2º Ano A", 28).await;
        enrolled_students(&db, &class_id, 27).await;
        let before = db.roster().class_occupancy(&class_id).await.unwrap();
        assert_eq!(before.available, 1);

        let id = db
            .requests()
            .file_request(&user, &form("Maria Souza", Some("2º Ano A")))
            .await
            .unwrap();

        let approved = db.requests().approve(&admin, &id, None, None).await.unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.admin_response.as_deref(), Some("Request approved"));
        assert!(approved.resolved_at.is_some());

        let student_id = approved.student_id.clone().unwrap();
        let student = db.students().get(&student_id).await.unwrap();
        assert_eq!(student.name, "Maria Souza");
        assert_eq!(student.status, StudentStatus::Active);
        assert_eq!(student.class_id.as_deref(), Some(class_id.as_str()));

        let after = db.roster().class_occupancy(&class_id).await.unwrap();
        assert_eq!(after.available, 0);
        assert_eq!(after.occupancy, 28);

        // requester can now see the student through the guardian link
        let links = db.links().list_for_principal("user-1").await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].kind, LinkKind::Guardian);
        assert_eq!(links[0].student_id, student_id);

        let stored = db.requests().get_request(&id).await.unwrap();
        assert_eq!(stored.student_id.as_deref(), Some(student_id.as_str()));
    }

    #[tokio::test]
    async fn test_second_approval_creates_nothing() {
        let db = test_db().await;
        let admin = Principal::admin("admin-1");
        let id = db
            .requests()
            .file_request(&Principal::user("user-1"), &form("Maria Souza", None))
            .await
            .unwrap();

        let approved = db
            .requests()
            .approve(&admin, &id, None, Some("Welcome"))
            .await
            .unwrap();
        assert_eq!(approved.admin_response.as_deref(), Some("Welcome"));
        assert_eq!(db.students().count().await.unwrap(), 1);

        let err = db.requests().approve(&admin, &id, None, None).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AlreadyResolved { ref status, .. }) if status == "approved"
        ));
        assert_eq!(db.students().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_enrollment_rolls_back_approval() {
        let db = test_db().await;
        let admin = Principal::admin("admin-1");
        let class_id = class(&db, "Cheia", 1).await;
        enrolled_students(&db, &class_id, 1).await;

        let id = db
            .requests()
            .file_request(&Principal::user("user-1"), &form("Maria Souza", None))
            .await
            .unwrap();

        let err = db
            .requests()
            .approve(&admin, &id, Some(class_id.as_str()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ClassFull { .. })));

        let err = db
            .requests()
            .approve(&admin, &id, Some("missing-class"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ClassNotFound(_))));

        // only the pre-enrolled student exists; request still pending, no link
        assert_eq!(db.students().count().await.unwrap(), 1);
        let request = db.requests().get_request(&id).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert!(request.student_id.is_none());
        assert!(db.links().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_desired_class_name() {
        let db = test_db().await;
        let id = db
            .requests()
            .file_request(&Principal::user("user-1"), &form("Maria Souza", Some("9º Ano Z")))
            .await
            .unwrap();

        let err = db
            .requests()
            .approve(&Principal::admin("a"), &id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ClassNotFound(ref name)) if name == "9º Ano Z"));
        assert_eq!(db.students().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_explicit_class_overrides_desired() {
        let db = test_db().await;
        class(&db, "1º Ano A", 30).await;
        let other = class(&db, "1º Ano B", 30).await;
        let id = db
            .requests()
            .file_request(&Principal::user("user-1"), &form("Maria Souza", Some("1º Ano A")))
            .await
            .unwrap();

        let approved = db
            .requests()
            .approve(&Principal::admin("a"), &id, Some(other.as_str()), None)
            .await
            .unwrap();

        let listing = db
            .students()
            .list(&StudentFilter {
                class_id: Some(other.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(Some(listing[0].id.clone()), approved.student_id);
    }

    #[tokio::test]
    async fn test_reject_is_final() {
        let db = test_db().await;
        let admin = Principal::admin("admin-1");
        let id = db
            .requests()
            .file_request(&Principal::user("user-1"), &form("Maria Souza", None))
            .await
            .unwrap();

        let rejected = db.requests().reject(&admin, &id, Some("   ")).await.unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.admin_response.as_deref(), Some("Request rejected"));

        let err = db.requests().reject(&admin, &id, Some("again")).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::AlreadyResolved { .. })));

        let err = db.requests().approve(&admin, &id, None, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::AlreadyResolved { .. })));

        let stored = db.requests().get_request(&id).await.unwrap();
        assert_eq!(stored.admin_response.as_deref(), Some("Request rejected"));
        assert_eq!(db.students().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reject_after_approval_changes_nothing() {
        let db = test_db().await;
        let admin = Principal::admin("admin-1");
        let id = db
            .requests()
            .file_request(&Principal::user("user-1"), &form("Maria Souza", None))
            .await
            .unwrap();

        let approved = db.requests().approve(&admin, &id, None, None).await.unwrap();
        assert_eq!(approved.admin_response.as_deref(), Some("Request approved"));

        let err = db
            .requests()
            .reject(&admin, &id, Some("Changed my mind"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AlreadyResolved { ref status, .. }) if status == "approved"
        ));

        let stored = db.requests().get_request(&id).await.unwrap();
        assert_eq!(stored.status, RequestStatus::Approved);
        assert_eq!(stored.admin_response.as_deref(), Some("Request approved"));
        assert_eq!(stored.student_id, approved.student_id);
        assert_eq!(db.students().count().await.unwrap(), 1);
        assert_eq!(db.links().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_request() {
        let db = test_db().await;
        let err = db
            .requests()
            .reject(&Principal::admin("a"), "nope", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::RequestNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_for_scopes_by_role() {
        let db = test_db().await;
        let alice = Principal::user("alice");
        let bob = Principal::user("bob");

        let first = db.requests().file_request(&alice, &form("Ana Silva", None)).await.unwrap();
        db.requests().file_request(&bob, &form("Bruno Santos", None)).await.unwrap();
        let third = db.requests().file_request(&alice, &form("Carla Costa", None)).await.unwrap();

        let mine = db.requests().list_for(&alice).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, third);
        assert_eq!(mine[1].id, first);

        let all = db.requests().list_for(&Principal::admin("a")).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
