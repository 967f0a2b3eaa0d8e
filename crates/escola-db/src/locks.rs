//! # Class Locks
//!
//! One async mutex per class id. Every operation that changes a class's
//! headcount or capacity holds its class lock for the whole unit of work,
//! so two enrollments into the same class never interleave their
//! check-then-write.
//!
//! ```text
//!   enroll(s1, C) ──► lock(C) ──► tx: read, check, write, commit ──► unlock
//!   enroll(s2, C) ──► lock(C) ······waits······························► tx ...
//!   enroll(s3, D) ──► lock(D) ──► tx ...   (independent of C)
//! ```
//!
//! Waiting is bounded: after the configured timeout the caller gets
//! [`DbError::LockTimeout`] and nothing has been written.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// Registry of per-class mutexes, shared by every clone of `Database`.
#[derive(Debug, Clone)]
pub struct ClassLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
    timeout: Duration,
}

/// Held for the duration of a unit of work; dropping it releases the class.
pub type ClassGuard = OwnedMutexGuard<()>;

impl ClassLocks {
    pub fn new(timeout: Duration) -> Self {
        ClassLocks {
            locks: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Waits for the lock of `class_id`, at most `timeout`.
    pub async fn acquire(&self, class_id: &str) -> DbResult<ClassGuard> {
        let mutex = self.entry(class_id);

        match tokio::time::timeout(self.timeout, mutex.lock_owned()).await {
            Ok(guard) => {
                debug!(class_id = %class_id, "Class lock acquired");
                Ok(guard)
            }
            Err(_) => {
                warn!(class_id = %class_id, timeout_ms = self.timeout.as_millis() as u64, "Class lock timed out");
                Err(DbError::LockTimeout {
                    class_id: class_id.to_string(),
                    waited_ms: self.timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Drops the registry entry of a deleted class.
    ///
    /// Tasks already holding or waiting on the old mutex keep their `Arc`.
    pub fn forget(&self, class_id: &str) {
        self.registry().remove(class_id);
    }

    fn entry(&self, class_id: &str) -> Arc<AsyncMutex<()>> {
        self.registry()
            .entry(class_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        // The map is only touched in short non-panicking sections.
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ClassLocks {
    fn default() -> Self {
        ClassLocks::new(Duration::from_millis(5000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_class_is_exclusive() {
        let locks = ClassLocks::new(Duration::from_millis(50));

        let guard = locks.acquire("c1").await.unwrap();
        let err = locks.acquire("c1").await.unwrap_err();
        assert!(matches!(err, DbError::LockTimeout { ref class_id, .. } if class_id == "c1"));

        drop(guard);
        assert!(locks.acquire("c1").await.is_ok());
    }

    #[tokio::test]
    async fn test_different_classes_are_independent() {
        let locks = ClassLocks::new(Duration::from_millis(50));

        let _c1 = locks.acquire("c1").await.unwrap();
        assert!(locks.acquire("c2").await.is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_registry() {
        let locks = ClassLocks::new(Duration::from_millis(50));
        let other = locks.clone();

        let _guard = locks.acquire("c1").await.unwrap();
        assert!(other.acquire("c1").await.is_err());
    }
}
