//! # Capacity Guard
//!
//! The single source of truth for "does this class have a free seat".
//!
//! ```text
//!   pre-flight                          inside the unit of work
//!  ┌──────────────┐                    ┌───────────────────────────┐
//!  │ has_room?    │── no ─► ClassFull   │ re-read occupancy         │
//!  │ (early, may  │                    │ has_room? ── no ─► ClassFull
//!  │  be stale)   │── yes ────────────►│ guarded write, commit     │
//!  └──────────────┘                    └───────────────────────────┘
//! ```
//!
//! Every function here is pure; occupancy is counted by the caller.

use crate::error::{CoreError, CoreResult};
use crate::types::Class;

/// True when one more student fits: `occupancy < capacity`.
#[inline]
pub fn has_room(capacity: i64, occupancy: i64) -> bool {
    occupancy < capacity
}

/// Fails with [`CoreError::ClassFull`] when the class has no free seat.
pub fn ensure_room(class: &Class, occupancy: i64) -> CoreResult<()> {
    if has_room(class.capacity, occupancy) {
        Ok(())
    } else {
        Err(CoreError::ClassFull {
            class_name: class.name.clone(),
            capacity: class.capacity,
        })
    }
}

/// Occupancy as a percentage of capacity, rounded to one decimal.
///
/// Returns `0.0` for a zero capacity instead of dividing by zero.
pub fn occupancy_percent(occupancy: i64, capacity: i64) -> f64 {
    if capacity <= 0 {
        return 0.0;
    }
    let pct = occupancy as f64 / capacity as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// A capacity edit may never drop below the current headcount.
pub fn check_capacity_change(class_id: &str, new_capacity: i64, occupancy: i64) -> CoreResult<()> {
    if new_capacity < occupancy {
        return Err(CoreError::CapacityBelowOccupancy {
            class_id: class_id.to_string(),
            requested: new_capacity,
            occupancy,
        });
    }
    Ok(())
}

/// A class can only be deleted once nobody is enrolled in it.
pub fn check_class_delete(class_id: &str, occupancy: i64) -> CoreResult<()> {
    if occupancy > 0 {
        return Err(CoreError::ClassNotEmpty {
            class_id: class_id.to_string(),
            occupancy,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn class(capacity: i64) -> Class {
        Class {
            id: "c1".to_string(),
            name: "3º Ano A".to_string(),
            capacity,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_has_room_boundary() {
        assert!(has_room(1, 0));
        assert!(!has_room(1, 1));
        assert!(has_room(25, 24));
        assert!(!has_room(25, 25));
    }

    #[test]
    fn test_ensure_room_reports_class() {
        let err = ensure_room(&class(25), 25).unwrap_err();
        match err {
            CoreError::ClassFull {
                class_name,
                capacity,
            } => {
                assert_eq!(class_name, "3º Ano A");
                assert_eq!(capacity, 25);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ensure_room(&class(25), 3).is_ok());
    }

    #[test]
    fn test_occupancy_percent() {
        assert_eq!(occupancy_percent(0, 30), 0.0);
        assert_eq!(occupancy_percent(1, 3), 33.3);
        assert_eq!(occupancy_percent(2, 3), 66.7);
        assert_eq!(occupancy_percent(25, 25), 100.0);
        assert_eq!(occupancy_percent(4, 0), 0.0);
    }

    #[test]
    fn test_check_capacity_change() {
        assert!(check_capacity_change("c1", 10, 10).is_ok());
        assert!(check_capacity_change("c1", 12, 10).is_ok());
        assert!(matches!(
            check_capacity_change("c1", 5, 10),
            Err(CoreError::CapacityBelowOccupancy {
                requested: 5,
                occupancy: 10,
                ..
            })
        ));
    }

    #[test]
    fn test_check_class_delete() {
        assert!(check_class_delete("c1", 0).is_ok());
        assert!(matches!(
            check_class_delete("c1", 2),
            Err(CoreError::ClassNotEmpty { occupancy: 2, .. })
        ));
    }
}
