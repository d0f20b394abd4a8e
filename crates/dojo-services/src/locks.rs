//! Per-student mutual exclusion
//!
//! Booking creation and overflow reconciliation are read-decide-write
//! sequences over shared per-student state. Two concurrent bookings for the
//! same student could otherwise both observe an available adjustment credit
//! and both consume it. A lock keyed by student id serializes the writers;
//! read paths never take it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

/// Registry of per-student async locks
#[derive(Default)]
pub struct StudentLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl StudentLocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the lock for one student
    ///
    /// The returned mutex is held across the whole read-decide-write
    /// sequence; the registry guard itself is only held for the lookup.
    pub fn for_student(&self, student_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(student_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
