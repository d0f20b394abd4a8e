//! Overflow reconciliation
//!
//! After a plan change the absence pool may exceed the new plan's cap. The
//! reconciler replays the student's absence history in chronological order
//! and tags every absence past the cap as overflow, permanently removing it
//! from the pool. Tags are append-only: reconciliation never untags an
//! absence, so running it twice over unchanged data writes nothing.

use crate::locks::StudentLocks;
use dojo_core::{
    models::{EnrollmentPlan, OverflowReason, OverflowTagUpdate, TagClearance},
    traits::{AccountRepository, AttendanceRepository, BookingRepository},
    AppError, AppResult,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Result of one reconciliation run
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReconcileOutcome {
    /// Absence entries examined
    pub scanned: u64,
    /// Countable absences treated as already consumed by active bookings
    pub skipped_consumed: u64,
    /// Entries newly tagged as overflow
    pub tagged: u64,
    /// Rows the store reported as modified
    pub modified: u64,
}

/// Re-tags overflow absences after plan changes
pub struct OverflowReconciler<AT, B, AC> {
    attendance: Arc<AT>,
    bookings: Arc<B>,
    accounts: Arc<AC>,
    locks: Arc<StudentLocks>,
}

impl<AT, B, AC> OverflowReconciler<AT, B, AC>
where
    AT: AttendanceRepository,
    B: BookingRepository,
    AC: AccountRepository,
{
    /// Create a new reconciler
    pub fn new(
        attendance: Arc<AT>,
        bookings: Arc<B>,
        accounts: Arc<AC>,
        locks: Arc<StudentLocks>,
    ) -> Self {
        Self {
            attendance,
            bookings,
            accounts,
            locks,
        }
    }

    /// Reconcile one student against an explicit plan cap
    ///
    /// Runs under the student's lock. The oldest countable absences, up to
    /// the active booking count, are treated as consumed and keep their
    /// place; of the remainder, the first `max_pending` stay countable and
    /// everything after them is tagged `plan-downgrade`.
    #[instrument(skip(self))]
    pub async fn reconcile_after_plan_change(
        &self,
        student_id: Uuid,
        new_plan: EnrollmentPlan,
    ) -> AppResult<ReconcileOutcome> {
        let lock = self.locks.for_student(student_id);
        let _guard = lock.lock().await;

        self.reconcile_locked(student_id, new_plan.max_pending())
            .await
    }

    /// Reconcile one student against their current plan
    ///
    /// Used by audit sweeps. A missing plan reconciles against the default
    /// cap, matching how the balance computation treats it.
    #[instrument(skip(self))]
    pub async fn reconcile_student(&self, student_id: Uuid) -> AppResult<ReconcileOutcome> {
        let account = self
            .accounts
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| AppError::StudentNotFound(student_id.to_string()))?;

        let lock = self.locks.for_student(student_id);
        let _guard = lock.lock().await;

        self.reconcile_locked(student_id, EnrollmentPlan::max_pending_for(account.enrollment_plan))
            .await
    }

    /// Reconcile every non-deleted student, continuing past per-student errors
    pub async fn reconcile_all(&self) -> AppResult<HashMap<Uuid, AppResult<ReconcileOutcome>>> {
        let ids = self.accounts.list_ids().await?;

        let mut results = HashMap::with_capacity(ids.len());
        for id in ids {
            let outcome = self.reconcile_student(id).await;
            results.insert(id, outcome);
        }

        Ok(results)
    }

    /// Administrative removal of every tag carrying `reason`
    ///
    /// Cleared absences rejoin the pool on the next snapshot; a follow-up
    /// reconciliation may re-tag some of them as `plan-downgrade`.
    #[instrument(skip(self))]
    pub async fn clear_overflow_tags(&self, reason: OverflowReason) -> AppResult<TagClearance> {
        let clearance = self.attendance.clear_overflow_tags(reason).await?;
        info!(
            "Cleared overflow tags: reason={}, matched={}, modified={}",
            reason, clearance.matched, clearance.modified
        );
        Ok(clearance)
    }

    async fn reconcile_locked(
        &self,
        student_id: Uuid,
        max_pending: i64,
    ) -> AppResult<ReconcileOutcome> {
        let booked_count = self.bookings.count_active(student_id).await?;
        let history = self.attendance.find_absence_history(student_id).await?;

        let mut outcome = ReconcileOutcome {
            scanned: history.len() as u64,
            ..Default::default()
        };
        let mut consumed = 0i64;
        let mut countable = 0i64;
        let mut updates = Vec::new();

        for entry in &history {
            // Already-tagged entries keep their tag, whatever the reason.
            if entry.overflow.is_some() {
                continue;
            }
            if consumed < booked_count {
                consumed += 1;
                outcome.skipped_consumed += 1;
                continue;
            }
            if countable < max_pending {
                countable += 1;
                continue;
            }
            updates.push(OverflowTagUpdate {
                record_id: entry.record_id,
                entry_id: entry.entry_id,
                overflow: Some(OverflowReason::PlanDowngrade),
            });
        }

        outcome.tagged = updates.len() as u64;
        if !updates.is_empty() {
            outcome.modified = self.attendance.persist_overflow_tags(&updates).await?;
        }

        info!(
            "Reconciled {}: scanned={}, consumed={}, tagged={}",
            student_id, outcome.scanned, outcome.skipped_consumed, outcome.tagged
        );

        Ok(outcome)
    }
}
