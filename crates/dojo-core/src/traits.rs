//! Repository traits
//!
//! Narrow read/write interfaces over the attendance, booking, and account
//! stores. The engine owns no data: it reads history through these traits
//! and writes only the per-entry overflow tags and the paired booking /
//! adjustment-counter mutations.

use crate::error::AppError;
use crate::models::{
    AbsenceEntry, BookingCounts, BookingRecord, EnrollmentPlan, NewBooking, OverflowReason,
    OverflowTagUpdate, StudentAccount, TagClearance,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use uuid::Uuid;

/// Historical attendance store
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Count countable absences for one student, over the entire history,
    /// for classes dated at or before `cutoff`
    ///
    /// Countable means absent-or-sick, not day-only, not a recovery visit,
    /// not tagged overflow. There is no calendar-year reset: a January
    /// absence from a prior year still counts until consumed or reconciled.
    async fn count_countable_absences(
        &self,
        student_id: Uuid,
        cutoff: NaiveDateTime,
    ) -> Result<i64, AppError>;

    /// Batch variant of `count_countable_absences`
    ///
    /// Must produce identical per-student results to the single-student
    /// call; students with no countable absences may be omitted from the
    /// map (treated as zero).
    async fn count_countable_absences_many(
        &self,
        student_ids: &[Uuid],
        cutoff: NaiveDateTime,
    ) -> Result<HashMap<Uuid, i64>, AppError>;

    /// All countable-or-previously-overflow absence entries for a student,
    /// across the entire history, sorted chronologically ascending
    async fn find_absence_history(&self, student_id: Uuid) -> Result<Vec<AbsenceEntry>, AppError>;

    /// Persist a batch of overflow-tag mutations, returning rows modified
    ///
    /// Implementations must apply the whole batch as one persisted unit so
    /// a partial failure cannot leave a student's history half-tagged.
    async fn persist_overflow_tags(&self, updates: &[OverflowTagUpdate]) -> Result<u64, AppError>;

    /// Administrative removal of overflow tags carrying the given reason
    ///
    /// This is the only path that ever turns an overflow absence back into
    /// a countable one; reconciliation never does.
    async fn clear_overflow_tags(&self, reason: OverflowReason) -> Result<TagClearance, AppError>;
}

/// Recovery booking store
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Active bookings for one student, over the entire history
    async fn count_active(&self, student_id: Uuid) -> Result<i64, AppError>;

    /// Active bookings that consumed a manual adjustment credit
    async fn count_active_with_adjustment(&self, student_id: Uuid) -> Result<i64, AppError>;

    /// Batch booking counts; students without active bookings may be omitted
    async fn count_active_many(
        &self,
        student_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, BookingCounts>, AppError>;

    /// Find a booking by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<BookingRecord>, AppError>;

    /// Create a booking
    ///
    /// When `booking.used_adjustment` is set, the student's
    /// `used_recovery_adjustment_credits` counter must be incremented in the
    /// same persisted unit as the booking row, so the flag and the counter
    /// can never disagree.
    async fn create(&self, booking: &NewBooking) -> Result<BookingRecord, AppError>;

    /// Soft-delete a booking
    ///
    /// When `refund_adjustment` is set, the student's
    /// `used_recovery_adjustment_credits` counter is decremented in the same
    /// persisted unit, restoring the pre-booking adjustment balance. Only an
    /// active booking flips; an already-deleted one is returned unchanged
    /// and never refunded.
    async fn cancel(&self, id: Uuid, refund_adjustment: bool) -> Result<BookingRecord, AppError>;
}

/// Student account store
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Find an account by student id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StudentAccount>, AppError>;

    /// Find accounts for a set of student ids; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<StudentAccount>, AppError>;

    /// Ids of all non-deleted accounts, for maintenance sweeps
    async fn list_ids(&self) -> Result<Vec<Uuid>, AppError>;

    /// Persist the full account state
    async fn save(&self, account: &StudentAccount) -> Result<StudentAccount, AppError>;

    /// Change the enrollment plan (None freezes the account)
    async fn set_plan(
        &self,
        id: Uuid,
        plan: Option<EnrollmentPlan>,
    ) -> Result<StudentAccount, AppError>;

    /// Move the lifetime manual-grant counter by `delta`
    ///
    /// A revocation that would push the net adjustment balance below zero
    /// is rejected atomically with `InsufficientCredits`.
    async fn adjust_recovery_credits(
        &self,
        id: Uuid,
        delta: i32,
    ) -> Result<StudentAccount, AppError>;
}
