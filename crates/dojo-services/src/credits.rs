//! Credits service
//!
//! Derives per-student snapshots from the attendance and booking stores and
//! combines them with account state into the final credit balance. Read-only:
//! every query recomputes from history, so repeated calls with unchanged data
//! always agree.

use dojo_core::{
    models::{AvailableCredits, Snapshot, StudentAccount},
    traits::{AccountRepository, AttendanceRepository, BookingRepository},
    AppError, AppResult, Clock,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Credit balance queries
///
/// Exposes the two read entry points of the engine: a single-student
/// balance and the amortized batch variant, which must agree with the
/// single-student results for every id.
pub struct CreditsService<AT, B, AC> {
    attendance: Arc<AT>,
    bookings: Arc<B>,
    accounts: Arc<AC>,
    clock: Arc<dyn Clock>,
}

impl<AT, B, AC> CreditsService<AT, B, AC>
where
    AT: AttendanceRepository,
    B: BookingRepository,
    AC: AccountRepository,
{
    /// Create a new credits service
    pub fn new(
        attendance: Arc<AT>,
        bookings: Arc<B>,
        accounts: Arc<AC>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            attendance,
            bookings,
            accounts,
            clock,
        }
    }

    /// Fresh absence/booking snapshot for one student
    ///
    /// Counts run over the entire history; the absence count stops at
    /// yesterday's end of day so an absence only becomes countable once its
    /// class day has fully elapsed.
    #[instrument(skip(self))]
    pub async fn snapshot(&self, student_id: Uuid) -> AppResult<Snapshot> {
        let cutoff = self.clock.yesterday_end_of_day();

        let absences_count = self
            .attendance
            .count_countable_absences(student_id, cutoff)
            .await?;
        let booked_count = self.bookings.count_active(student_id).await?;
        let adjustment_booked_count = self
            .bookings
            .count_active_with_adjustment(student_id)
            .await?;

        let snapshot = Snapshot::derive(absences_count, booked_count, adjustment_booked_count);

        debug!(
            "Snapshot for {}: absences={}, booked={}, pending={}",
            student_id, snapshot.absences_count, snapshot.booked_count, snapshot.pending_absences
        );

        Ok(snapshot)
    }

    /// Snapshots for many students in two store round-trips
    ///
    /// Every requested id gets an entry; students absent from both stores
    /// map to the zero snapshot.
    #[instrument(skip(self, student_ids))]
    pub async fn snapshot_many(&self, student_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Snapshot>> {
        if student_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let cutoff = self.clock.yesterday_end_of_day();

        let absences = self
            .attendance
            .count_countable_absences_many(student_ids, cutoff)
            .await?;
        let bookings = self.bookings.count_active_many(student_ids).await?;

        let mut map = HashMap::with_capacity(student_ids.len());
        for &id in student_ids {
            let absences_count = absences.get(&id).copied().unwrap_or(0);
            let counts = bookings.get(&id).copied().unwrap_or_default();
            map.insert(
                id,
                Snapshot::derive(absences_count, counts.booked, counts.with_adjustment),
            );
        }

        Ok(map)
    }

    /// Available credits for one student
    #[instrument(skip(self))]
    pub async fn available_credits(&self, student_id: Uuid) -> AppResult<AvailableCredits> {
        let account = self
            .accounts
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| AppError::StudentNotFound(student_id.to_string()))?;

        self.available_credits_for_account(&account).await
    }

    /// Available credits for an already-loaded account
    ///
    /// Frozen and trial accounts skip the snapshot entirely - they can never
    /// use absence-earned credits, so scanning their history is wasted work.
    pub async fn available_credits_for_account(
        &self,
        account: &StudentAccount,
    ) -> AppResult<AvailableCredits> {
        let needs_snapshot = !account.is_frozen() && !account.is_trial;
        let snapshot = if needs_snapshot {
            Some(self.snapshot(account.id).await?)
        } else {
            None
        };

        Ok(AvailableCredits::compute(account, snapshot))
    }

    /// Available credits for many students
    ///
    /// Ids that do not resolve to an account are omitted from the result.
    /// Per-student values are identical to calling `available_credits` for
    /// each id individually.
    #[instrument(skip(self, student_ids))]
    pub async fn available_credits_for_many(
        &self,
        student_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, AvailableCredits>> {
        let accounts = self.accounts.find_by_ids(student_ids).await?;

        let needing_snapshot: Vec<Uuid> = accounts
            .iter()
            .filter(|a| !a.is_frozen() && !a.is_trial)
            .map(|a| a.id)
            .collect();

        let snapshots = self.snapshot_many(&needing_snapshot).await?;

        let mut map = HashMap::with_capacity(accounts.len());
        for account in &accounts {
            let snapshot = snapshots.get(&account.id).copied();
            map.insert(account.id, AvailableCredits::compute(account, snapshot));
        }

        Ok(map)
    }
}
