//! End-to-end engine tests over in-memory stores
//!
//! Exercises the full path from attendance history to credit balances,
//! through the booking consumption protocol, and across plan-change
//! reconciliation, without a database.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use dojo_core::clock::DEFAULT_TIMEZONE;
use dojo_core::models::{
    AbsenceEntry, AttendanceEntry, AttendanceStatus, BookingCounts, BookingRecord, BookingStatus,
    EnrollmentPlan, NewBooking, OverflowReason, OverflowTagUpdate, StudentAccount, TagClearance,
};
use dojo_core::traits::{AccountRepository, AttendanceRepository, BookingRepository};
use dojo_core::{AppError, FixedClock};
use dojo_services::{
    BookingManager, BookingRequest, CreditsService, OverflowReconciler, StudentLocks,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Default)]
struct MemAttendance {
    entries: Mutex<Vec<AttendanceEntry>>,
}

#[async_trait]
impl AttendanceRepository for MemAttendance {
    async fn count_countable_absences(
        &self,
        student_id: Uuid,
        cutoff: NaiveDateTime,
    ) -> Result<i64, AppError> {
        Ok(self
            .entries
            .lock()
            .iter()
            .filter(|e| {
                e.student_id == student_id && e.class_date <= cutoff && e.is_countable_absence()
            })
            .count() as i64)
    }

    async fn count_countable_absences_many(
        &self,
        student_ids: &[Uuid],
        cutoff: NaiveDateTime,
    ) -> Result<HashMap<Uuid, i64>, AppError> {
        let mut map = HashMap::new();
        for &id in student_ids {
            map.insert(id, self.count_countable_absences(id, cutoff).await?);
        }
        Ok(map)
    }

    async fn find_absence_history(&self, student_id: Uuid) -> Result<Vec<AbsenceEntry>, AppError> {
        let mut items: Vec<AbsenceEntry> = self
            .entries
            .lock()
            .iter()
            .filter(|e| {
                e.student_id == student_id
                    && e.status.is_absence()
                    && !e.day_only
                    && !e.recovery
            })
            .map(|e| AbsenceEntry {
                record_id: e.record_id,
                entry_id: e.id,
                class_date: e.class_date,
                overflow: e.overflow,
            })
            .collect();
        items.sort_by_key(|e| e.class_date);
        Ok(items)
    }

    async fn persist_overflow_tags(&self, updates: &[OverflowTagUpdate]) -> Result<u64, AppError> {
        let mut entries = self.entries.lock();
        let mut modified = 0;
        for update in updates {
            for entry in entries.iter_mut() {
                if entry.id == update.entry_id && entry.overflow != update.overflow {
                    entry.overflow = update.overflow;
                    modified += 1;
                }
            }
        }
        Ok(modified)
    }

    async fn clear_overflow_tags(&self, reason: OverflowReason) -> Result<TagClearance, AppError> {
        let mut entries = self.entries.lock();
        let mut clearance = TagClearance::default();
        for entry in entries.iter_mut() {
            if entry.overflow == Some(reason) {
                clearance.matched += 1;
                entry.overflow = None;
                clearance.modified += 1;
            }
        }
        Ok(clearance)
    }
}

#[derive(Default)]
struct MemAccounts {
    accounts: Mutex<HashMap<Uuid, StudentAccount>>,
}

#[async_trait]
impl AccountRepository for MemAccounts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StudentAccount>, AppError> {
        Ok(self.accounts.lock().get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<StudentAccount>, AppError> {
        let accounts = self.accounts.lock();
        Ok(ids.iter().filter_map(|id| accounts.get(id).cloned()).collect())
    }

    async fn list_ids(&self) -> Result<Vec<Uuid>, AppError> {
        Ok(self.accounts.lock().keys().copied().collect())
    }

    async fn save(&self, account: &StudentAccount) -> Result<StudentAccount, AppError> {
        self.accounts.lock().insert(account.id, account.clone());
        Ok(account.clone())
    }

    async fn set_plan(
        &self,
        id: Uuid,
        plan: Option<EnrollmentPlan>,
    ) -> Result<StudentAccount, AppError> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| AppError::StudentNotFound(id.to_string()))?;
        account.enrollment_plan = plan;
        Ok(account.clone())
    }

    async fn adjust_recovery_credits(
        &self,
        id: Uuid,
        delta: i32,
    ) -> Result<StudentAccount, AppError> {
        let mut accounts = self.accounts.lock();
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| AppError::StudentNotFound(id.to_string()))?;
        if account.adjustment_net() + i64::from(delta) < 0 {
            return Err(AppError::InsufficientCredits {
                available: account.adjustment_net(),
            });
        }
        account.recovery_credits_adjustment += delta;
        Ok(account.clone())
    }
}

struct MemBookings {
    bookings: Mutex<Vec<BookingRecord>>,
    accounts: Arc<MemAccounts>,
}

impl MemBookings {
    fn new(accounts: Arc<MemAccounts>) -> Self {
        Self {
            bookings: Mutex::new(Vec::new()),
            accounts,
        }
    }

    fn bump_used_counter(&self, student_id: Uuid, delta: i32) {
        if let Some(account) = self.accounts.accounts.lock().get_mut(&student_id) {
            account.used_recovery_adjustment_credits += delta;
        }
    }
}

#[async_trait]
impl BookingRepository for MemBookings {
    async fn count_active(&self, student_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .bookings
            .lock()
            .iter()
            .filter(|b| b.student_id == student_id && b.is_active())
            .count() as i64)
    }

    async fn count_active_with_adjustment(&self, student_id: Uuid) -> Result<i64, AppError> {
        Ok(self
            .bookings
            .lock()
            .iter()
            .filter(|b| b.student_id == student_id && b.is_active() && b.used_adjustment)
            .count() as i64)
    }

    async fn count_active_many(
        &self,
        student_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, BookingCounts>, AppError> {
        let mut map = HashMap::new();
        for &id in student_ids {
            map.insert(
                id,
                BookingCounts {
                    booked: self.count_active(id).await?,
                    with_adjustment: self.count_active_with_adjustment(id).await?,
                },
            );
        }
        Ok(map)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<BookingRecord>, AppError> {
        Ok(self.bookings.lock().iter().find(|b| b.id == id).cloned())
    }

    async fn create(&self, booking: &NewBooking) -> Result<BookingRecord, AppError> {
        let record = BookingRecord {
            id: Uuid::new_v4(),
            student_id: booking.student_id,
            class_id: booking.class_id,
            class_date: booking.class_date,
            status: BookingStatus::Active,
            used_adjustment: booking.used_adjustment,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.bookings.lock().push(record.clone());
        if booking.used_adjustment {
            self.bump_used_counter(booking.student_id, 1);
        }
        Ok(record)
    }

    async fn cancel(&self, id: Uuid, refund_adjustment: bool) -> Result<BookingRecord, AppError> {
        let (cancelled, flipped) = {
            let mut bookings = self.bookings.lock();
            let booking = bookings
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;
            let flipped = booking.is_active();
            if flipped {
                booking.status = BookingStatus::Deleted;
                booking.updated_at = Utc::now();
            }
            (booking.clone(), flipped)
        };
        if refund_adjustment && flipped {
            self.bump_used_counter(cancelled.student_id, -1);
        }
        Ok(cancelled)
    }
}

struct Harness {
    attendance: Arc<MemAttendance>,
    accounts: Arc<MemAccounts>,
    locks: Arc<StudentLocks>,
    credits: Arc<CreditsService<MemAttendance, MemBookings, MemAccounts>>,
    manager: Arc<BookingManager<MemAttendance, MemBookings, MemAccounts>>,
    reconciler: OverflowReconciler<MemAttendance, MemBookings, MemAccounts>,
}

/// Clock pinned to 2025-09-15 10:00 school time; cutoff is the end of 09-14.
fn harness() -> Harness {
    let attendance = Arc::new(MemAttendance::default());
    let accounts = Arc::new(MemAccounts::default());
    let bookings = Arc::new(MemBookings::new(accounts.clone()));
    let clock = Arc::new(FixedClock::at_civil(DEFAULT_TIMEZONE, civil(2025, 9, 15, 10)));
    let locks = Arc::new(StudentLocks::new());

    let credits = Arc::new(CreditsService::new(
        attendance.clone(),
        bookings.clone(),
        accounts.clone(),
        clock,
    ));
    let manager = Arc::new(BookingManager::new(
        credits.clone(),
        bookings.clone(),
        accounts.clone(),
        locks.clone(),
    ));
    let reconciler = OverflowReconciler::new(
        attendance.clone(),
        bookings,
        accounts.clone(),
        locks.clone(),
    );

    Harness {
        attendance,
        accounts,
        locks,
        credits,
        manager,
        reconciler,
    }
}

fn civil(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

async fn add_student(h: &Harness, plan: Option<EnrollmentPlan>) -> Uuid {
    let account = StudentAccount {
        enrollment_plan: plan,
        ..Default::default()
    };
    let id = account.id;
    h.accounts.save(&account).await.unwrap();
    id
}

fn add_absence(h: &Harness, student_id: Uuid, class_date: NaiveDateTime) -> Uuid {
    let entry = AttendanceEntry {
        id: Uuid::new_v4(),
        record_id: Uuid::new_v4(),
        student_id,
        class_date,
        status: AttendanceStatus::Absent,
        day_only: false,
        recovery: false,
        overflow: None,
    };
    let id = entry.id;
    h.attendance.entries.lock().push(entry);
    id
}

fn request(class_date: NaiveDateTime) -> BookingRequest {
    BookingRequest {
        class_id: Uuid::new_v4(),
        class_date,
    }
}

#[tokio::test]
async fn test_absences_earn_credits_up_to_plan_cap() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Optimum)).await;
    for day in 1..=5 {
        add_absence(&h, student, civil(2025, 9, day, 18));
    }

    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.absences_count, 5);
    assert_eq!(credits.pending_absences, 5);
    assert_eq!(credits.credits_from_absences, 4);
    assert_eq!(credits.total_credits, 4);
}

#[tokio::test]
async fn test_todays_absence_not_yet_countable() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Optimum)).await;
    add_absence(&h, student, civil(2025, 9, 14, 18));
    add_absence(&h, student, civil(2025, 9, 15, 9));

    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.absences_count, 1);
    assert_eq!(credits.total_credits, 1);
}

#[tokio::test]
async fn test_prior_year_absence_still_counts() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Basic)).await;
    add_absence(&h, student, civil(2024, 11, 20, 18));

    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.absences_count, 1);
    assert_eq!(credits.total_credits, 1);
}

#[tokio::test]
async fn test_booking_consumes_absence_credit() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Optimum)).await;
    add_absence(&h, student, civil(2025, 9, 1, 18));
    add_absence(&h, student, civil(2025, 9, 2, 18));

    let booking = h
        .manager
        .apply_booking(student, &request(civil(2025, 9, 20, 18)))
        .await
        .unwrap();
    assert!(!booking.used_adjustment);

    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.consumed_absences, 1);
    assert_eq!(credits.pending_absences, 1);
    assert_eq!(credits.total_credits, 1);
}

#[tokio::test]
async fn test_adjustment_spends_before_absence_pool() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Optimum)).await;
    add_absence(&h, student, civil(2025, 9, 1, 18));
    h.accounts.adjust_recovery_credits(student, 1).await.unwrap();

    let first = h
        .manager
        .apply_booking(student, &request(civil(2025, 9, 20, 18)))
        .await
        .unwrap();
    assert!(first.used_adjustment);

    // Adjustment-backed bookings leave the absence pool untouched.
    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.adjustment, 0);
    assert_eq!(credits.pending_absences, 1);
    assert_eq!(credits.total_credits, 1);

    // With the adjustment gone, the next booking draws from the pool.
    let second = h
        .manager
        .apply_booking(student, &request(civil(2025, 9, 21, 18)))
        .await
        .unwrap();
    assert!(!second.used_adjustment);

    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.total_credits, 0);
}

#[tokio::test]
async fn test_booking_without_credits_rejected() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Optimum)).await;

    let err = h
        .manager
        .apply_booking(student, &request(civil(2025, 9, 20, 18)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientCredits { available: 0 }));
}

#[tokio::test]
async fn test_frozen_account_cannot_book_even_with_adjustment() {
    let h = harness();
    let student = add_student(&h, None).await;
    h.accounts.adjust_recovery_credits(student, 2).await.unwrap();

    let err = h
        .manager
        .apply_booking(student, &request(civil(2025, 9, 20, 18)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountFrozen(_)));
}

#[tokio::test]
async fn test_trial_account_reports_zero() {
    let h = harness();
    let account = StudentAccount {
        is_trial: true,
        ..Default::default()
    };
    let student = account.id;
    h.accounts.save(&account).await.unwrap();
    add_absence(&h, student, civil(2025, 9, 1, 18));

    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.absences_count, 0);
    assert_eq!(credits.total_credits, 0);
}

#[tokio::test]
async fn test_cancel_refunds_adjustment_credit() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Optimum)).await;
    h.accounts.adjust_recovery_credits(student, 1).await.unwrap();

    let booking = h
        .manager
        .apply_booking(student, &request(civil(2025, 9, 20, 18)))
        .await
        .unwrap();
    assert!(booking.used_adjustment);

    h.manager.cancel_booking(booking.id).await.unwrap();

    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.adjustment, 1);
    assert_eq!(credits.total_credits, 1);

    // A second cancellation is a no-op and must not refund twice.
    let again = h.manager.cancel_booking(booking.id).await.unwrap();
    assert_eq!(again.status, BookingStatus::Deleted);
    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.adjustment, 1);
}

#[tokio::test]
async fn test_racing_cancels_refund_once() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Optimum)).await;
    h.accounts.adjust_recovery_credits(student, 1).await.unwrap();

    let booking = h
        .manager
        .apply_booking(student, &request(civil(2025, 9, 20, 18)))
        .await
        .unwrap();
    assert!(booking.used_adjustment);
    let booking_id = booking.id;

    // Hold the student's lock so both cancels read the booking as active
    // and queue behind it before either one commits.
    let lock = h.locks.for_student(student);
    let guard = lock.lock().await;

    let first = tokio::spawn({
        let manager = h.manager.clone();
        async move { manager.cancel_booking(booking_id).await }
    });
    let second = tokio::spawn({
        let manager = h.manager.clone();
        async move { manager.cancel_booking(booking_id).await }
    });
    tokio::task::yield_now().await;
    drop(guard);

    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());

    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.adjustment, 1);
    assert_eq!(credits.booked_count, 0);
}

#[tokio::test]
async fn test_revoking_more_than_available_rejected() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Optimum)).await;
    h.accounts.adjust_recovery_credits(student, 2).await.unwrap();

    let err = h
        .accounts
        .adjust_recovery_credits(student, -3)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientCredits { available: 2 }));

    // The rejected revocation must not move the counter.
    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.adjustment_total, 2);

    h.accounts.adjust_recovery_credits(student, -2).await.unwrap();
    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.adjustment, 0);
}

#[tokio::test]
async fn test_cancel_restores_absence_pool() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Optimum)).await;
    add_absence(&h, student, civil(2025, 9, 1, 18));

    let booking = h
        .manager
        .apply_booking(student, &request(civil(2025, 9, 20, 18)))
        .await
        .unwrap();
    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.total_credits, 0);

    h.manager.cancel_booking(booking.id).await.unwrap();
    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.pending_absences, 1);
    assert_eq!(credits.total_credits, 1);
}

#[tokio::test]
async fn test_cancel_unknown_booking_fails() {
    let h = harness();
    let err = h.manager.cancel_booking(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::BookingNotFound(_)));
}

#[tokio::test]
async fn test_downgrade_tags_excess_absences() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Plus)).await;
    let mut entry_ids = Vec::new();
    for day in 1..=6 {
        entry_ids.push(add_absence(&h, student, civil(2025, 9, day, 18)));
    }

    h.accounts
        .set_plan(student, Some(EnrollmentPlan::Basic))
        .await
        .unwrap();
    let outcome = h
        .reconciler
        .reconcile_after_plan_change(student, EnrollmentPlan::Basic)
        .await
        .unwrap();
    assert_eq!(outcome.scanned, 6);
    assert_eq!(outcome.tagged, 4);
    assert_eq!(outcome.modified, 4);

    // The two oldest stay countable; the rest carry the downgrade tag.
    let entries = h.attendance.entries.lock().clone();
    for (i, id) in entry_ids.iter().enumerate() {
        let entry = entries.iter().find(|e| e.id == *id).unwrap();
        if i < 2 {
            assert_eq!(entry.overflow, None);
        } else {
            assert_eq!(entry.overflow, Some(OverflowReason::PlanDowngrade));
        }
    }

    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.absences_count, 2);
    assert_eq!(credits.total_credits, 2);
}

#[tokio::test]
async fn test_reconciliation_is_idempotent() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Basic)).await;
    for day in 1..=5 {
        add_absence(&h, student, civil(2025, 9, day, 18));
    }

    let first = h
        .reconciler
        .reconcile_after_plan_change(student, EnrollmentPlan::Basic)
        .await
        .unwrap();
    assert_eq!(first.tagged, 3);

    let second = h
        .reconciler
        .reconcile_after_plan_change(student, EnrollmentPlan::Basic)
        .await
        .unwrap();
    assert_eq!(second.tagged, 0);
    assert_eq!(second.modified, 0);
}

#[tokio::test]
async fn test_reconciliation_skips_booked_consumed_absences() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Optimum)).await;
    for day in 1..=4 {
        add_absence(&h, student, civil(2025, 9, day, 18));
    }
    h.manager
        .apply_booking(student, &request(civil(2025, 9, 20, 18)))
        .await
        .unwrap();

    // One absence is consumed by the booking; with a Basic cap of 2, only
    // the fourth absence overflows.
    let outcome = h
        .reconciler
        .reconcile_after_plan_change(student, EnrollmentPlan::Basic)
        .await
        .unwrap();
    assert_eq!(outcome.skipped_consumed, 1);
    assert_eq!(outcome.tagged, 1);
}

#[tokio::test]
async fn test_upgrade_does_not_untag() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Basic)).await;
    for day in 1..=4 {
        add_absence(&h, student, civil(2025, 9, day, 18));
    }

    h.reconciler
        .reconcile_after_plan_change(student, EnrollmentPlan::Basic)
        .await
        .unwrap();

    // Moving to a bigger plan never restores tagged absences.
    let outcome = h
        .reconciler
        .reconcile_after_plan_change(student, EnrollmentPlan::Advanced)
        .await
        .unwrap();
    assert_eq!(outcome.tagged, 0);

    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.absences_count, 2);
}

#[tokio::test]
async fn test_clear_overflow_tags_restores_pool() {
    let h = harness();
    let student = add_student(&h, Some(EnrollmentPlan::Basic)).await;
    for day in 1..=4 {
        add_absence(&h, student, civil(2025, 9, day, 18));
    }
    h.reconciler
        .reconcile_after_plan_change(student, EnrollmentPlan::Basic)
        .await
        .unwrap();

    let clearance = h
        .reconciler
        .clear_overflow_tags(OverflowReason::PlanDowngrade)
        .await
        .unwrap();
    assert_eq!(clearance.matched, 2);
    assert_eq!(clearance.modified, 2);

    let credits = h.credits.available_credits(student).await.unwrap();
    assert_eq!(credits.absences_count, 4);
}

#[tokio::test]
async fn test_batch_matches_single_student_results() {
    let h = harness();
    let a = add_student(&h, Some(EnrollmentPlan::Optimum)).await;
    let b = add_student(&h, Some(EnrollmentPlan::Basic)).await;
    let c = add_student(&h, None).await;
    for day in 1..=3 {
        add_absence(&h, a, civil(2025, 9, day, 18));
    }
    for day in 1..=5 {
        add_absence(&h, b, civil(2025, 8, day, 18));
    }
    h.accounts.adjust_recovery_credits(c, 2).await.unwrap();

    let batch = h
        .credits
        .available_credits_for_many(&[a, b, c, Uuid::new_v4()])
        .await
        .unwrap();
    assert_eq!(batch.len(), 3);

    for &id in &[a, b, c] {
        let single = h.credits.available_credits(id).await.unwrap();
        let batched = &batch[&id];
        assert_eq!(batched.total_credits, single.total_credits);
        assert_eq!(batched.pending_absences, single.pending_absences);
        assert_eq!(batched.adjustment, single.adjustment);
    }
}

#[tokio::test]
async fn test_reconcile_all_covers_roster() {
    let h = harness();
    let a = add_student(&h, Some(EnrollmentPlan::Basic)).await;
    let b = add_student(&h, Some(EnrollmentPlan::Advanced)).await;
    for day in 1..=4 {
        add_absence(&h, a, civil(2025, 9, day, 18));
        add_absence(&h, b, civil(2025, 9, day, 18));
    }

    let results = h.reconciler.reconcile_all().await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[&a].as_ref().unwrap().tagged, 2);
    assert_eq!(results[&b].as_ref().unwrap().tagged, 0);
}
