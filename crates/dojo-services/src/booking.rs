//! Booking manager
//!
//! Applies the credit consumption protocol: a booking spends a manual
//! adjustment credit whenever the student has a positive adjustment balance,
//! and an absence-earned credit otherwise. The decision is frozen into the
//! booking row at creation time so cancellation can refund the exact pool
//! the booking drew from.

use crate::credits::CreditsService;
use crate::locks::StudentLocks;
use chrono::NaiveDateTime;
use dojo_core::{
    models::{BookingRecord, NewBooking},
    traits::{AccountRepository, AttendanceRepository, BookingRepository},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Booking creation request from the caller
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub class_id: Uuid,
    pub class_date: NaiveDateTime,
}

/// Creates and cancels recovery bookings
pub struct BookingManager<AT, B, AC> {
    credits: Arc<CreditsService<AT, B, AC>>,
    bookings: Arc<B>,
    accounts: Arc<AC>,
    locks: Arc<StudentLocks>,
}

impl<AT, B, AC> BookingManager<AT, B, AC>
where
    AT: AttendanceRepository,
    B: BookingRepository,
    AC: AccountRepository,
{
    /// Create a new booking manager
    pub fn new(
        credits: Arc<CreditsService<AT, B, AC>>,
        bookings: Arc<B>,
        accounts: Arc<AC>,
        locks: Arc<StudentLocks>,
    ) -> Self {
        Self {
            credits,
            bookings,
            accounts,
            locks,
        }
    }

    /// Book a makeup class for a student
    ///
    /// The whole check-then-book sequence runs under the student's lock so
    /// two concurrent bookings cannot both spend the last credit. Frozen
    /// accounts are rejected outright, even when they hold unspent
    /// adjustment credits.
    #[instrument(skip(self, request), fields(class_id = %request.class_id))]
    pub async fn apply_booking(
        &self,
        student_id: Uuid,
        request: &BookingRequest,
    ) -> AppResult<BookingRecord> {
        let lock = self.locks.for_student(student_id);
        let _guard = lock.lock().await;

        let account = self
            .accounts
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| AppError::StudentNotFound(student_id.to_string()))?;

        if account.is_frozen() {
            warn!("Rejected booking for frozen account {}", student_id);
            return Err(AppError::AccountFrozen(student_id.to_string()));
        }

        let credits = self.credits.available_credits_for_account(&account).await?;
        if credits.total_credits <= 0 {
            return Err(AppError::InsufficientCredits {
                available: credits.total_credits,
            });
        }

        // Adjustment credits spend before absence-earned ones.
        let used_adjustment = account.adjustment_net() > 0;

        let booking = self
            .bookings
            .create(&NewBooking {
                student_id,
                class_id: request.class_id,
                class_date: request.class_date,
                used_adjustment,
            })
            .await?;

        info!(
            "Booked class {} for {} (used_adjustment={})",
            request.class_id, student_id, used_adjustment
        );

        Ok(booking)
    }

    /// Cancel a booking, refunding the credit pool it drew from
    ///
    /// A booking that spent an adjustment credit gets that credit back via
    /// the used-counter decrement; one that spent an absence-earned credit
    /// needs no explicit refund, since the freed booking slot restores the
    /// pending-absence count on the next snapshot. Cancelling an
    /// already-cancelled booking is a no-op.
    #[instrument(skip(self))]
    pub async fn cancel_booking(&self, booking_id: Uuid) -> AppResult<BookingRecord> {
        // First read only resolves the student for the lock; the status
        // check must happen under it, or two racing cancels both refund.
        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::BookingNotFound(booking_id.to_string()))?;

        let lock = self.locks.for_student(booking.student_id);
        let _guard = lock.lock().await;

        let booking = self
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::BookingNotFound(booking_id.to_string()))?;

        if !booking.is_active() {
            warn!("Booking {} already cancelled", booking_id);
            return Ok(booking);
        }

        let cancelled = self
            .bookings
            .cancel(booking_id, booking.used_adjustment)
            .await?;

        info!(
            "Cancelled booking {} for {} (refund_adjustment={})",
            booking_id, booking.student_id, booking.used_adjustment
        );

        Ok(cancelled)
    }
}
