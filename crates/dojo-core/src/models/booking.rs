//! Recovery booking models
//!
//! A booking reserves a spot in a makeup class. The `used_adjustment` flag
//! is fixed at creation time by the consumption protocol and decides which
//! credit pool the booking drew from; cancellation soft-deletes the row.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Booking lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Active booking - occupies a slot and consumes a credit
    #[default]
    Active,
    /// Soft-deleted booking - no longer occupies a slot in the ledger
    Deleted,
}

impl BookingStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(BookingStatus::Active),
            "deleted" => Some(BookingStatus::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Active => write!(f, "active"),
            BookingStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// Recovery booking entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    /// Unique identifier
    pub id: Uuid,

    /// Student who booked the makeup class
    pub student_id: Uuid,

    /// Target class
    pub class_id: Uuid,

    /// Civil date-time of the target class
    pub class_date: NaiveDateTime,

    /// Lifecycle status
    pub status: BookingStatus,

    /// True if the booking consumed a manual adjustment credit at creation
    pub used_adjustment: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl BookingRecord {
    /// Whether this booking still occupies a slot in the ledger
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }
}

/// Booking creation request, produced by the consumption protocol
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub class_date: NaiveDateTime,
    /// Set by the protocol: adjustment credits spend before absence-earned
    pub used_adjustment: bool,
}

/// Active booking counts for one student
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingCounts {
    /// All active bookings
    pub booked: i64,
    /// Subset that consumed a manual adjustment credit
    pub with_adjustment: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!(BookingStatus::from_str("active"), Some(BookingStatus::Active));
        assert_eq!(
            BookingStatus::from_str(&BookingStatus::Deleted.to_string()),
            Some(BookingStatus::Deleted)
        );
        assert_eq!(BookingStatus::from_str("pending"), None);
    }
}
