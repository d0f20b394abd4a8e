//! Domain models for DojoCredits
//!
//! This module contains all the core domain models used throughout the engine.

pub mod account;
pub mod attendance;
pub mod booking;
pub mod credits;

pub use account::{AccountStatus, EnrollmentPlan, StudentAccount};
pub use attendance::{
    AbsenceEntry, AttendanceEntry, AttendanceStatus, OverflowReason, OverflowTagUpdate,
    TagClearance,
};
pub use booking::{BookingCounts, BookingRecord, BookingStatus, NewBooking};
pub use credits::{AvailableCredits, Snapshot};
