//! Attendance models
//!
//! One attendance record exists per (class, date, time-slot); each record
//! carries one entry per student present that day. The engine never creates
//! entries - it only reads them and, during overflow reconciliation, rewrites
//! their overflow tag.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Attendance status for a single entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Sick,
}

impl AttendanceStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "late" => Some(AttendanceStatus::Late),
            "sick" => Some(AttendanceStatus::Sick),
            _ => None,
        }
    }

    /// Absent and sick entries feed the absence pool
    #[inline]
    pub fn is_absence(&self) -> bool {
        matches!(self, AttendanceStatus::Absent | AttendanceStatus::Sick)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceStatus::Present => write!(f, "present"),
            AttendanceStatus::Absent => write!(f, "absent"),
            AttendanceStatus::Late => write!(f, "late"),
            AttendanceStatus::Sick => write!(f, "sick"),
        }
    }
}

/// Provenance tag for an overflow absence
///
/// An absence either counts toward the pool (no tag) or carries exactly one
/// overflow reason. Modeling the tag as an `Option<OverflowReason>` makes
/// the legacy "reason present but flag cleared" state unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowReason {
    /// Absence exceeded the plan cap when it was recorded
    PlanCap,
    /// Absence was re-tagged by reconciliation after a plan change
    PlanDowngrade,
}

impl OverflowReason {
    /// Parse from the persisted wire string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "plan-cap" => Some(OverflowReason::PlanCap),
            "plan-downgrade" => Some(OverflowReason::PlanDowngrade),
            _ => None,
        }
    }
}

impl fmt::Display for OverflowReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowReason::PlanCap => write!(f, "plan-cap"),
            OverflowReason::PlanDowngrade => write!(f, "plan-downgrade"),
        }
    }
}

/// One student's entry on an attendance record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEntry {
    /// Unique entry identifier
    pub id: Uuid,

    /// Parent attendance record (one per class/date/slot)
    pub record_id: Uuid,

    /// Student this entry belongs to
    pub student_id: Uuid,

    /// Civil date-time of the class in the school's timezone
    pub class_date: NaiveDateTime,

    /// Attendance status
    pub status: AttendanceStatus,

    /// Drop-in/trial attendance; never generates or consumes credits
    pub day_only: bool,

    /// Entry exists because the student attended via a recovery booking
    pub recovery: bool,

    /// Overflow tag; `None` means the absence still counts toward the pool
    pub overflow: Option<OverflowReason>,
}

impl AttendanceEntry {
    /// Whether this entry currently reduces the student's absence pool
    ///
    /// Countable iff absent-or-sick, not day-only, not a recovery visit,
    /// and not tagged overflow.
    #[inline]
    pub fn is_countable_absence(&self) -> bool {
        self.status.is_absence() && !self.day_only && !self.recovery && self.overflow.is_none()
    }
}

/// Absence-history item fed to overflow reconciliation
///
/// The reconciler scans every countable-or-previously-overflow absence in
/// chronological order; it only needs the identifiers, the class date for
/// ordering, and the current tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsenceEntry {
    pub record_id: Uuid,
    pub entry_id: Uuid,
    pub class_date: NaiveDateTime,
    pub overflow: Option<OverflowReason>,
}

/// One overflow-tag mutation, persisted in a single batch per student
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowTagUpdate {
    pub record_id: Uuid,
    pub entry_id: Uuid,
    pub overflow: Option<OverflowReason>,
}

/// Diagnostics for administrative tag-clearing runs
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TagClearance {
    /// Entries carrying the targeted reason
    pub matched: u64,
    /// Entries actually rewritten
    pub modified: u64,
}
