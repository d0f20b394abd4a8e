//! Student account model
//!
//! The subset of a student's profile relevant to recovery credits:
//! enrollment plan, account status, trial flag, and the manual adjustment
//! counters moved by the booking consumption protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Enrollment plan enumeration
///
/// Each plan caps how many pending (unconsumed, non-overflow) absences can
/// contribute recovery credits at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EnrollmentPlan {
    Basic,
    #[default]
    Optimum,
    Plus,
    Advanced,
}

impl EnrollmentPlan {
    /// Maximum pending absences that count toward credits under this plan
    pub fn max_pending(&self) -> i64 {
        match self {
            EnrollmentPlan::Basic => 2,
            EnrollmentPlan::Optimum => 4,
            EnrollmentPlan::Plus => 6,
            EnrollmentPlan::Advanced => 8,
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "basic" => Some(EnrollmentPlan::Basic),
            "optimum" => Some(EnrollmentPlan::Optimum),
            "plus" => Some(EnrollmentPlan::Plus),
            "advanced" => Some(EnrollmentPlan::Advanced),
            _ => None,
        }
    }

    /// Cap for an optional plan, falling back to Optimum's cap
    ///
    /// A missing plan also freezes the account, so in practice the fallback
    /// only keeps the function total; frozen paths never read a snapshot.
    pub fn max_pending_for(plan: Option<EnrollmentPlan>) -> i64 {
        plan.unwrap_or_default().max_pending()
    }
}

impl fmt::Display for EnrollmentPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollmentPlan::Basic => write!(f, "Basic"),
            EnrollmentPlan::Optimum => write!(f, "Optimum"),
            EnrollmentPlan::Plus => write!(f, "Plus"),
            EnrollmentPlan::Advanced => write!(f, "Advanced"),
        }
    }
}

/// Account status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Active account - accrues absence-earned credits
    #[default]
    Active,
    /// Inactive account - membership paused
    Inactive,
    /// Deleted account - soft-removed from the roster
    Deleted,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "active"),
            AccountStatus::Inactive => write!(f, "inactive"),
            AccountStatus::Deleted => write!(f, "deleted"),
        }
    }
}

impl AccountStatus {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            "deleted" => Some(AccountStatus::Deleted),
            _ => None,
        }
    }
}

/// Student account entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentAccount {
    /// Unique identifier
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Account status
    pub status: AccountStatus,

    /// Enrollment plan; a missing plan implies a frozen account
    pub enrollment_plan: Option<EnrollmentPlan>,

    /// Trial/drop-in students never accrue absence-earned credits
    pub is_trial: bool,

    /// Lifetime manual credits granted by administrators
    pub recovery_credits_adjustment: i32,

    /// Lifetime manual credits consumed by bookings
    pub used_recovery_adjustment_credits: i32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl StudentAccount {
    /// Frozen accounts never accrue absence-earned credits
    ///
    /// Inactive/deleted status or a missing plan both freeze the account.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.status != AccountStatus::Active || self.enrollment_plan.is_none()
    }

    /// Net manual adjustment credits still available
    ///
    /// May go negative if the consumption protocol was bypassed; the value
    /// is deliberately not clamped so audits surface the inconsistency.
    #[inline]
    pub fn adjustment_net(&self) -> i64 {
        i64::from(self.recovery_credits_adjustment)
            - i64::from(self.used_recovery_adjustment_credits)
    }

    /// Pending-absence cap for this account's plan (Optimum fallback)
    #[inline]
    pub fn max_pending(&self) -> i64 {
        EnrollmentPlan::max_pending_for(self.enrollment_plan)
    }
}

impl Default for StudentAccount {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            status: AccountStatus::Active,
            enrollment_plan: Some(EnrollmentPlan::Optimum),
            is_trial: false,
            recovery_credits_adjustment: 0,
            used_recovery_adjustment_credits: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
