//! Credit math
//!
//! Pure derivations over the absence and booking counters. Nothing here is
//! persisted: a `Snapshot` is recomputed per request from the stores, and
//! `AvailableCredits` is the final answer handed to callers.

use serde::Serialize;

use super::account::{EnrollmentPlan, StudentAccount};

/// Consistent per-student view of absences vs. bookings
///
/// Only bookings that did not use a manual adjustment credit consume from
/// the absence-earned pool; adjustment-backed bookings already paid from
/// the manual pool and must not be charged twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Countable absences over the entire history, up to yesterday's end
    pub absences_count: i64,
    /// Active bookings over the entire history
    pub booked_count: i64,
    /// Active bookings that consumed a manual adjustment credit
    pub adjustment_booked_count: i64,
    /// Absences already consumed by non-adjustment bookings
    pub consumed_absences: i64,
    /// Absences still available to earn credits
    pub pending_absences: i64,
}

/// All-zero snapshot used for frozen and trial accounts
pub const ZERO_SNAPSHOT: Snapshot = Snapshot {
    absences_count: 0,
    booked_count: 0,
    adjustment_booked_count: 0,
    consumed_absences: 0,
    pending_absences: 0,
};

impl Snapshot {
    /// Derive the consumed/pending split from the raw counters
    pub fn derive(absences_count: i64, booked_count: i64, adjustment_booked_count: i64) -> Self {
        let non_adjustment_booked = (booked_count - adjustment_booked_count).max(0);
        let consumed_absences = absences_count.min(non_adjustment_booked);
        let pending_absences = (absences_count - consumed_absences).max(0);

        Self {
            absences_count,
            booked_count,
            adjustment_booked_count,
            consumed_absences,
            pending_absences,
        }
    }
}

/// Whether a freshly recorded absence already exceeds the plan cap
///
/// Used by attendance registration to tag the new absence `plan-cap` at
/// creation time instead of waiting for a reconciliation pass.
pub fn overflows_plan_cap(pending_absences: i64, plan_max_pending: i64) -> bool {
    pending_absences >= plan_max_pending
}

/// Final credit balance exposed to callers
#[derive(Debug, Clone, Serialize)]
pub struct AvailableCredits {
    pub plan: EnrollmentPlan,
    pub max_pending: i64,
    pub credits_from_absences: i64,
    /// Net manual adjustment credits (granted minus used, not clamped)
    pub adjustment: i64,
    pub adjustment_total: i64,
    pub adjustment_used: i64,
    pub booked_count: i64,
    pub adjustment_booked_count: i64,
    pub absences_count: i64,
    pub consumed_absences: i64,
    pub pending_absences: i64,
    pub total_credits: i64,
    pub is_frozen: bool,
}

impl AvailableCredits {
    /// Combine an account with an optional snapshot into the final balance
    ///
    /// Frozen and trial accounts are computed against the zero snapshot, so
    /// they deterministically report zero absence-earned credits while the
    /// manual adjustment pool stays available. Callers should skip fetching
    /// a snapshot entirely for such accounts.
    pub fn compute(account: &StudentAccount, snapshot: Option<Snapshot>) -> Self {
        let plan = account.enrollment_plan.unwrap_or_default();
        let max_pending = EnrollmentPlan::max_pending_for(account.enrollment_plan);
        let is_frozen = account.is_frozen();

        let effective = if is_frozen || account.is_trial {
            ZERO_SNAPSHOT
        } else {
            snapshot.unwrap_or(ZERO_SNAPSHOT)
        };

        let credits_from_absences = effective.pending_absences.min(max_pending);
        let adjustment_total = i64::from(account.recovery_credits_adjustment);
        let adjustment_used = i64::from(account.used_recovery_adjustment_credits);
        let adjustment = adjustment_total - adjustment_used;

        Self {
            plan,
            max_pending,
            credits_from_absences,
            adjustment,
            adjustment_total,
            adjustment_used,
            booked_count: effective.booked_count,
            adjustment_booked_count: effective.adjustment_booked_count,
            absences_count: effective.absences_count,
            consumed_absences: effective.consumed_absences,
            pending_absences: effective.pending_absences,
            total_credits: credits_from_absences + adjustment,
            is_frozen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::AccountStatus;

    #[test]
    fn test_adjustment_bookings_do_not_consume_absences() {
        let s = Snapshot::derive(3, 2, 2);
        assert_eq!(s.consumed_absences, 0);
        assert_eq!(s.pending_absences, 3);
    }

    #[test]
    fn test_plain_bookings_consume_absences() {
        let s = Snapshot::derive(3, 2, 0);
        assert_eq!(s.consumed_absences, 2);
        assert_eq!(s.pending_absences, 1);
    }

    #[test]
    fn test_overbooked_clamps_at_absence_count() {
        let s = Snapshot::derive(1, 5, 0);
        assert_eq!(s.consumed_absences, 1);
        assert_eq!(s.pending_absences, 0);
    }

    #[test]
    fn test_more_adjustment_than_booked_clamps_at_zero() {
        // Inconsistent counters (adjustment subset larger than total) must
        // not produce a negative non-adjustment count.
        let s = Snapshot::derive(2, 1, 3);
        assert_eq!(s.consumed_absences, 0);
        assert_eq!(s.pending_absences, 2);
    }

    #[test]
    fn test_pending_capped_by_plan() {
        let account = StudentAccount {
            enrollment_plan: Some(EnrollmentPlan::Optimum),
            ..Default::default()
        };
        let credits = AvailableCredits::compute(&account, Some(Snapshot::derive(5, 0, 0)));
        assert_eq!(credits.credits_from_absences, 4);
        assert_eq!(credits.total_credits, 4);
    }

    #[test]
    fn test_adjustment_composes_with_absences() {
        let account = StudentAccount {
            recovery_credits_adjustment: 2,
            used_recovery_adjustment_credits: 1,
            ..Default::default()
        };
        let credits = AvailableCredits::compute(&account, Some(Snapshot::derive(2, 0, 0)));
        assert_eq!(credits.adjustment, 1);
        assert_eq!(credits.credits_from_absences, 2);
        assert_eq!(credits.total_credits, 3);
    }

    #[test]
    fn test_inactive_account_keeps_only_adjustment() {
        let account = StudentAccount {
            status: AccountStatus::Inactive,
            recovery_credits_adjustment: 3,
            used_recovery_adjustment_credits: 1,
            ..Default::default()
        };
        let credits = AvailableCredits::compute(&account, Some(Snapshot::derive(5, 0, 0)));
        assert!(credits.is_frozen);
        assert_eq!(credits.credits_from_absences, 0);
        assert_eq!(credits.total_credits, 2);
    }

    #[test]
    fn test_trial_account_zeroes_snapshot() {
        let account = StudentAccount {
            is_trial: true,
            ..Default::default()
        };
        let credits = AvailableCredits::compute(&account, Some(Snapshot::derive(4, 1, 0)));
        assert!(!credits.is_frozen);
        assert_eq!(credits.absences_count, 0);
        assert_eq!(credits.total_credits, 0);
    }

    #[test]
    fn test_missing_plan_freezes_with_optimum_label() {
        let account = StudentAccount {
            enrollment_plan: None,
            ..Default::default()
        };
        let credits = AvailableCredits::compute(&account, None);
        assert!(credits.is_frozen);
        assert_eq!(credits.plan, EnrollmentPlan::Optimum);
        assert_eq!(credits.max_pending, 4);
        assert_eq!(credits.credits_from_absences, 0);
    }

    #[test]
    fn test_negative_adjustment_net_surfaces() {
        let account = StudentAccount {
            recovery_credits_adjustment: 0,
            used_recovery_adjustment_credits: 2,
            ..Default::default()
        };
        let credits = AvailableCredits::compute(&account, Some(Snapshot::derive(1, 0, 0)));
        assert_eq!(credits.adjustment, -2);
        assert_eq!(credits.total_credits, -1);
    }

    #[test]
    fn test_zero_absences_means_zero_pool_credits() {
        let account = StudentAccount {
            enrollment_plan: Some(EnrollmentPlan::Advanced),
            ..Default::default()
        };
        let credits = AvailableCredits::compute(&account, Some(Snapshot::derive(0, 0, 0)));
        assert_eq!(credits.credits_from_absences, 0);
        assert_eq!(credits.total_credits, 0);
    }

    #[test]
    fn test_overflows_plan_cap() {
        assert!(!overflows_plan_cap(3, 4));
        assert!(overflows_plan_cap(4, 4));
        assert!(overflows_plan_cap(5, 4));
    }
}
