//! Attendance history repository implementation
//!
//! Provides PostgreSQL-backed reads over the flattened attendance-entry
//! history plus the batched overflow-tag writes used by reconciliation.
//! The countable-absence predicate lives in one place (`COUNTABLE_WHERE`)
//! so the single and batch counters cannot drift apart.

use dojo_core::{
    models::{AbsenceEntry, OverflowReason, OverflowTagUpdate, TagClearance},
    traits::AttendanceRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

/// PostgreSQL implementation of AttendanceRepository
pub struct PgAttendanceRepository {
    pool: PgPool,
}

// Countable absence: absent-or-sick, not day-only, not a recovery visit,
// not tagged overflow. Entire history; the date cutoff is a bind parameter.
const COUNTABLE_WHERE: &str = r#"
    attendance_status IN ('absent', 'sick')
    AND day_only = FALSE
    AND recovery = FALSE
    AND overflow_reason IS NULL
"#;

impl PgAttendanceRepository {
    /// Create a new attendance repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_reason(s: Option<&str>) -> Option<OverflowReason> {
        s.and_then(OverflowReason::from_str)
    }
}

#[async_trait]
impl AttendanceRepository for PgAttendanceRepository {
    #[instrument(skip(self))]
    async fn count_countable_absences(
        &self,
        student_id: Uuid,
        cutoff: NaiveDateTime,
    ) -> AppResult<i64> {
        debug!("Counting countable absences for student {}", student_id);

        let query = format!(
            r#"
            SELECT COUNT(*)
            FROM attendance_entries
            WHERE student_id = $1
                AND class_date <= $2
                AND {}
            "#,
            COUNTABLE_WHERE
        );

        let result: (i64,) = sqlx::query_as(&query)
            .bind(student_id)
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting absences for {}: {}", student_id, e);
                AppError::Database(format!("Failed to count absences: {}", e))
            })?;

        Ok(result.0)
    }

    #[instrument(skip(self, student_ids))]
    async fn count_countable_absences_many(
        &self,
        student_ids: &[Uuid],
        cutoff: NaiveDateTime,
    ) -> AppResult<HashMap<Uuid, i64>> {
        debug!("Counting countable absences for {} students", student_ids.len());

        if student_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!(
            r#"
            SELECT student_id, COUNT(*) AS absences
            FROM attendance_entries
            WHERE student_id = ANY($1)
                AND class_date <= $2
                AND {}
            GROUP BY student_id
            "#,
            COUNTABLE_WHERE
        );

        let rows: Vec<(Uuid, i64)> = sqlx::query_as(&query)
            .bind(student_ids)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting absences in batch: {}", e);
                AppError::Database(format!("Failed to count absences: {}", e))
            })?;

        Ok(rows.into_iter().collect())
    }

    #[instrument(skip(self))]
    async fn find_absence_history(&self, student_id: Uuid) -> AppResult<Vec<AbsenceEntry>> {
        debug!("Loading absence history for student {}", student_id);

        // Includes previously tagged overflow entries; the reconciler skips
        // them itself but needs them present for the chronological scan.
        let rows: Vec<AbsenceHistoryRow> = sqlx::query_as(
            r#"
            SELECT record_id, id AS entry_id, class_date, overflow_reason
            FROM attendance_entries
            WHERE student_id = $1
                AND attendance_status IN ('absent', 'sick')
                AND day_only = FALSE
                AND recovery = FALSE
            ORDER BY class_date ASC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error loading absence history: {}", e);
            AppError::Database(format!("Failed to load absence history: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, updates))]
    async fn persist_overflow_tags(&self, updates: &[OverflowTagUpdate]) -> AppResult<u64> {
        if updates.is_empty() {
            return Ok(0);
        }

        debug!("Persisting {} overflow tag updates", updates.len());

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let mut modified = 0u64;
        for update in updates {
            let result = sqlx::query(
                r#"
                UPDATE attendance_entries
                SET overflow_reason = $3
                WHERE id = $1 AND record_id = $2
                "#,
            )
            .bind(update.entry_id)
            .bind(update.record_id)
            .bind(update.overflow.map(|r| r.to_string()))
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Database error tagging entry {}: {}", update.entry_id, e);
                AppError::Database(format!("Failed to persist overflow tag: {}", e))
            })?;

            modified += result.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit overflow tags: {}", e);
            AppError::Transaction(format!("Failed to commit overflow tags: {}", e))
        })?;

        Ok(modified)
    }

    #[instrument(skip(self))]
    async fn clear_overflow_tags(&self, reason: OverflowReason) -> AppResult<TagClearance> {
        debug!("Clearing overflow tags with reason {}", reason);

        let matched: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM attendance_entries WHERE overflow_reason = $1",
        )
        .bind(reason.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting overflow tags: {}", e);
            AppError::Database(format!("Failed to count overflow tags: {}", e))
        })?;

        let result = sqlx::query(
            "UPDATE attendance_entries SET overflow_reason = NULL WHERE overflow_reason = $1",
        )
        .bind(reason.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error clearing overflow tags: {}", e);
            AppError::Database(format!("Failed to clear overflow tags: {}", e))
        })?;

        let clearance = TagClearance {
            matched: matched.0 as u64,
            modified: result.rows_affected(),
        };

        if clearance.modified > 0 {
            warn!(
                "Cleared {} overflow tags with reason {}",
                clearance.modified, reason
            );
        }

        Ok(clearance)
    }
}

/// Helper struct for mapping absence-history rows
#[derive(Debug, sqlx::FromRow)]
struct AbsenceHistoryRow {
    record_id: Uuid,
    entry_id: Uuid,
    class_date: NaiveDateTime,
    overflow_reason: Option<String>,
}

impl From<AbsenceHistoryRow> for AbsenceEntry {
    fn from(row: AbsenceHistoryRow) -> Self {
        Self {
            record_id: row.record_id,
            entry_id: row.entry_id,
            class_date: row.class_date,
            overflow: PgAttendanceRepository::parse_reason(row.overflow_reason.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reason() {
        assert_eq!(
            PgAttendanceRepository::parse_reason(Some("plan-cap")),
            Some(OverflowReason::PlanCap)
        );
        assert_eq!(
            PgAttendanceRepository::parse_reason(Some("plan-downgrade")),
            Some(OverflowReason::PlanDowngrade)
        );
        assert_eq!(PgAttendanceRepository::parse_reason(Some("legacy")), None);
        assert_eq!(PgAttendanceRepository::parse_reason(None), None);
    }
}
