//! Recovery booking repository implementation
//!
//! Provides PostgreSQL-backed storage for recovery bookings. Creation and
//! cancellation pair the booking row with the student's adjustment counter
//! inside one transaction, so `used_adjustment` and
//! `used_recovery_adjustment_credits` can never disagree after a partial
//! failure.

use dojo_core::{
    models::{BookingCounts, BookingRecord, BookingStatus, NewBooking},
    traits::BookingRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of BookingRepository
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    /// Create a new booking repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_status(s: &str) -> BookingStatus {
        BookingStatus::from_str(s).unwrap_or(BookingStatus::Deleted)
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    #[instrument(skip(self))]
    async fn count_active(&self, student_id: Uuid) -> AppResult<i64> {
        debug!("Counting active bookings for student {}", student_id);

        let result: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM bookings
            WHERE student_id = $1 AND status = 'active'
            "#,
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting bookings: {}", e);
            AppError::Database(format!("Failed to count bookings: {}", e))
        })?;

        Ok(result.0)
    }

    #[instrument(skip(self))]
    async fn count_active_with_adjustment(&self, student_id: Uuid) -> AppResult<i64> {
        debug!(
            "Counting active adjustment bookings for student {}",
            student_id
        );

        let result: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM bookings
            WHERE student_id = $1 AND status = 'active' AND used_adjustment = TRUE
            "#,
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting adjustment bookings: {}", e);
            AppError::Database(format!("Failed to count adjustment bookings: {}", e))
        })?;

        Ok(result.0)
    }

    #[instrument(skip(self, student_ids))]
    async fn count_active_many(
        &self,
        student_ids: &[Uuid],
    ) -> AppResult<HashMap<Uuid, BookingCounts>> {
        debug!("Counting active bookings for {} students", student_ids.len());

        if student_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                student_id,
                COUNT(*) AS booked,
                COUNT(*) FILTER (WHERE used_adjustment = TRUE) AS with_adjustment
            FROM bookings
            WHERE student_id = ANY($1) AND status = 'active'
            GROUP BY student_id
            "#,
        )
        .bind(student_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting bookings in batch: {}", e);
            AppError::Database(format!("Failed to count bookings: {}", e))
        })?;

        Ok(rows
            .into_iter()
            .map(|(id, booked, with_adjustment)| {
                (
                    id,
                    BookingCounts {
                        booked,
                        with_adjustment,
                    },
                )
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<BookingRecord>> {
        debug!("Finding booking by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            SELECT id, student_id, class_id, class_date, status, used_adjustment,
                   created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding booking {}: {}", id, e);
            AppError::Database(format!("Failed to find booking: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self, booking))]
    async fn create(&self, booking: &NewBooking) -> AppResult<BookingRecord> {
        debug!(
            "Creating booking for student {} (used_adjustment={})",
            booking.student_id, booking.used_adjustment
        );

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            INSERT INTO bookings (id, student_id, class_id, class_date, status, used_adjustment)
            VALUES ($1, $2, $3, $4, 'active', $5)
            RETURNING id, student_id, class_id, class_date, status, used_adjustment,
                      created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking.student_id)
        .bind(booking.class_id)
        .bind(booking.class_date)
        .bind(booking.used_adjustment)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error creating booking: {}", e);
            AppError::Database(format!("Failed to create booking: {}", e))
        })?;

        if booking.used_adjustment {
            sqlx::query(
                r#"
                UPDATE students
                SET used_recovery_adjustment_credits = used_recovery_adjustment_credits + 1,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(booking.student_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Database error consuming adjustment credit: {}", e);
                AppError::Database(format!("Failed to consume adjustment credit: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit booking: {}", e);
            AppError::Transaction(format!("Failed to commit booking: {}", e))
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn cancel(&self, id: Uuid, refund_adjustment: bool) -> AppResult<BookingRecord> {
        debug!("Cancelling booking {} (refund={})", id, refund_adjustment);

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        // Only an active row flips; the refund below must never apply to a
        // booking another writer already cancelled.
        let row = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            UPDATE bookings
            SET status = 'deleted',
                updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            RETURNING id, student_id, class_id, class_date, status, used_adjustment,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error cancelling booking {}: {}", id, e);
            AppError::Database(format!("Failed to cancel booking: {}", e))
        })?;

        let row = match row {
            Some(row) => row,
            None => {
                drop(tx);
                return self
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::BookingNotFound(id.to_string()));
            }
        };

        if refund_adjustment {
            sqlx::query(
                r#"
                UPDATE students
                SET used_recovery_adjustment_credits = used_recovery_adjustment_credits - 1,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(row.student_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Database error refunding adjustment credit: {}", e);
                AppError::Database(format!("Failed to refund adjustment credit: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit cancellation: {}", e);
            AppError::Transaction(format!("Failed to commit cancellation: {}", e))
        })?;

        Ok(row.into())
    }
}

/// Helper struct for mapping booking rows
#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    student_id: Uuid,
    class_id: Uuid,
    class_date: NaiveDateTime,
    status: String,
    used_adjustment: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for BookingRecord {
    fn from(row: BookingRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            class_id: row.class_id,
            class_date: row.class_date,
            status: PgBookingRepository::parse_status(&row.status),
            used_adjustment: row.used_adjustment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(
            PgBookingRepository::parse_status("active"),
            BookingStatus::Active
        );
        assert_eq!(
            PgBookingRepository::parse_status("deleted"),
            BookingStatus::Deleted
        );
        // Unknown statuses must not resurrect a booking into the ledger
        assert_eq!(
            PgBookingRepository::parse_status("unknown"),
            BookingStatus::Deleted
        );
    }
}
