//! Student account repository implementation
//!
//! Provides PostgreSQL-backed storage for the credit-relevant slice of the
//! student profile: status, plan, trial flag, and the manual adjustment
//! counters.

use dojo_core::{
    models::{AccountStatus, EnrollmentPlan, StudentAccount},
    traits::AccountRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of AccountRepository
pub struct PgAccountRepository {
    pool: PgPool,
}

const ACCOUNT_COLUMNS: &str = r#"
    id, name, status, enrollment_plan, is_trial,
    recovery_credits_adjustment, used_recovery_adjustment_credits,
    created_at, updated_at
"#;

impl PgAccountRepository {
    /// Create a new account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn parse_status(s: &str) -> AccountStatus {
        AccountStatus::from_str(s).unwrap_or(AccountStatus::Inactive)
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<StudentAccount>> {
        debug!("Finding account by id: {}", id);

        let query = format!("SELECT {} FROM students WHERE id = $1", ACCOUNT_COLUMNS);

        let result = sqlx::query_as::<sqlx::Postgres, AccountRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding account {}: {}", id, e);
                AppError::Database(format!("Failed to find account: {}", e))
            })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self, ids))]
    async fn find_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<StudentAccount>> {
        debug!("Finding {} accounts", ids.len());

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!("SELECT {} FROM students WHERE id = ANY($1)", ACCOUNT_COLUMNS);

        let rows = sqlx::query_as::<sqlx::Postgres, AccountRow>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding accounts: {}", e);
                AppError::Database(format!("Failed to find accounts: {}", e))
            })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_ids(&self) -> AppResult<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM students WHERE status != 'deleted' ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    error!("Database error listing accounts: {}", e);
                    AppError::Database(format!("Failed to list accounts: {}", e))
                })?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    #[instrument(skip(self, account))]
    async fn save(&self, account: &StudentAccount) -> AppResult<StudentAccount> {
        debug!("Saving account: {}", account.id);

        let query = format!(
            r#"
            UPDATE students
            SET name = $2,
                status = $3,
                enrollment_plan = $4,
                is_trial = $5,
                recovery_credits_adjustment = $6,
                used_recovery_adjustment_credits = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let row = sqlx::query_as::<sqlx::Postgres, AccountRow>(&query)
            .bind(account.id)
            .bind(&account.name)
            .bind(account.status.to_string())
            .bind(account.enrollment_plan.map(|p| p.to_string()))
            .bind(account.is_trial)
            .bind(account.recovery_credits_adjustment)
            .bind(account.used_recovery_adjustment_credits)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error saving account {}: {}", account.id, e);
                AppError::Database(format!("Failed to save account: {}", e))
            })?
            .ok_or_else(|| AppError::StudentNotFound(account.id.to_string()))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn set_plan(&self, id: Uuid, plan: Option<EnrollmentPlan>) -> AppResult<StudentAccount> {
        debug!("Setting plan for account {}: {:?}", id, plan);

        let query = format!(
            r#"
            UPDATE students
            SET enrollment_plan = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let row = sqlx::query_as::<sqlx::Postgres, AccountRow>(&query)
            .bind(id)
            .bind(plan.map(|p| p.to_string()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error setting plan for {}: {}", id, e);
                AppError::Database(format!("Failed to set plan: {}", e))
            })?
            .ok_or_else(|| AppError::StudentNotFound(id.to_string()))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn adjust_recovery_credits(&self, id: Uuid, delta: i32) -> AppResult<StudentAccount> {
        debug!("Adjusting recovery credits for {} by {}", id, delta);

        // The floor check rides in the UPDATE predicate so a concurrent
        // writer cannot slip a revocation past a stale read.
        let query = format!(
            r#"
            UPDATE students
            SET recovery_credits_adjustment = recovery_credits_adjustment + $2,
                updated_at = NOW()
            WHERE id = $1
                AND recovery_credits_adjustment + $2 >= used_recovery_adjustment_credits
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        let row = sqlx::query_as::<sqlx::Postgres, AccountRow>(&query)
            .bind(id)
            .bind(delta)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error adjusting credits for {}: {}", id, e);
                AppError::Database(format!("Failed to adjust credits: {}", e))
            })?;

        match row {
            Some(row) => Ok(row.into()),
            None => {
                let account = self
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::StudentNotFound(id.to_string()))?;
                Err(AppError::InsufficientCredits {
                    available: account.adjustment_net(),
                })
            }
        }
    }
}

/// Helper struct for mapping account rows
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    status: String,
    enrollment_plan: Option<String>,
    is_trial: bool,
    recovery_credits_adjustment: i32,
    used_recovery_adjustment_credits: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for StudentAccount {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            status: PgAccountRepository::parse_status(&row.status),
            enrollment_plan: row
                .enrollment_plan
                .as_deref()
                .and_then(EnrollmentPlan::from_str),
            is_trial: row.is_trial,
            recovery_credits_adjustment: row.recovery_credits_adjustment,
            used_recovery_adjustment_credits: row.used_recovery_adjustment_credits,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
