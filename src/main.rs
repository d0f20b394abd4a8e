//! DojoCredits command-line interface
//!
//! Administrative entry point for the recovery-credit engine: balance
//! queries, booking creation/cancellation, plan changes with overflow
//! reconciliation, and maintenance sweeps.

use anyhow::Context;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use dojo_core::{
    models::{EnrollmentPlan, OverflowReason},
    traits::AccountRepository,
    AppConfig, AppError, SchoolClock,
};
use dojo_db::{create_pool, PgAccountRepository, PgAttendanceRepository, PgBookingRepository};
use dojo_services::{
    BookingManager, BookingRequest, CreditsService, OverflowReconciler, StudentLocks,
};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "dojo-credits", version, about = "Recovery credit engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a student's available recovery credits
    Credits {
        student_id: Uuid,
    },
    /// Book a makeup class for a student
    Book {
        student_id: Uuid,
        #[arg(long)]
        class_id: Uuid,
        /// Class date-time in the school's timezone (YYYY-MM-DDTHH:MM:SS)
        #[arg(long)]
        class_date: String,
    },
    /// Cancel a booking, refunding the credit it consumed
    Cancel {
        booking_id: Uuid,
    },
    /// Change a student's plan and reconcile overflow absences
    SetPlan {
        student_id: Uuid,
        /// Plan name, or "none" to remove the plan and freeze credits
        plan: String,
    },
    /// Grant (or revoke, with a negative delta) manual adjustment credits
    AdjustCredits {
        student_id: Uuid,
        delta: i32,
    },
    /// Reconcile overflow tags for every student against their current plan
    Audit,
    /// Clear overflow tags carrying the given reason
    ClearOverflow {
        /// "plan-cap" or "plan-downgrade"
        #[arg(long)]
        reason: String,
    },
}

fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "dojo_credits={},dojo_services={},dojo_db={},sqlx=warn",
            log_level, log_level, log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

type Credits = CreditsService<PgAttendanceRepository, PgBookingRepository, PgAccountRepository>;
type Bookings = BookingManager<PgAttendanceRepository, PgBookingRepository, PgAccountRepository>;
type Reconciler =
    OverflowReconciler<PgAttendanceRepository, PgBookingRepository, PgAccountRepository>;

struct Engine {
    accounts: Arc<PgAccountRepository>,
    credits: Arc<Credits>,
    bookings: Arc<Bookings>,
    reconciler: Arc<Reconciler>,
}

async fn build_engine(config: &AppConfig) -> anyhow::Result<Engine> {
    info!("Connecting to database...");
    let pool = create_pool(
        &config.database.url,
        Some(config.database.max_connections),
    )
    .await
    .context("failed to create database pool")?;

    let attendance = Arc::new(PgAttendanceRepository::new(pool.clone()));
    let bookings = Arc::new(PgBookingRepository::new(pool.clone()));
    let accounts = Arc::new(PgAccountRepository::new(pool));

    let clock = Arc::new(SchoolClock::from_name(&config.school.timezone)?);
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
    let reconciler = Arc::new(OverflowReconciler::new(
        attendance,
        bookings,
        accounts.clone(),
        locks,
    ));

    Ok(Engine {
        accounts,
        credits,
        bookings: manager,
        reconciler,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    let engine = build_engine(&config).await?;

    match cli.command {
        Command::Credits { student_id } => {
            let credits = engine.credits.available_credits(student_id).await?;
            println!("{}", serde_json::to_string_pretty(&credits)?);
        }
        Command::Book {
            student_id,
            class_id,
            class_date,
        } => {
            let class_date = parse_class_date(&class_date)?;
            let booking = engine
                .bookings
                .apply_booking(student_id, &BookingRequest { class_id, class_date })
                .await?;
            println!("{}", serde_json::to_string_pretty(&booking)?);
        }
        Command::Cancel { booking_id } => {
            let booking = engine.bookings.cancel_booking(booking_id).await?;
            println!("{}", serde_json::to_string_pretty(&booking)?);
        }
        Command::SetPlan { student_id, plan } => {
            let plan = parse_plan(&plan)?;
            let account = engine.accounts.set_plan(student_id, plan).await?;
            info!("Plan for {} set to {:?}", student_id, plan);

            // Overflow tags only tighten; a removed plan freezes credits
            // without touching history.
            if let Some(new_plan) = plan {
                let outcome = engine
                    .reconciler
                    .reconcile_after_plan_change(student_id, new_plan)
                    .await?;
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                warn!("Account {} now has no plan; credits are frozen", account.id);
            }
        }
        Command::AdjustCredits { student_id, delta } => {
            let account = engine
                .accounts
                .adjust_recovery_credits(student_id, delta)
                .await?;
            println!(
                "Adjustment for {}: granted={}, used={}",
                account.id,
                account.recovery_credits_adjustment,
                account.used_recovery_adjustment_credits
            );
        }
        Command::Audit => {
            let results = engine.reconciler.reconcile_all().await?;
            let mut failures = 0usize;
            for (student_id, outcome) in &results {
                match outcome {
                    Ok(o) if o.tagged > 0 => {
                        println!("{}: tagged {} overflow absences", student_id, o.tagged)
                    }
                    Ok(_) => {}
                    Err(e) => {
                        failures += 1;
                        warn!("Reconciliation failed for {}: {}", student_id, e);
                    }
                }
            }
            println!("Audited {} students, {} failures", results.len(), failures);
        }
        Command::ClearOverflow { reason } => {
            let reason = OverflowReason::from_str(&reason)
                .ok_or_else(|| AppError::InvalidInput(format!("unknown reason: {}", reason)))?;
            let clearance = engine.reconciler.clear_overflow_tags(reason).await?;
            println!("{}", serde_json::to_string_pretty(&clearance)?);
        }
    }

    Ok(())
}

fn parse_class_date(s: &str) -> Result<NaiveDateTime, AppError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| AppError::InvalidInput(format!("invalid class date: {}", s)))
}

fn parse_plan(s: &str) -> Result<Option<EnrollmentPlan>, AppError> {
    if s.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    EnrollmentPlan::from_str(s)
        .map(Some)
        .ok_or_else(|| AppError::InvalidPlan(s.to_string()))
}
