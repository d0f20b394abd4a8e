//! DojoCredits Database Layer
//!
//! This crate provides PostgreSQL database access and repository
//! implementations for the DojoCredits system. It includes:
//!
//! - Connection pool management with sqlx
//! - Repository implementations for attendance history, bookings, accounts
//! - Transactional pairing of booking rows with adjustment counters
//! - Batched overflow-tag persistence for reconciliation runs

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use dojo_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
