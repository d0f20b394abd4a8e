//! DojoCredits Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the DojoCredits recovery-credit system. It includes:
//!
//! - Domain models (StudentAccount, AttendanceEntry, BookingRecord, etc.)
//! - Pure credit math (Snapshot, AvailableCredits, plan caps)
//! - Repository traits for the attendance, booking, and account stores
//! - Unified error handling with stable error codes
//! - Application configuration and the school clock

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use clock::{Clock, FixedClock, SchoolClock};
pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
