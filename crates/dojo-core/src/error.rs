//! Unified error handling for DojoCredits
//!
//! This module provides a single error type covering all failure scenarios
//! in the engine, with stable string codes for callers (HTTP layers,
//! maintenance tasks) to map onto their own surfaces.

use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Business Logic Errors ====================
    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Invalid enrollment plan: {0}")]
    InvalidPlan(String),

    #[error("Insufficient recovery credits: available {available}")]
    InsufficientCredits { available: i64 },

    #[error("Account frozen: {0}")]
    AccountFrozen(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the stable error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::StudentNotFound(_) => "student_not_found",
            AppError::BookingNotFound(_) => "booking_not_found",
            AppError::InvalidPlan(_) => "invalid_plan",
            AppError::InsufficientCredits { .. } => "insufficient_credits",
            AppError::AccountFrozen(_) => "account_frozen",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the operation may be retried by the caller
    ///
    /// The engine itself never retries; mutations are idempotent per student
    /// so infrastructure failures are safe to retry from outside.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Pool(_) | AppError::Transaction(_)
        )
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::StudentNotFound("123".to_string()).error_code(),
            "student_not_found"
        );
        assert_eq!(
            AppError::InsufficientCredits { available: 0 }.error_code(),
            "insufficient_credits"
        );
        assert_eq!(
            AppError::InvalidPlan("Gold".to_string()).error_code(),
            "invalid_plan"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(AppError::Database("timeout".to_string()).is_retryable());
        assert!(!AppError::InsufficientCredits { available: 0 }.is_retryable());
        assert!(!AppError::AccountFrozen("abc".to_string()).is_retryable());
    }
}
