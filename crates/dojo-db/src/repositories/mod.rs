//! Repository implementations
//!
//! PostgreSQL-backed implementations of the dojo-core repository traits.

pub mod account_repo;
pub mod attendance_repo;
pub mod booking_repo;

pub use account_repo::PgAccountRepository;
pub use attendance_repo::PgAttendanceRepository;
pub use booking_repo::PgBookingRepository;
