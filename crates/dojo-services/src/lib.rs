//! Recovery-credit engine services for DojoCredits
//!
//! This crate contains the business logic that turns attendance history and
//! booking records into a consistent credit balance, applies the booking
//! consumption protocol, and re-tags overflow absences after plan changes.
//!
//! # Architecture
//!
//! Services are designed to be composable and testable:
//! - Each service is generic over the dojo-core repository traits
//! - Dependencies are `Arc`-shared across async tasks
//! - All operations are instrumented with tracing
//! - The clock is an explicit capability, never an ambient global
//!
//! # Services
//!
//! - `CreditsService` - snapshot derivation and credit balance queries
//! - `BookingManager` - booking creation/cancellation with credit consumption
//! - `OverflowReconciler` - plan-change reconciliation of overflow tags

pub mod booking;
pub mod credits;
pub mod locks;
pub mod overflow;

pub use booking::{BookingManager, BookingRequest};
pub use credits::CreditsService;
pub use locks::StudentLocks;
pub use overflow::{OverflowReconciler, ReconcileOutcome};
