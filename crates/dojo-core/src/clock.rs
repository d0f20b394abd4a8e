//! School clock
//!
//! Supplies "now" in the school's fixed civil timezone and derives the
//! absence cutoff: an absence becomes countable only once its class day has
//! fully elapsed, so every scan uses the end of the previous civil day.
//!
//! The clock is an explicit capability passed into the engine rather than an
//! ambient global, so tests can substitute a fixed instant.

use crate::{AppError, AppResult};
use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Default civil timezone for the school calendar
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// Time source for the engine
///
/// All class dates are civil (naive) date-times in the school's zone, so the
/// cutoff is returned as a `NaiveDateTime` directly comparable to them.
pub trait Clock: Send + Sync {
    /// Current instant rendered in the school's civil timezone
    fn now(&self) -> DateTime<Tz>;

    /// 23:59:59.999 of the calendar day preceding `now()`'s calendar day
    fn yesterday_end_of_day(&self) -> NaiveDateTime {
        let today = self.now().date_naive();
        let yesterday = today.pred_opt().unwrap_or(today);
        yesterday
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap_or_else(|| yesterday.and_time(NaiveTime::MIN))
    }
}

/// System clock pinned to a civil timezone
#[derive(Debug, Clone, Copy)]
pub struct SchoolClock {
    tz: Tz,
}

impl SchoolClock {
    /// Create a clock for the given timezone
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Create a clock from an IANA timezone name (e.g. "America/Chicago")
    pub fn from_name(name: &str) -> AppResult<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|_| AppError::Config(format!("Unknown timezone: {}", name)))?;
        Ok(Self { tz })
    }
}

impl Default for SchoolClock {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEZONE)
    }
}

impl Clock for SchoolClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

/// Fixed clock for deterministic tests and replayed maintenance runs
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Tz>,
}

impl FixedClock {
    /// Pin the clock to a specific instant
    pub fn new(instant: DateTime<Tz>) -> Self {
        Self { instant }
    }

    /// Pin the clock to a civil date-time in the given zone
    ///
    /// Ambiguous or skipped local times (DST transitions) resolve to the
    /// earliest valid instant.
    pub fn at_civil(tz: Tz, civil: NaiveDateTime) -> Self {
        let instant = match tz.from_local_datetime(&civil) {
            chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => dt,
            chrono::LocalResult::None => tz.from_utc_datetime(&civil),
        };
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.instant
    }
}
