//! Trading-clock utilities.
//!
//! All scheduling decisions and day-stamps are made in one configured IANA
//! timezone (default `Asia/Bangkok`). The [`Clock`] trait lets the cycle be
//! driven by a fixed instant in tests.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::DcaError;

/// Default trading timezone.
pub const DEFAULT_TIMEZONE: &str = "Asia/Bangkok";

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz, DcaError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| DcaError::UnknownTimezone(name.to_string()))
}

/// Source of "now" in the trading timezone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;

    /// Calendar date in the trading timezone.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock converted into a fixed timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Tz>,
}

impl FixedClock {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self { now }
    }

    /// Build from local wall-clock components in `tz`.
    ///
    /// Returns `None` for times that do not exist in `tz` (DST gaps).
    pub fn at_local(tz: Tz, y: i32, m: u32, d: u32, hh: u32, mm: u32) -> Option<Self> {
        let naive = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(hh, mm, 0)?;
        tz.from_local_datetime(&naive).earliest().map(Self::new)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.now
    }
}

/// Current time as **milliseconds** since Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Current time as **seconds** since Unix epoch.
#[inline]
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}
