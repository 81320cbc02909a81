//! Time-of-day trade scheduling.
//!
//! A schedule is satisfied when "now" is within five minutes either side of
//! today's scheduled time, or any time after it on the same local day
//! (catch-up for delayed or infrequent invocations). The comparison is
//! against *today's* scheduled time only: a `23:55` schedule evaluated at
//! `00:05` is almost a full day in the future and does not trade.

use chrono::{DateTime, NaiveTime, TimeZone};
use dca_core::Schedule;

/// Half-width of the on-time window.
pub const WINDOW_SECS: i64 = 300;

/// Which scheduling rule applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleDecision {
    /// `|delta| <= WINDOW_SECS`.
    InWindow { delta_secs: i64 },
    /// Scheduled time passed earlier today.
    CatchUp { delta_secs: i64 },
    /// Scheduled time is still ahead today.
    NotYet { delta_secs: i64 },
    /// Schedule could not be parsed.
    Invalid,
}

impl ScheduleDecision {
    pub fn should_trade(&self) -> bool {
        matches!(self, Self::InWindow { .. } | Self::CatchUp { .. })
    }
}

/// Seconds from today's `scheduled` (local wall clock) to `now`.
pub fn delta_secs<Tz: TimeZone>(scheduled: NaiveTime, now: &DateTime<Tz>) -> i64 {
    let local = now.naive_local();
    (local - local.date().and_time(scheduled)).num_seconds()
}

/// Whether `now` satisfies the schedule.
pub fn should_trade_now<Tz: TimeZone>(scheduled: NaiveTime, now: &DateTime<Tz>) -> bool {
    decide(delta_secs(scheduled, now)).should_trade()
}

/// Evaluate a possibly-invalid schedule, reporting which rule fired.
pub fn evaluate<Tz: TimeZone>(schedule: &Schedule, now: &DateTime<Tz>) -> ScheduleDecision {
    match schedule {
        Schedule::At(t) => decide(delta_secs(*t, now)),
        Schedule::Invalid(_) => ScheduleDecision::Invalid,
    }
}

fn decide(delta_secs: i64) -> ScheduleDecision {
    if delta_secs.abs() <= WINDOW_SECS {
        ScheduleDecision::InWindow { delta_secs }
    } else if delta_secs > WINDOW_SECS {
        ScheduleDecision::CatchUp { delta_secs }
    } else {
        ScheduleDecision::NotYet { delta_secs }
    }
}
