//! Execution guard: the idempotency gate.
//!
//! The scheduler answers "is it time", the guard answers "have we already
//! bought today". Only both together authorize an order. Both are evaluated
//! against configuration resolved fresh this cycle; nothing is remembered
//! in-process between cycles.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use dca_core::AssetConfig;

use crate::scheduler::{self, ScheduleDecision};

/// Whether the asset's day-stamp already records a buy on `today`.
pub fn is_already_done(config: &AssetConfig, today: NaiveDate) -> bool {
    config.last_buy_date == Some(today)
}

/// Outcome of the combined scheduling and idempotency check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// `BUY_ENABLED` is false.
    Disabled,
    /// Schedule not satisfied (or invalid).
    NotYet(ScheduleDecision),
    /// Already bought today.
    AlreadyDone { today: NaiveDate },
    /// Place the order.
    Authorized(ScheduleDecision),
}

impl Authorization {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }
}

/// Decide whether `config` may trade at `now`.
pub fn authorize(config: &AssetConfig, now: &DateTime<Tz>) -> Authorization {
    if !config.buy_enabled {
        return Authorization::Disabled;
    }
    let decision = scheduler::evaluate(&config.schedule, now);
    if !decision.should_trade() {
        return Authorization::NotYet(decision);
    }
    let today = now.date_naive();
    if is_already_done(config, today) {
        return Authorization::AlreadyDone { today };
    }
    Authorization::Authorized(decision)
}
