//! Typed responses returned by an [`ExchangeGateway`](crate::ExchangeGateway).
//!
//! Venue-specific JSON is decoded into these shapes inside each exchange
//! module, so callers never touch raw envelopes.

use dca_core::FillEvent;
use serde::{Deserialize, Serialize};

/// Acknowledgement of a submitted order.
///
/// Market orders are matched asynchronously, so this carries no reliable fill
/// data; query [`OrderInfo`] after a settle delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    /// Exchange-assigned order ID.
    pub order_id: String,
    /// Quote amount the venue accepted.
    pub amount_quote: f64,
    /// Placement timestamp (Unix seconds), when reported.
    pub ts: Option<i64>,
}

/// Order detail including its fill history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub order_id: String,
    /// Quote amount actually filled.
    pub filled: Option<f64>,
    /// Quote amount requested.
    pub total: Option<f64>,
    /// Venue status string (e.g. `"filled"`, `"unfilled"`).
    pub status: Option<String>,
    /// Matched fragments.
    pub fills: Vec<FillEvent>,
    /// Last update timestamp (Unix seconds), when reported.
    pub ts: Option<i64>,
}

/// One currency balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub available: f64,
    pub reserved: f64,
}

impl Balance {
    pub fn total(&self) -> f64 {
        self.available + self.reserved
    }
}

/// One executed trade from the account's order history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalOrder {
    pub txn_id: String,
    pub order_id: String,
    /// `"buy"` or `"sell"`.
    pub side: String,
    pub order_type: String,
    pub rate: f64,
    pub amount: f64,
    pub fee: f64,
    /// Unix seconds.
    pub ts: i64,
}
