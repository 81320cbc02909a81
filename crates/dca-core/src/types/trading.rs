//! Order-execution data structures: fills, order records, FX results.
//!
//! An [`OrderRecord`] is produced once per executed buy and consumed right
//! away by notification and persistence; nothing here is retained across
//! cycles.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fills
// ---------------------------------------------------------------------------

/// One matched fragment of an order's trade history.
///
/// For buy orders the venue reports `amount` in quote currency, so the base
/// quantity of the fragment is `amount / price`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub amount: f64,
    pub price: f64,
}

impl FillEvent {
    pub fn new(amount: f64, price: f64) -> Self {
        Self { amount, price }
    }

    /// Base quantity received by this fragment.
    ///
    /// Fragments without a strictly positive, finite price contribute nothing.
    pub fn received_base(&self) -> f64 {
        if self.price > 0.0 && self.price.is_finite() && self.amount.is_finite() {
            self.amount / self.price
        } else {
            0.0
        }
    }
}

/// Sum of the base quantity received across all fragments.
pub fn total_received_base(fills: &[FillEvent]) -> f64 {
    fills.iter().map(FillEvent::received_base).sum()
}

/// `filled / received`, defined only when `received > 0`.
pub fn effective_price(filled_quote: f64, received_base: f64) -> Option<f64> {
    if received_base > 0.0 {
        let price = filled_quote / received_base;
        price.is_finite().then_some(price)
    } else {
        None
    }
}

/// Which order-info field produced `filled_amount_quote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillSource {
    /// The venue's filled quote amount.
    Filled,
    /// Filled was absent or zero; the requested total was used instead.
    TotalFallback,
}

impl std::fmt::Display for FillSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filled => write!(f, "filled"),
            Self::TotalFallback => write!(f, "total (fallback)"),
        }
    }
}

// ---------------------------------------------------------------------------
// FX
// ---------------------------------------------------------------------------

/// Outcome of a quote → USD rate lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RateResult {
    Available(f64),
    Unavailable,
}

impl RateResult {
    pub fn rate(&self) -> Option<f64> {
        match self {
            Self::Available(r) => Some(*r),
            Self::Unavailable => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Order record
// ---------------------------------------------------------------------------

/// Result of one execution attempt after fill reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Exchange-assigned order ID.
    pub order_id: String,
    /// Exchange symbol the order was placed on (e.g. `"BTC_THB"`).
    pub symbol: String,
    pub requested_amount_quote: f64,
    pub filled_amount_quote: f64,
    pub fill_source: FillSource,
    pub received_base: f64,
    /// `None` when nothing was confirmed as received.
    pub effective_price: Option<f64>,
    /// Execution time, Unix seconds.
    pub executed_at: i64,
    pub quote_usd_rate: RateResult,
    pub spent_usd: Option<f64>,
}

impl OrderRecord {
    /// Build a record from reconciled order data. USD fields start unavailable.
    pub fn reconcile(
        order_id: String,
        symbol: String,
        requested_amount_quote: f64,
        filled: (f64, FillSource),
        fills: &[FillEvent],
        executed_at: i64,
    ) -> Self {
        let (filled_amount_quote, fill_source) = filled;
        let received_base = total_received_base(fills);
        Self {
            order_id,
            symbol,
            requested_amount_quote,
            filled_amount_quote,
            fill_source,
            received_base,
            effective_price: effective_price(filled_amount_quote, received_base),
            executed_at,
            quote_usd_rate: RateResult::Unavailable,
            spent_usd: None,
        }
    }

    /// Attach the quote → USD rate and derived USD spend.
    pub fn annotate_usd(&mut self, rate: RateResult) {
        self.quote_usd_rate = rate;
        self.spent_usd = rate.rate().map(|r| self.filled_amount_quote * r);
    }

    /// USD price per base unit, when both USD spend and a fill are known.
    pub fn usd_price_per_unit(&self) -> Option<f64> {
        let spent = self.spent_usd?;
        effective_price(spent, self.received_base)
    }

    /// A purchase is confirmed only when a positive base quantity was received.
    pub fn is_confirmed(&self) -> bool {
        self.effective_price.is_some()
    }

    /// Base asset of the symbol (`"BTC"` for `"BTC_THB"`).
    pub fn base_asset(&self) -> &str {
        self.symbol.split('_').next().unwrap_or(&self.symbol)
    }
}
