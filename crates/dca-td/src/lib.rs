//! # dca-td
//!
//! Trading (order execution) gateway for the DCA runner.
//!
//! Each exchange implements the [`ExchangeGateway`] trait, which provides a
//! uniform interface for market-buy placement, order lookup, balances, and
//! trade history. The engine only ever talks to the trait, so tests drive it
//! with in-process fakes.
//!
//! ## Supported exchanges
//!
//! | Exchange | Module   | Quote | Order channel |
//! |----------|----------|-------|---------------|
//! | Bitkub   | `bitkub` | THB   | REST (v3)     |

pub mod bitkub;
pub mod error;
pub mod json_util;
pub mod model;
pub mod registry;

use std::collections::BTreeMap;

use async_trait::async_trait;

pub use error::{GatewayError, GatewayResult};
pub use model::{Balance, HistoricalOrder, OrderInfo, PlacedOrder};

/// Trait implemented by all trading gateways.
///
/// Calls are independent request/response exchanges; none of them retry
/// internally. A failed call surfaces as a [`GatewayError`] and the caller
/// decides whether the enclosing cycle can be retried later.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Human-readable gateway name.
    fn name(&self) -> &str;

    /// Submit a market buy spending `amount_quote` of the quote currency.
    ///
    /// A venue error code is returned as [`GatewayError::Venue`].
    async fn place_market_buy(&self, symbol: &str, amount_quote: f64) -> GatewayResult<PlacedOrder>;

    /// Fetch order detail and fill history for a buy order.
    async fn order_info(&self, symbol: &str, order_id: &str) -> GatewayResult<OrderInfo>;

    /// Fetch all wallet balances keyed by currency.
    async fn balances(&self) -> GatewayResult<BTreeMap<String, Balance>>;

    /// Fetch executed trades for a symbol, newest first.
    async fn order_history(&self, symbol: &str) -> GatewayResult<Vec<HistoricalOrder>>;
}
