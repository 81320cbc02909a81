//! Bitkub trading module.
//!
//! Implements [`ExchangeGateway`](crate::ExchangeGateway) for the Bitkub
//! spot exchange (THB markets) over the v3 REST API.
//!
//! # Architecture
//!
//! ```text
//! BitkubTd
//! └── MarketClient   (server-time sync + HMAC-signed REST)
//! ```
//!
//! Every call is a single request/response; there are no background tasks
//! and nothing to shut down.

pub mod auth;
pub mod config;
pub mod market;
pub mod symbol_mapper;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use dca_core::FillEvent;
use serde::Serialize;
use tracing::{info, warn};

use self::config::{BitkubTdConfig, PATH_BALANCES, PATH_ORDER_HISTORY, PATH_ORDER_INFO, PATH_PLACE_BID};
use self::market::{MarketClient, to_unix_secs};
use crate::error::{GatewayError, GatewayResult};
use crate::json_util::{parse_f64_field, parse_id, parse_str_i64};
use crate::model::{Balance, HistoricalOrder, OrderInfo, PlacedOrder};

/// `place-bid` request body. Field order is the signed byte order.
#[derive(Debug, Serialize)]
struct PlaceBidBody<'a> {
    sym: &'a str,
    amt: f64,
    /// 0 for market orders.
    rat: u8,
    typ: &'static str,
}

/// Bitkub trading gateway.
pub struct BitkubTd {
    client: MarketClient,
}

impl BitkubTd {
    /// Create a new Bitkub gateway from the generic exchange section.
    pub fn new(config: &dca_core::config::ExchangeConfig) -> Result<Self> {
        let td_config = BitkubTdConfig::from(config);
        if !td_config.has_credentials() {
            warn!("[bitkub] API credentials not configured; secure calls will fail");
        }
        Ok(Self {
            client: MarketClient::new(td_config)?,
        })
    }
}

#[async_trait]
impl crate::ExchangeGateway for BitkubTd {
    fn name(&self) -> &str {
        "bitkub"
    }

    async fn place_market_buy(&self, symbol: &str, amount_quote: f64) -> GatewayResult<PlacedOrder> {
        let body = PlaceBidBody {
            sym: symbol,
            amt: amount_quote,
            rat: 0,
            typ: "market",
        };
        let result = self.client.signed_post(PATH_PLACE_BID, &body).await?;
        let placed = parse_placed_order(&result, amount_quote)?;
        info!("[bitkub] placed market bid {symbol} {amount_quote} THB → order {}", placed.order_id);
        Ok(placed)
    }

    async fn order_info(&self, symbol: &str, order_id: &str) -> GatewayResult<OrderInfo> {
        let result = self
            .client
            .signed_get(PATH_ORDER_INFO, &[("sym", symbol), ("id", order_id), ("sd", "buy")])
            .await?;
        parse_order_info(&result, order_id)
    }

    async fn balances(&self) -> GatewayResult<BTreeMap<String, Balance>> {
        let result = self.client.signed_post(PATH_BALANCES, &serde_json::json!({})).await?;
        parse_balances(&result)
    }

    async fn order_history(&self, symbol: &str) -> GatewayResult<Vec<HistoricalOrder>> {
        let result = self.client.signed_get(PATH_ORDER_HISTORY, &[("sym", symbol)]).await?;
        parse_order_history(&result)
    }
}

// ---------------------------------------------------------------------------
// JSON → typed helpers
// ---------------------------------------------------------------------------

/// Parse the `result` of `place-bid`.
fn parse_placed_order(v: &serde_json::Value, requested: f64) -> GatewayResult<PlacedOrder> {
    let order_id = parse_id(v.get("id")).ok_or_else(|| GatewayError::Decode("place-bid result has no order id".into()))?;
    Ok(PlacedOrder {
        order_id,
        amount_quote: parse_f64_field(v, "amt").unwrap_or(requested),
        ts: parse_str_i64(v.get("ts")).map(to_unix_secs),
    })
}

/// Parse the `result` of `order-info`.
///
/// History fragments missing either `amount` or `rate` are dropped; a
/// fragment with a zero rate is kept and contributes nothing downstream.
fn parse_order_info(v: &serde_json::Value, order_id: &str) -> GatewayResult<OrderInfo> {
    if !v.is_object() {
        return Err(GatewayError::Decode("order-info result is not an object".into()));
    }
    let fills = v
        .get("history")
        .and_then(|h| h.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|t| Some(FillEvent::new(parse_f64_field(t, "amount")?, parse_f64_field(t, "rate")?)))
                .collect()
        })
        .unwrap_or_default();

    Ok(OrderInfo {
        order_id: parse_id(v.get("id")).unwrap_or_else(|| order_id.to_string()),
        filled: parse_f64_field(v, "filled"),
        total: parse_f64_field(v, "total"),
        status: v.get("status").and_then(|s| s.as_str()).map(str::to_string),
        fills,
        ts: parse_str_i64(v.get("ts")).map(to_unix_secs),
    })
}

/// Parse the `result` of `balances`.
fn parse_balances(v: &serde_json::Value) -> GatewayResult<BTreeMap<String, Balance>> {
    let obj = v
        .as_object()
        .ok_or_else(|| GatewayError::Decode("balances result is not an object".into()))?;
    Ok(obj
        .iter()
        .map(|(currency, b)| {
            let balance = Balance {
                available: parse_f64_field(b, "available").unwrap_or(0.0),
                reserved: parse_f64_field(b, "reserved").unwrap_or(0.0),
            };
            (currency.to_uppercase(), balance)
        })
        .collect())
}

/// Parse the `result` of `my-order-history`.
fn parse_order_history(v: &serde_json::Value) -> GatewayResult<Vec<HistoricalOrder>> {
    let arr = v
        .as_array()
        .ok_or_else(|| GatewayError::Decode("order history result is not an array".into()))?;
    Ok(arr
        .iter()
        .filter_map(|o| {
            Some(HistoricalOrder {
                txn_id: parse_id(o.get("txn_id")).unwrap_or_default(),
                order_id: parse_id(o.get("order_id"))?,
                side: o.get("side")?.as_str()?.to_lowercase(),
                order_type: o.get("type").and_then(|t| t.as_str()).unwrap_or_default().to_string(),
                rate: parse_f64_field(o, "rate").unwrap_or(0.0),
                amount: parse_f64_field(o, "amount").unwrap_or(0.0),
                fee: parse_f64_field(o, "fee").unwrap_or(0.0),
                ts: parse_str_i64(o.get("ts")).map(to_unix_secs).unwrap_or(0),
            })
        })
        .collect())
}
