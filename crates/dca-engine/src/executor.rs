//! Market-buy execution and fill reconciliation.
//!
//! ```text
//! place_market_buy ──► sleep(settle_delay) ──► order_info ──► OrderRecord
//!                                                               │
//!                                            RateProvider ──────┘ (USD, optional)
//! ```
//!
//! There are no internal retries. A failure before the order is accepted is
//! safe to retry on the next cycle because the day-stamp has not moved.

use std::sync::Arc;
use std::time::Duration;

use dca_core::{FillSource, OrderRecord, RateResult};
use dca_td::{ExchangeGateway, GatewayError, OrderInfo};
use thiserror::Error;
use tracing::{info, warn};

use crate::fx::RateProvider;

#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The venue refused the order; nothing was bought.
    #[error("order rejected (code {code}): {source}")]
    Rejected {
        code: i64,
        #[source]
        source: GatewayError,
    },

    /// The order could not be submitted; nothing was bought.
    #[error("order placement failed: {0}")]
    Transport(#[source] GatewayError),

    /// The order was accepted but its fills could not be read back.
    #[error("order {order_id} placed but order info failed: {source}")]
    Lookup {
        order_id: String,
        #[source]
        source: GatewayError,
    },
}

impl ExecutionError {
    /// Order ID, when the venue accepted the order.
    pub fn order_id(&self) -> Option<&str> {
        match self {
            Self::Lookup { order_id, .. } => Some(order_id),
            _ => None,
        }
    }
}

/// Places one market buy and reconciles what was actually received.
pub struct OrderExecutor {
    gateway: Arc<dyn ExchangeGateway>,
    rates: Arc<RateProvider>,
    settle_delay: Duration,
}

impl OrderExecutor {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, rates: Arc<RateProvider>, settle_delay: Duration) -> Self {
        Self {
            gateway,
            rates,
            settle_delay,
        }
    }

    pub async fn execute(&self, symbol: &str, amount_quote: f64) -> Result<OrderRecord, ExecutionError> {
        info!("[exec] placing market buy {symbol} {amount_quote:.2} THB on {}", self.gateway.name());

        let placed = self
            .gateway
            .place_market_buy(symbol, amount_quote)
            .await
            .map_err(|e| match e.venue_code() {
                Some(code) => ExecutionError::Rejected { code, source: e },
                None => ExecutionError::Transport(e),
            })?;

        info!("[exec] order {} accepted; waiting {:?} to settle", placed.order_id, self.settle_delay);
        tokio::time::sleep(self.settle_delay).await;

        let info = self
            .gateway
            .order_info(symbol, &placed.order_id)
            .await
            .map_err(|source| ExecutionError::Lookup {
                order_id: placed.order_id.clone(),
                source,
            })?;

        let executed_at = info
            .ts
            .or(placed.ts)
            .unwrap_or_else(dca_core::time_util::now_secs);
        let mut record = OrderRecord::reconcile(
            placed.order_id,
            symbol.to_string(),
            amount_quote,
            filled_amount(&info, amount_quote),
            &info.fills,
            executed_at,
        );

        if record.is_confirmed() {
            info!(
                "[exec] {symbol} order {}: spent {:.2} THB ({}), received {:.8}",
                record.order_id, record.filled_amount_quote, record.fill_source, record.received_base
            );
        } else {
            warn!(
                "[exec] {symbol} order {}: no confirmed fill after {:?} (status {:?})",
                record.order_id, self.settle_delay, info.status
            );
        }

        let rate = self.rates.quote_rate().await;
        if rate == RateResult::Unavailable {
            warn!("[exec] USD rate unavailable for order {}", record.order_id);
        }
        record.annotate_usd(rate);
        Ok(record)
    }
}

/// Venue-reported filled quote amount, falling back to the order total
/// (then the requested amount) when filled is absent or zero.
fn filled_amount(info: &OrderInfo, requested: f64) -> (f64, FillSource) {
    match info.filled {
        Some(f) if f > 0.0 => (f, FillSource::Filled),
        _ => (info.total.unwrap_or(requested), FillSource::TotalFallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeGateway, FixedRate, PlaceBehavior};
    use dca_core::FillEvent;

    fn rates(rate: Option<f64>) -> Arc<RateProvider> {
        Arc::new(RateProvider::new(vec![Box::new(FixedRate(rate))]))
    }

    fn info(filled: Option<f64>, total: Option<f64>, fills: Vec<FillEvent>) -> OrderInfo {
        OrderInfo {
            order_id: String::new(),
            filled,
            total,
            status: Some("filled".into()),
            fills,
            ts: Some(1_750_000_100),
        }
    }

    fn executor(gateway: FakeGateway, rate: Option<f64>) -> (OrderExecutor, Arc<FakeGateway>) {
        let gateway = Arc::new(gateway);
        let exec = OrderExecutor::new(gateway.clone(), rates(rate), Duration::from_secs(5));
        (exec, gateway)
    }

    #[tokio::test(start_paused = true)]
    async fn reconciles_fills_after_settle_delay() {
        let fills = vec![FillEvent::new(100.0, 50.0), FillEvent::new(50.0, 25.0)];
        let (exec, gateway) = executor(
            FakeGateway::new(PlaceBehavior::Accept, Some(info(Some(150.0), Some(150.0), fills))),
            Some(0.03),
        );

        let start = tokio::time::Instant::now();
        let rec = exec.execute("BTC_THB", 150.0).await.unwrap();

        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(gateway.placements(), vec![("BTC_THB".to_string(), 150.0)]);
        assert_eq!(rec.received_base, 4.0);
        assert_eq!(rec.effective_price, Some(37.5));
        assert_eq!(rec.fill_source, FillSource::Filled);
        assert_eq!(rec.executed_at, 1_750_000_100);
        assert!((rec.spent_usd.unwrap() - 4.5).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_filled_falls_back_to_total() {
        let (exec, _) = executor(
            FakeGateway::new(
                PlaceBehavior::Accept,
                Some(info(Some(0.0), Some(350.0), vec![FillEvent::new(350.0, 1_000_000.0)])),
            ),
            Some(0.03),
        );
        let rec = exec.execute("BTC_THB", 350.0).await.unwrap();
        assert_eq!(rec.filled_amount_quote, 350.0);
        assert_eq!(rec.fill_source, FillSource::TotalFallback);
        assert!(rec.is_confirmed());
    }

    #[tokio::test(start_paused = true)]
    async fn no_fill_is_unconfirmed_not_error() {
        let (exec, _) = executor(
            FakeGateway::new(
                PlaceBehavior::Accept,
                Some(info(None, Some(350.0), vec![FillEvent::new(350.0, 0.0)])),
            ),
            Some(0.03),
        );
        let rec = exec.execute("BTC_THB", 350.0).await.unwrap();
        assert!(!rec.is_confirmed());
        assert_eq!(rec.effective_price, None);
        assert_eq!(rec.received_base, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn fx_outage_is_not_fatal() {
        let (exec, _) = executor(FakeGateway::filling_at(1_000_000.0), None);
        let rec = exec.execute("BTC_THB", 100.0).await.unwrap();
        assert!(rec.is_confirmed());
        assert_eq!(rec.quote_usd_rate, RateResult::Unavailable);
        assert_eq!(rec.spent_usd, None);
    }

    #[tokio::test]
    async fn venue_rejection_carries_code() {
        let (exec, gateway) = executor(FakeGateway::new(PlaceBehavior::Reject(18), None), Some(0.03));
        let err = exec.execute("BTC_THB", 100.0).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Rejected { code: 18, .. }));
        assert!(err.to_string().contains("venue error 18: rejected"));
        assert!(err.order_id().is_none());
        assert!(gateway.placements().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_on_placement() {
        let (exec, _) = executor(FakeGateway::new(PlaceBehavior::Timeout, None), Some(0.03));
        assert!(matches!(
            exec.execute("BTC_THB", 100.0).await,
            Err(ExecutionError::Transport(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_failure_keeps_order_id() {
        let (exec, _) = executor(FakeGateway::new(PlaceBehavior::Accept, None), Some(0.03));
        let err = exec.execute("BTC_THB", 100.0).await.unwrap_err();
        assert_eq!(err.order_id(), Some("1"));
    }
}
