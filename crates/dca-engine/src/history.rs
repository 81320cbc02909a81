//! Past buys for one asset, read back from the venue.
//!
//! Used to confirm by hand what the scheduler actually bought, e.g. before
//! fixing a `LAST_BUY_DATE` after a failed write-back.

use anyhow::{Context, Result};
use chrono::TimeZone;
use chrono_tz::Tz;
use dca_td::bitkub::symbol_mapper::to_exchange_symbol;
use dca_td::{ExchangeGateway, HistoricalOrder};

/// Most recent `limit` buys for the asset behind `asset_key`, newest first.
pub async fn recent_buys(gateway: &dyn ExchangeGateway, asset_key: &str, limit: usize) -> Result<Vec<HistoricalOrder>> {
    let symbol = to_exchange_symbol(asset_key);
    let mut orders = gateway
        .order_history(&symbol)
        .await
        .with_context(|| format!("failed to read order history for {symbol}"))?;
    orders.retain(|o| o.side == "buy");
    orders.sort_by(|a, b| b.ts.cmp(&a.ts));
    orders.truncate(limit);
    Ok(orders)
}

/// One display line, timestamp in the trading timezone.
pub fn format_row(order: &HistoricalOrder, tz: Tz) -> String {
    let when = tz
        .timestamp_opt(order.ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| order.ts.to_string());
    format!(
        "{when}  order={:<12} amount={:.2} rate={:.2} fee={:.2}",
        order.order_id, order.amount, order.rate, order.fee
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeGateway;

    fn order(id: &str, side: &str, ts: i64) -> HistoricalOrder {
        HistoricalOrder {
            txn_id: format!("BTCBUY{id}"),
            order_id: id.into(),
            side: side.into(),
            order_type: "market".into(),
            rate: 3_500_000.0,
            amount: 100.0,
            fee: 0.25,
            ts,
        }
    }

    #[tokio::test]
    async fn keeps_buys_newest_first() {
        let gateway = FakeGateway::filling_at(1.0).with_history(vec![
            order("1", "buy", 1_750_000_000),
            order("2", "sell", 1_750_100_000),
            order("3", "buy", 1_750_200_000),
            order("4", "buy", 1_749_000_000),
        ]);

        let buys = recent_buys(&gateway, "btc/usdt", 2).await.unwrap();
        let ids: Vec<_> = buys.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, ["3", "1"]);
    }

    #[test]
    fn row_uses_trading_timezone() {
        let row = format_row(&order("289", "buy", 1_750_000_000), chrono_tz::Asia::Bangkok);
        assert!(row.starts_with("2025-06-15 22:06:40"));
        assert!(row.contains("order=289"));
        assert!(row.contains("amount=100.00"));
        assert!(row.contains("fee=0.25"));
    }
}
