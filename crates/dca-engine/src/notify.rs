//! Human-facing notifications.
//!
//! Every trade outcome and every persistence failure produces one
//! [`Notification`]. Delivery is best-effort: a webhook outage is logged and
//! never changes the outcome of a trade. [`persist_escalation`] carries the
//! manual fix for a day-stamp that could not be saved.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use dca_core::config::NotifyConfig;
use dca_core::{DATE_FORMAT, OrderRecord};
use tracing::{error, info, warn};

/// Message severity; drives embed colour and log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Error,
    /// Requires manual intervention.
    Critical,
}

impl Severity {
    /// Discord embed colour.
    pub fn color(&self) -> u32 {
        match self {
            Self::Success => 0x00FF00,
            Self::Warning => 0xFFA500,
            Self::Error => 0xFF0000,
            Self::Critical => 0x8B0000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub text: String,
}

impl Notification {
    pub fn new(severity: Severity, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Delivery channel for notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Send and swallow delivery errors (logged).
pub async fn deliver(notifier: &dyn Notifier, notification: &Notification) {
    if let Err(e) = notifier.notify(notification).await {
        error!("[notify] delivery failed ({:?} {:?}): {e:#}", notification.severity, notification.title);
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Posts a single embed to a Discord webhook.
pub struct DiscordWebhook {
    url: String,
    http: reqwest::Client,
    tz: Tz,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>, timeout: Duration, tz: Tz) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .context("failed to build HTTP client")?,
            tz,
        })
    }

    fn payload(&self, n: &Notification) -> serde_json::Value {
        serde_json::json!({
            "embeds": [{
                "title": n.title,
                "description": n.text,
                "color": n.severity.color(),
                "timestamp": chrono::Utc::now().with_timezone(&self.tz).to_rfc3339(),
            }]
        })
    }
}

#[async_trait]
impl Notifier for DiscordWebhook {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.http
            .post(&self.url)
            .json(&self.payload(notification))
            .send()
            .await
            .context("webhook request failed")?
            .error_for_status()
            .context("webhook HTTP error")?;
        Ok(())
    }
}

/// Writes notifications to the log; used when no webhook is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, n: &Notification) -> Result<()> {
        match n.severity {
            Severity::Success => info!("[notify] {}: {}", n.title, n.text),
            Severity::Warning => warn!("[notify] {}: {}", n.title, n.text),
            Severity::Error | Severity::Critical => error!("[notify] {}: {}", n.title, n.text),
        }
        Ok(())
    }
}

/// Webhook when configured, log otherwise.
pub fn from_config(config: &NotifyConfig, tz: Tz) -> Result<Box<dyn Notifier>> {
    match config.discord_webhook_url.as_deref() {
        Some(url) => Ok(Box::new(DiscordWebhook::new(
            url,
            Duration::from_secs(config.timeout_secs.max(1)),
            tz,
        )?)),
        None => Ok(Box::new(LogNotifier)),
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Confirmed purchase.
pub fn trade_success(title: &str, record: &OrderRecord, tz: Tz) -> Notification {
    let base = record.base_asset();
    let usd = record
        .spent_usd
        .map(|v| format!("${v:.2}"))
        .unwrap_or_else(|| "unavailable".into());
    let rate = record
        .effective_price
        .map(|p| format!("{p:.2} THB"))
        .unwrap_or_else(|| "n/a".into());
    let text = format!(
        "✅ **DCA Buy Executed!**\n\
         🔹 **Pair:** {}\n\
         💰 **Spent:** {:.2} THB ({})\n\
         💵 **Spent (USD):** {usd}\n\
         📥 **Received:** {:.8} {base}\n\
         🏷️ **Rate:** {rate}\n\
         🕒 **Time:** {}\n\
         🆔 **Order ID:** {}",
        record.symbol,
        record.filled_amount_quote,
        record.fill_source,
        record.received_base,
        format_ts(record.executed_at, tz),
        record.order_id,
    );
    Notification::new(Severity::Success, title, text)
}

/// Order placed but no positive fill could be confirmed.
pub fn trade_unconfirmed(title: &str, record: &OrderRecord) -> Notification {
    let text = format!(
        "⚠️ **DCA Buy Unconfirmed ({})**\n\
         Order {} was placed for {:.2} THB but no filled quantity could be confirmed, \
         so no price could be computed. The day-stamp was NOT updated; check the order \
         on the exchange before the next scheduled run.",
        record.symbol, record.order_id, record.requested_amount_quote,
    );
    Notification::new(Severity::Warning, title, text)
}

/// Order placement or reconciliation failed.
pub fn trade_failed(title: &str, symbol: &str, reason: &str) -> Notification {
    Notification::new(Severity::Error, title, format!("❌ **DCA Failed ({symbol})**: {reason}"))
}

/// Trade succeeded but USD conversion is unavailable.
pub fn fx_unavailable(title: &str, symbol: &str) -> Notification {
    Notification::new(
        Severity::Warning,
        title,
        format!(
            "⚠️ **FX Rate Fetch Failed**\n\
             Trade for {symbol} executed successfully but USD conversion is unavailable.\n\
             All currency exchange API sources failed."
        ),
    )
}

/// The day-stamp write failed after a real purchase.
pub fn persist_escalation(asset_key: &str, date: NaiveDate, attempts: u32, last_error: &str) -> Notification {
    let date = date.format(DATE_FORMAT);
    let text = format!(
        "🚨 **CRITICAL: LAST_BUY_DATE UPDATE FAILED** 🚨\n\
         Symbol: {asset_key}\n\
         Date: {date}\n\
         Attempts: {attempts}\n\
         Error: {last_error}\n\n\
         ⚠️ **DOUBLE-BUY RISK**: The trade was executed but the safeguard was not updated!\n\
         **ACTION REQUIRED**: Manually set `LAST_BUY_DATE` to `{date}` for `{asset_key}` in the target map."
    );
    Notification::new(Severity::Critical, "CRITICAL: LAST_BUY_DATE update failed", text)
}

fn format_ts(ts: i64, tz: Tz) -> String {
    tz.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
