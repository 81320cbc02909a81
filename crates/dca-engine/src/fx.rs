//! Quote-currency → USD conversion rates.
//!
//! Rates only annotate a trade record, so failure here is never fatal: the
//! provider walks its sources in order and reports
//! [`RateResult::Unavailable`] when every one fails.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use dca_core::RateResult;
use dca_core::config::FxConfig;
use tracing::{error, warn};

/// One independent rate source.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the current rate (USD per one unit of quote currency).
    async fn fetch(&self) -> Result<f64>;
}

/// Source returning `{"rates": {"USD": <rate>, ...}}`.
///
/// Both Frankfurter and open.er-api use this shape.
pub struct JsonRateSource {
    name: String,
    url: String,
    http: reqwest::Client,
}

impl JsonRateSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            url: url.into(),
            http: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .context("failed to build HTTP client")?,
        })
    }
}

#[async_trait]
impl RateSource for JsonRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<f64> {
        let body: serde_json::Value = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        extract_usd_rate(&body)
    }
}

/// Read `rates.USD` from a rate response.
pub fn extract_usd_rate(body: &serde_json::Value) -> Result<f64> {
    body.get("rates")
        .and_then(|r| r.get("USD"))
        .and_then(|v| v.as_f64())
        .ok_or_else(|| anyhow!("response has no rates.USD"))
}

/// Ordered list of rate sources.
pub struct RateProvider {
    sources: Vec<Box<dyn RateSource>>,
}

impl RateProvider {
    pub fn new(sources: Vec<Box<dyn RateSource>>) -> Self {
        Self { sources }
    }

    /// Primary Frankfurter, secondary open.er-api, as configured.
    pub fn from_config(config: &FxConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        Ok(Self::new(vec![
            Box::new(JsonRateSource::new("frankfurter", &config.primary_url, timeout)?),
            Box::new(JsonRateSource::new("open-er-api", &config.secondary_url, timeout)?),
        ]))
    }

    /// First positive, finite rate from the sources, in order.
    pub async fn quote_rate(&self) -> RateResult {
        for source in &self.sources {
            match source.fetch().await {
                Ok(rate) if rate.is_finite() && rate > 0.0 => return RateResult::Available(rate),
                Ok(rate) => warn!("[fx] {} returned unusable rate {rate}", source.name()),
                Err(e) => warn!("[fx] {} failed: {e:#}", source.name()),
            }
        }
        error!("[fx] all rate sources failed; USD values will be unavailable");
        RateResult::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        result: Option<f64>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RateSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.ok_or_else(|| anyhow!("down"))
        }
    }

    fn source(result: Option<f64>) -> (Box<dyn RateSource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Box::new(Fixed { result, calls: Arc::clone(&calls) }), calls)
    }

    #[tokio::test]
    async fn primary_wins_when_available() {
        let (a, a_calls) = source(Some(0.028));
        let (b, b_calls) = source(Some(0.03));
        let provider = RateProvider::new(vec![a, b]);
        assert_eq!(provider.quote_rate().await, RateResult::Available(0.028));
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_to_secondary() {
        let (a, _) = source(None);
        let (b, _) = source(Some(0.03));
        assert_eq!(RateProvider::new(vec![a, b]).quote_rate().await, RateResult::Available(0.03));

        let (zero, _) = source(Some(0.0));
        let (b, _) = source(Some(0.031));
        assert_eq!(RateProvider::new(vec![zero, b]).quote_rate().await, RateResult::Available(0.031));
    }

    #[tokio::test]
    async fn all_failing_is_unavailable_not_error() {
        let (a, _) = source(None);
        let (b, _) = source(None);
        assert_eq!(RateProvider::new(vec![a, b]).quote_rate().await, RateResult::Unavailable);
        assert_eq!(RateProvider::new(vec![]).quote_rate().await, RateResult::Unavailable);
    }

    #[test]
    fn extracts_usd_rate() {
        let body = serde_json::json!({"amount": 1.0, "base": "THB", "rates": {"USD": 0.0294}});
        assert_eq!(extract_usd_rate(&body).unwrap(), 0.0294);
        assert!(extract_usd_rate(&serde_json::json!({"result": "error"})).is_err());
    }
}
