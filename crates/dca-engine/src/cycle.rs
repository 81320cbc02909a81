//! One scheduling cycle.
//!
//! ```text
//! TargetStore::get ─► for each enabled asset (sequential):
//!     resolve ─► authorize ─► execute ─► notify ─► persist (confirmed only)
//! ```
//!
//! The map is read once per cycle and carried in memory; each successful
//! day-stamp is applied to it before the next asset, so a later write-back
//! never drops an earlier asset's stamp.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use dca_core::error::DcaError;
use dca_core::time_util::Clock;
use dca_core::{AssetConfig, Defaults, OrderRecord, RateResult, TargetMap};
use dca_td::ExchangeGateway;
use dca_td::bitkub::symbol_mapper::to_exchange_symbol;
use tracing::{error, info, warn};

use crate::executor::OrderExecutor;
use crate::fx::RateProvider;
use crate::guard::{self, Authorization};
use crate::notify::{self, Notifier};
use crate::persister::{RetryPolicy, StatePersister};
use crate::resolver;
use crate::store::{StoreError, TargetStore};

/// Non-component settings for a cycle.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub defaults: Defaults,
    pub settle_delay: Duration,
    pub retry: RetryPolicy,
    /// Title used on trade notifications.
    pub title: String,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            settle_delay: Duration::from_secs(5),
            retry: RetryPolicy::default(),
            title: "Crypto DCA Execution".into(),
        }
    }
}

/// What happened to one asset.
#[derive(Debug)]
pub enum AssetOutcome {
    /// Not authorized this cycle.
    Skipped { key: String, reason: Authorization },
    /// The entry could not be decoded; nothing was ordered.
    Invalid { key: String, error: String },
    /// Bought and day-stamped.
    Bought { key: String, record: OrderRecord, attempts: u32 },
    /// Order placed but no fill confirmed; not day-stamped.
    Unconfirmed { key: String, record: OrderRecord },
    /// Order could not be placed or read back.
    Failed { key: String, error: String },
    /// Bought, but the day-stamp was not saved.
    PersistFailed { key: String, record: OrderRecord, error: String },
}

impl AssetOutcome {
    pub fn key(&self) -> &str {
        match self {
            Self::Skipped { key, .. }
            | Self::Invalid { key, .. }
            | Self::Bought { key, .. }
            | Self::Unconfirmed { key, .. }
            | Self::Failed { key, .. }
            | Self::PersistFailed { key, .. } => key,
        }
    }
}

#[derive(Debug)]
pub struct CycleReport {
    /// Trading-timezone date the cycle ran for.
    pub date: NaiveDate,
    pub outcomes: Vec<AssetOutcome>,
}

impl CycleReport {
    /// A purchase happened whose day-stamp could not be saved.
    pub fn has_fatal(&self) -> bool {
        self.outcomes.iter().any(|o| matches!(o, AssetOutcome::PersistFailed { .. }))
    }

    pub fn bought(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, AssetOutcome::Bought { .. } | AssetOutcome::PersistFailed { .. }))
            .count()
    }
}

/// Resolved configuration and authorization for every enabled asset.
///
/// An undecodable entry yields an error in its own slot.
pub fn plan(
    map: &TargetMap,
    defaults: &Defaults,
    now: &DateTime<Tz>,
) -> Vec<Result<(AssetConfig, Authorization), DcaError>> {
    resolver::enabled_assets(map)
        .iter()
        .map(|asset| {
            let config = resolver::resolve(asset, map, defaults)?;
            let auth = guard::authorize(&config, now);
            Ok((config, auth))
        })
        .collect()
}

pub struct DcaCycle {
    store: Arc<dyn TargetStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    executor: OrderExecutor,
    persister: StatePersister,
    defaults: Defaults,
    title: String,
}

impl DcaCycle {
    pub fn new(
        store: Arc<dyn TargetStore>,
        gateway: Arc<dyn ExchangeGateway>,
        rates: Arc<RateProvider>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: CycleSettings,
    ) -> Self {
        let executor = OrderExecutor::new(gateway, rates, settings.settle_delay);
        let persister = StatePersister::new(
            store.clone(),
            notifier.clone(),
            settings.retry,
            settings.defaults.amount_quote,
        );
        Self {
            store,
            notifier,
            clock,
            executor,
            persister,
            defaults: settings.defaults,
            title: settings.title,
        }
    }

    /// Read the target map. A missing map is empty; anything else that fails
    /// is fatal for the cycle.
    pub async fn load_map(&self) -> Result<TargetMap> {
        match self.store.get().await {
            Ok(map) => Ok(map),
            Err(StoreError::NotFound) => {
                warn!("[cycle] no target map in {} store; nothing to do", self.store.name());
                Ok(TargetMap::new())
            }
            Err(e) => Err(e).with_context(|| format!("failed to read target map from {} store", self.store.name())),
        }
    }

    pub async fn run(&self) -> Result<CycleReport> {
        let mut map = self.load_map().await?;
        let now = self.clock.now();
        let date = now.date_naive();
        info!(
            "[cycle] starting at {} ({} assets: {:?})",
            now.format("%Y-%m-%d %H:%M:%S %Z"),
            map.len(),
            map.keys().collect::<Vec<_>>()
        );

        let mut outcomes = Vec::new();
        for asset in resolver::enabled_assets(&map) {
            let outcome = self.run_asset(&asset, &mut map).await;
            outcomes.push(outcome);
        }

        let report = CycleReport { date, outcomes };
        info!("[cycle] done: {} assets, {} bought", report.outcomes.len(), report.bought());
        Ok(report)
    }

    async fn run_asset(&self, asset: &str, map: &mut TargetMap) -> AssetOutcome {
        let config = match resolver::resolve(asset, map, &self.defaults) {
            Ok(config) => config,
            Err(e) => {
                error!("[cycle] {asset}: {e}; entry left untouched");
                let n = notify::trade_failed(&self.title, asset.trim(), &e.to_string());
                notify::deliver(self.notifier.as_ref(), &n).await;
                return AssetOutcome::Invalid {
                    key: asset.to_string(),
                    error: e.to_string(),
                };
            }
        };
        let now = self.clock.now();
        let auth = guard::authorize(&config, &now);
        let key = config.asset_key.clone();

        if !auth.is_authorized() {
            info!("[cycle] {key}: skip ({auth:?})");
            return AssetOutcome::Skipped { key, reason: auth };
        }

        let symbol = to_exchange_symbol(&key);
        info!("[cycle] {key}: authorized ({auth:?}), buying {symbol} for {:.2} THB", config.amount_quote);

        let record = match self.executor.execute(&symbol, config.amount_quote).await {
            Ok(record) => record,
            Err(e) => {
                error!("[cycle] {key}: {e}");
                let n = notify::trade_failed(&self.title, &symbol, &e.to_string());
                notify::deliver(self.notifier.as_ref(), &n).await;
                return AssetOutcome::Failed {
                    key,
                    error: e.to_string(),
                };
            }
        };

        if !record.is_confirmed() {
            let n = notify::trade_unconfirmed(&self.title, &record);
            notify::deliver(self.notifier.as_ref(), &n).await;
            return AssetOutcome::Unconfirmed { key, record };
        }

        let n = notify::trade_success(&self.title, &record, now.timezone());
        notify::deliver(self.notifier.as_ref(), &n).await;
        if record.quote_usd_rate == RateResult::Unavailable {
            let n = notify::fx_unavailable(&self.title, &symbol);
            notify::deliver(self.notifier.as_ref(), &n).await;
        }

        match self.persister.persist(map, &key, now.date_naive()).await {
            Ok(receipt) => AssetOutcome::Bought {
                key,
                record,
                attempts: receipt.attempts,
            },
            Err(e) => AssetOutcome::PersistFailed {
                key,
                record,
                error: e.to_string(),
            },
        }
    }
}
