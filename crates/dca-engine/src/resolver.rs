//! Asset configuration resolution.
//!
//! Maps an asset identifier plus the raw [`TargetMap`] to an
//! [`AssetConfig`]. An asset with no entry still resolves, to defaults, and
//! callers decide whether to skip it. Only an entry that exists but cannot be
//! decoded fails, and only for that asset.

use dca_core::error::DcaError;
use dca_core::{AssetConfig, Defaults, Schedule, TargetEntry, TargetMap};
use dca_td::bitkub::symbol_mapper::alternate_key;
use tracing::warn;

/// Resolve the trading configuration for `asset`.
///
/// Lookup order is `asset` itself, then its `BASE/USDT` spelling; the key that
/// hit becomes [`AssetConfig::asset_key`] so write-back lands on the same entry.
pub fn resolve(asset: &str, map: &TargetMap, defaults: &Defaults) -> Result<AssetConfig, DcaError> {
    let candidates = [asset.to_string(), alternate_key(asset)];
    let found = candidates
        .iter()
        .find_map(|key| map.get(key).map(|entry| (key.as_str(), entry)));

    let mut config = AssetConfig {
        asset_key: asset.to_string(),
        schedule: defaults.schedule.clone(),
        amount_quote: defaults.amount_quote,
        buy_enabled: true,
        last_buy_date: None,
    };

    let Some((key, entry)) = found else {
        warn!("[resolve] no config found for {asset}, using defaults");
        return Ok(config);
    };
    config.asset_key = key.to_string();

    match entry {
        TargetEntry::Legacy(time) => {
            config.schedule = Schedule::parse(time);
        }
        TargetEntry::Structured(rec) => {
            if let Some(time) = rec.time.as_deref() {
                config.schedule = Schedule::parse(time);
            }
            config.amount_quote = rec
                .amount_value()
                .filter(|a| a.is_finite() && *a > 0.0)
                .unwrap_or(defaults.amount_quote);
            config.buy_enabled = rec.buy_enabled.unwrap_or(true);
            config.last_buy_date = rec.last_buy_date_value();
        }
        TargetEntry::Invalid(_) => {
            return Err(DcaError::InvalidEntry {
                key: key.to_string(),
                reason: entry.decode_error().unwrap_or_default(),
            });
        }
    }
    Ok(config)
}

/// Keys to process this cycle: non-blank and not explicitly disabled.
///
/// Keys are returned as stored so resolution and write-back hit the same
/// entry; only the exchange symbol is derived from the trimmed form.
pub fn enabled_assets(map: &TargetMap) -> Vec<String> {
    map.iter()
        .filter(|(key, entry)| !key.trim().is_empty() && entry.is_enabled())
        .map(|(key, _)| key.to_string())
        .collect()
}
