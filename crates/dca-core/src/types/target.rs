//! Target map and resolved per-asset trading configuration.
//!
//! The target map is the single JSON object that drives every cycle. It is
//! owned by an external store and holds, per asset key, either a bare
//! `"HH:MM"` string (legacy shape) or a structured record:
//!
//! ```json
//! {
//!   "BTC_THB": {"TIME": "07:00", "AMOUNT": 800, "BUY_ENABLED": true, "LAST_BUY_DATE": "2025-01-31"},
//!   "ETH_THB": "21:30"
//! }
//! ```
//!
//! Unknown keys inside a structured record survive a decode/encode cycle so
//! that fields written by other tools are never dropped on write-back.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::DcaError;

/// Date format used for `LAST_BUY_DATE`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time-of-day format used for `TIME`.
pub const TIME_FORMAT: &str = "%H:%M";

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Structured per-asset record as stored in the target map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    #[serde(rename = "TIME", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Kept as raw JSON: humans write `800`, `800.5` or `"800"`.
    #[serde(rename = "AMOUNT", default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<serde_json::Value>,

    #[serde(rename = "BUY_ENABLED", default, skip_serializing_if = "Option::is_none")]
    pub buy_enabled: Option<bool>,

    #[serde(rename = "LAST_BUY_DATE", default, skip_serializing_if = "Option::is_none")]
    pub last_buy_date: Option<String>,

    /// Fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TargetRecord {
    /// Build a structured record from a legacy bare time string.
    pub fn from_legacy(time: &str, default_amount: f64) -> Self {
        Self {
            time: Some(time.to_string()),
            amount: serde_json::Number::from_f64(default_amount).map(serde_json::Value::Number),
            buy_enabled: Some(true),
            last_buy_date: None,
            extra: serde_json::Map::new(),
        }
    }

    /// `AMOUNT` as a number, accepting numeric strings.
    ///
    /// Returns `None` when the field is absent or not a number.
    pub fn amount_value(&self) -> Option<f64> {
        match self.amount.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// `LAST_BUY_DATE` as a date. Empty or unparseable values are absent.
    pub fn last_buy_date_value(&self) -> Option<NaiveDate> {
        let raw = self.last_buy_date.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
    }
}

/// One target-map entry: a legacy time string or a structured record.
///
/// Anything else is kept verbatim as [`TargetEntry::Invalid`] so one bad
/// entry neither hides its siblings nor gets lost on write-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetEntry {
    Legacy(String),
    Structured(TargetRecord),
    Invalid(serde_json::Value),
}

impl TargetEntry {
    /// Whether the entry allows buying. Legacy entries are always enabled.
    ///
    /// Invalid entries count as enabled so they are reported, not skipped.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Legacy(_) | Self::Invalid(_) => true,
            Self::Structured(rec) => rec.buy_enabled.unwrap_or(true),
        }
    }

    /// Why an [`Invalid`](Self::Invalid) entry could not be decoded.
    pub fn decode_error(&self) -> Option<String> {
        let Self::Invalid(raw) = self else {
            return None;
        };
        Some(match serde_json::from_value::<TargetRecord>(raw.clone()) {
            Err(e) => e.to_string(),
            Ok(_) => format!("expected \"HH:MM\" or an object, got {raw}"),
        })
    }
}

/// Asset key → entry. Serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetMap(BTreeMap<String, TargetEntry>);

impl TargetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a target map from its stored JSON text.
    ///
    /// An empty or whitespace-only value decodes to an empty map.
    pub fn parse(json: &str) -> Result<Self, DcaError> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(json).map_err(|e| DcaError::MalformedTargetMap(e.to_string()))
    }

    /// Compact JSON encoding used for write-back.
    pub fn to_json(&self) -> String {
        // A BTreeMap<String, _> of serde-derived values cannot fail to encode.
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn get(&self, key: &str) -> Option<&TargetEntry> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut TargetEntry> {
        self.0.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: TargetEntry) -> Option<TargetEntry> {
        self.0.insert(key.into(), entry)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TargetEntry)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, TargetEntry)> for TargetMap {
    fn from_iter<I: IntoIterator<Item = (String, TargetEntry)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// A parsed time-of-day schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Trade at this local time of day.
    At(NaiveTime),
    /// The configured value was not `HH:MM`; never trades.
    Invalid(String),
}

impl Schedule {
    pub fn parse(raw: &str) -> Self {
        match NaiveTime::parse_from_str(raw.trim(), TIME_FORMAT) {
            Ok(t) => Self::At(t),
            Err(_) => Self::Invalid(raw.to_string()),
        }
    }

    /// Strict variant of [`parse`](Self::parse) for process configuration.
    pub fn try_parse(raw: &str) -> Result<Self, DcaError> {
        match Self::parse(raw) {
            Self::Invalid(s) => Err(DcaError::InvalidTime(s)),
            ok => Ok(ok),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(t) => write!(f, "{}", t.format(TIME_FORMAT)),
            Self::Invalid(raw) => write!(f, "invalid({raw})"),
        }
    }
}

/// Process-wide fallbacks used when an entry omits a field.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    pub schedule: Schedule,
    pub amount_quote: f64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            schedule: Schedule::At(NaiveTime::from_hms_opt(7, 0, 0).unwrap_or(NaiveTime::MIN)),
            amount_quote: 20.0,
        }
    }
}

/// Fully resolved trading configuration for one asset.
///
/// Rebuilt from the target map on every cycle; `amount_quote` is always > 0.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetConfig {
    /// Key the entry was found under; write-back uses this key.
    pub asset_key: String,
    pub schedule: Schedule,
    pub amount_quote: f64,
    pub buy_enabled: bool,
    pub last_buy_date: Option<NaiveDate>,
}
