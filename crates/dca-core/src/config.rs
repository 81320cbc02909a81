//! Process configuration.
//!
//! Settings come from an optional JSON file; every field has a default so an
//! empty file (or no file at all) is valid. Secrets and deployment-specific
//! values are then overlaid from environment variables, which is how the
//! scheduled job receives them.
//!
//! # Example config
//!
//! ```json
//! {
//!   "exchange": { "exchange": "bitkub", "rest_url": "https://api.bitkub.com" },
//!   "schedule": { "timezone": "Asia/Bangkok", "default_time": "07:00", "default_amount_quote": 20 },
//!   "persist": { "max_attempts": 3, "retry_delays_secs": [1, 3, 5] },
//!   "store": { "kind": "github", "variable_name": "DCA_TARGET_MAP" },
//!   "notify": { "title": "Crypto DCA Execution" }
//! }
//! ```
//!
//! # Environment overrides
//!
//! | Variable              | Field                          |
//! |-----------------------|--------------------------------|
//! | `BITKUB_API_KEY`      | `exchange.api_key`             |
//! | `BITKUB_API_SECRET`   | `exchange.api_secret`          |
//! | `TIMEZONE`            | `schedule.timezone`            |
//! | `DCA_TARGET_TIME`     | `schedule.default_time`        |
//! | `DCA_AMOUNT_THB`      | `schedule.default_amount_quote`|
//! | `GIST_TOKEN`, `GITHUB_TOKEN` | `store.github_token` (first set wins) |
//! | `GITHUB_REPOSITORY`   | `store.github_repository`      |
//! | `DCA_TARGET_FILE`     | `store.file_path` (switches kind to `file`) |
//! | `DISCORD_WEBHOOK_URL` | `notify.discord_webhook_url`   |

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::error::DcaError;
use crate::time_util::{DEFAULT_TIMEZONE, parse_timezone};
use crate::types::{Defaults, Schedule};

/// Top-level application config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    pub schedule: ScheduleConfig,
    pub persist: PersistConfig,
    pub store: StoreConfig,
    pub fx: FxConfig,
    pub notify: NotifyConfig,
}

/// Trading venue credentials and endpoints.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Exchange identifier: `"bitkub"`.
    pub exchange: String,
    pub api_key: String,
    pub api_secret: String,
    /// REST base URL.
    pub rest_url: String,
    /// Timeout for authenticated requests.
    pub request_timeout_secs: u64,
    /// Timeout for the server-time request (falls back to the local clock).
    pub server_time_timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            exchange: "bitkub".into(),
            api_key: String::new(),
            api_secret: String::new(),
            rest_url: default_bitkub_rest_url(),
            request_timeout_secs: 10,
            server_time_timeout_secs: 5,
        }
    }
}

// Credentials stay out of logs.
impl std::fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("exchange", &self.exchange)
            .field("api_key", &mask(&self.api_key))
            .field("api_secret", &mask(&self.api_secret))
            .field("rest_url", &self.rest_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("server_time_timeout_secs", &self.server_time_timeout_secs)
            .finish()
    }
}

/// Scheduling defaults and the trading timezone.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA timezone for schedules and day-stamps.
    pub timezone: String,
    /// Time used when an entry has none (`HH:MM`).
    pub default_time: String,
    /// Quote amount used when an entry has none or an invalid one.
    pub default_amount_quote: f64,
    /// Wait between order placement and fill lookup.
    pub settle_delay_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.into(),
            default_time: "07:00".into(),
            default_amount_quote: 20.0,
            settle_delay_secs: 5,
        }
    }
}

/// Day-stamp write-back retry policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    pub max_attempts: u32,
    /// Delay after attempt N (1-based) is `retry_delays_secs[N-1]`; the last
    /// entry repeats if there are more attempts than delays.
    pub retry_delays_secs: Vec<u64>,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delays_secs: vec![1, 3, 5],
        }
    }
}

/// Backend holding the target map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// A GitHub Actions repository variable.
    #[default]
    Github,
    /// A local JSON file.
    File,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Name of the repository variable holding the map.
    pub variable_name: String,
    /// `owner/repo`.
    pub github_repository: Option<String>,
    pub github_token: Option<String>,
    pub github_api_url: String,
    pub file_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Github,
            variable_name: "DCA_TARGET_MAP".into(),
            github_repository: None,
            github_token: None,
            github_api_url: "https://api.github.com".into(),
            file_path: None,
            request_timeout_secs: 15,
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("kind", &self.kind)
            .field("variable_name", &self.variable_name)
            .field("github_repository", &self.github_repository)
            .field("github_token", &self.github_token.as_deref().map(mask))
            .field("github_api_url", &self.github_api_url)
            .field("file_path", &self.file_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Quote → USD rate sources, tried in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FxConfig {
    pub primary_url: String,
    pub secondary_url: String,
    pub timeout_secs: u64,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            primary_url: "https://api.frankfurter.app/latest?from=THB&to=USD".into(),
            secondary_url: "https://open.er-api.com/v6/latest/THB".into(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Discord webhook; when unset notifications go to the log only.
    pub discord_webhook_url: Option<String>,
    /// Embed title.
    pub title: String,
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            discord_webhook_url: None,
            title: "Crypto DCA Execution".into(),
            timeout_secs: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Overlay values from an arbitrary variable lookup. Empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BITKUB_API_KEY") {
            self.exchange.api_key = v;
        }
        if let Some(v) = get("BITKUB_API_SECRET") {
            self.exchange.api_secret = v;
        }
        if let Some(v) = get("TIMEZONE") {
            self.schedule.timezone = v;
        }
        if let Some(v) = get("DCA_TARGET_TIME") {
            self.schedule.default_time = v;
        }
        if let Some(v) = get("DCA_AMOUNT_THB").and_then(|v| v.trim().parse().ok()) {
            self.schedule.default_amount_quote = v;
        }
        if let Some(v) = get("GIST_TOKEN").or_else(|| get("GITHUB_TOKEN")) {
            self.store.github_token = Some(v);
        }
        if let Some(v) = get("GITHUB_REPOSITORY") {
            self.store.github_repository = Some(v);
        }
        if let Some(v) = get("DCA_TARGET_FILE") {
            self.store.kind = StoreKind::File;
            self.store.file_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("DISCORD_WEBHOOK_URL") {
            self.notify.discord_webhook_url = Some(v);
        }
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), DcaError> {
        self.timezone()?;
        self.defaults()?;
        if self.persist.max_attempts == 0 {
            return Err(DcaError::Config("persist.max_attempts must be at least 1".into()));
        }
        if self.store.kind == StoreKind::File && self.store.file_path.is_none() {
            return Err(DcaError::Config("store.kind = file requires store.file_path".into()));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, DcaError> {
        parse_timezone(&self.schedule.timezone)
    }

    /// Resolution fallbacks; the default amount must be positive.
    pub fn defaults(&self) -> Result<Defaults, DcaError> {
        let amount = self.schedule.default_amount_quote;
        if !(amount.is_finite() && amount > 0.0) {
            return Err(DcaError::Config(format!(
                "schedule.default_amount_quote must be > 0, got {amount}"
            )));
        }
        Ok(Defaults {
            schedule: Schedule::try_parse(&self.schedule.default_time)?,
            amount_quote: amount,
        })
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.schedule.settle_delay_secs)
    }
}

/// Load the config file (if any), overlay the environment, and validate.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut config: AppConfig = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).with_context(|| format!("failed to read {}", p.display()))?;
            debug!("[config] loaded {}", p.display());
            serde_json::from_str(&content).with_context(|| format!("invalid config {}", p.display()))?
        }
        None => AppConfig::default(),
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}

fn default_bitkub_rest_url() -> String {
    "https://api.bitkub.com".into()
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "<unset>".into()
    } else {
        "<redacted>".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.exchange.rest_url, "https://api.bitkub.com");
        assert_eq!(config.persist.max_attempts, 3);
        assert_eq!(config.persist.retry_delays_secs, vec![1, 3, 5]);
        assert_eq!(config.store.kind, StoreKind::Github);
        assert_eq!(config.settle_delay(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overlay() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BITKUB_API_KEY", "key"),
            ("BITKUB_API_SECRET", "secret"),
            ("DCA_TARGET_TIME", "08:30"),
            ("DCA_AMOUNT_THB", "350"),
            ("GITHUB_TOKEN", "gh"),
            ("GITHUB_REPOSITORY", "me/dca"),
            ("DISCORD_WEBHOOK_URL", ""),
        ]);
        let mut config = AppConfig::default();
        config.apply_env_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.exchange.api_key, "key");
        assert_eq!(config.schedule.default_amount_quote, 350.0);
        assert_eq!(config.store.github_token.as_deref(), Some("gh"));
        assert_eq!(config.store.github_repository.as_deref(), Some("me/dca"));
        assert_eq!(config.notify.discord_webhook_url, None);
        assert_eq!(config.defaults().unwrap().schedule.to_string(), "08:30");
    }

    #[test]
    fn gist_token_takes_precedence() {
        let mut config = AppConfig::default();
        config.apply_env_from(|k| match k {
            "GIST_TOKEN" => Some("gist".into()),
            "GITHUB_TOKEN" => Some("gh".into()),
            _ => None,
        });
        assert_eq!(config.store.github_token.as_deref(), Some("gist"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.schedule.timezone = "Nowhere/City".into();
        assert!(matches!(config.validate(), Err(DcaError::UnknownTimezone(_))));

        let mut config = AppConfig::default();
        config.schedule.default_amount_quote = 0.0;
        assert!(matches!(config.validate(), Err(DcaError::Config(_))));

        let mut config = AppConfig::default();
        config.schedule.default_time = "7am".into();
        assert!(matches!(config.validate(), Err(DcaError::InvalidTime(_))));

        let mut config = AppConfig::default();
        config.store.kind = StoreKind::File;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut config = AppConfig::default();
        config.exchange.api_secret = "super-secret".into();
        config.store.github_token = Some("ghp_token".into());
        let out = format!("{config:?}");
        assert!(!out.contains("super-secret"));
        assert!(!out.contains("ghp_token"));
    }
}
