//! Bitkub trading module configuration.
//!
//! Resolved from the generic [`ExchangeConfig`] section; holds credentials,
//! the REST base URL, per-request timeouts, and the endpoint table.

use std::time::Duration;

use dca_core::config::ExchangeConfig;

// -- REST paths --
pub const PATH_SERVER_TIME: &str = "/api/v3/servertime";
pub const PATH_PLACE_BID: &str = "/api/v3/market/place-bid";
pub const PATH_ORDER_INFO: &str = "/api/v3/market/order-info";
pub const PATH_BALANCES: &str = "/api/v3/market/balances";
pub const PATH_ORDER_HISTORY: &str = "/api/v3/market/my-order-history";

/// Configuration for the Bitkub trading module.
#[derive(Clone)]
pub struct BitkubTdConfig {
    pub api_key: String,
    pub secret_key: String,
    pub rest_url: String,
    pub request_timeout: Duration,
    pub server_time_timeout: Duration,
}

impl BitkubTdConfig {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl From<&ExchangeConfig> for BitkubTdConfig {
    fn from(c: &ExchangeConfig) -> Self {
        Self {
            api_key: c.api_key.clone(),
            secret_key: c.api_secret.clone(),
            rest_url: c.rest_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(c.request_timeout_secs.max(1)),
            server_time_timeout: Duration::from_secs(c.server_time_timeout_secs.max(1)),
        }
    }
}

/// Human-readable text for documented Bitkub error codes.
pub fn describe_error_code(code: i64) -> &'static str {
    match code {
        0 => "no error",
        1 => "invalid JSON payload",
        2 => "missing X-BTK-APIKEY",
        3 => "invalid API key",
        4 => "API pending for activation",
        5 => "IP not allowed",
        6 => "missing / invalid signature",
        7 => "missing timestamp",
        8 => "invalid timestamp",
        9 => "invalid user",
        10 => "invalid parameter",
        11 => "invalid symbol",
        12 => "invalid amount",
        13 => "invalid rate",
        14 => "improper rate",
        15 => "amount too low",
        16 => "failed to get balance",
        17 => "wallet is empty",
        18 => "insufficient balance",
        19 => "failed to insert order into db",
        20 => "failed to deduct balance",
        21 => "invalid order for cancellation",
        22 => "invalid side",
        23 => "failed to update order status",
        24 => "invalid order for lookup",
        25 => "KYC level 1 is required",
        30 => "limit exceeds",
        90 => "server error",
        _ => "unknown error",
    }
}
