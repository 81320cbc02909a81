//! Bitkub REST client for the secure `market` endpoints.
//!
//! # REST endpoints
//!
//! | Operation     | Method | Path                              |
//! |---------------|--------|-----------------------------------|
//! | Server time   | GET    | `/api/v3/servertime`              |
//! | Place bid     | POST   | `/api/v3/market/place-bid`        |
//! | Order info    | GET    | `/api/v3/market/order-info`       |
//! | Balances      | POST   | `/api/v3/market/balances`         |
//! | Order history | GET    | `/api/v3/market/my-order-history` |
//!
//! Secure responses share one envelope, `{"error": <code>, "result": ...}`.
//! [`unwrap_envelope`] turns it (and any HTTP failure around it) into either
//! the `result` value or a [`GatewayError`].

use anyhow::{Context, Result};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, warn};

use super::auth;
use super::config::{BitkubTdConfig, PATH_SERVER_TIME, describe_error_code};
use crate::error::{GatewayError, GatewayResult};
use crate::json_util::parse_str_i64;

/// Millisecond timestamps are at least this large; smaller values are seconds.
const MS_THRESHOLD: i64 = 1_000_000_000_000;

/// Timestamp used to sign a request, tagged with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerTime {
    /// Reported by `/api/v3/servertime`.
    Venue(i64),
    /// Local clock; the venue was unreachable or answered garbage.
    Local(i64),
}

impl ServerTime {
    /// Milliseconds since the Unix epoch.
    pub fn ms(&self) -> i64 {
        match self {
            Self::Venue(ms) | Self::Local(ms) => *ms,
        }
    }
}

/// Signed REST client.
pub struct MarketClient {
    /// Shared HTTP client with the request timeout applied.
    http: reqwest::Client,
    config: BitkubTdConfig,
}

impl MarketClient {
    /// Create a new client (no connections opened yet).
    pub fn new(config: BitkubTdConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &BitkubTdConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Server time
    // -----------------------------------------------------------------------

    /// Venue time, or the local clock if the venue is unreachable or
    /// answers with something unparseable.
    pub async fn server_time(&self) -> ServerTime {
        match self.fetch_server_time().await {
            Ok(ms) => ServerTime::Venue(ms),
            Err(e) => {
                warn!("[bitkub] server time unavailable, using local clock: {e:#}");
                ServerTime::Local(dca_core::time_util::now_ms() as i64)
            }
        }
    }

    async fn fetch_server_time(&self) -> Result<i64> {
        let url = format!("{}{PATH_SERVER_TIME}", self.config.rest_url);
        let text = self
            .http
            .get(&url)
            .timeout(self.config.server_time_timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_server_time(&text).with_context(|| format!("unexpected server time body {text:?}"))
    }

    // -----------------------------------------------------------------------
    // Signed requests
    // -----------------------------------------------------------------------

    /// Signed GET; `params` become the query string and are part of the signature.
    pub async fn signed_get(&self, path: &str, params: &[(&str, &str)]) -> GatewayResult<serde_json::Value> {
        let target = auth::path_with_query(path, params);
        self.send(Method::GET, &target, String::new()).await
    }

    /// Signed POST with a compact JSON body.
    pub async fn signed_post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> GatewayResult<serde_json::Value> {
        let body = serde_json::to_string(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        self.send(Method::POST, path, body).await
    }

    async fn send(&self, method: Method, target: &str, body: String) -> GatewayResult<serde_json::Value> {
        if !self.config.has_credentials() {
            return Err(GatewayError::MissingCredentials);
        }

        let server_time = self.server_time().await;
        if let ServerTime::Local(_) = server_time {
            debug!("[bitkub] signing {target} with local time");
        }
        let timestamp = server_time.ms().to_string();
        let signature = auth::sign_request(&self.config.secret_key, &timestamp, method.as_str(), target, &body);

        let url = format!("{}{target}", self.config.rest_url);
        debug!("[bitkub] {method} {target}");

        let mut req = self
            .http
            .request(method, &url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header(auth::HEADER_API_KEY, &self.config.api_key)
            .header(auth::HEADER_TIMESTAMP, &timestamp)
            .header(auth::HEADER_SIGN, signature);
        if !body.is_empty() {
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        unwrap_envelope(status, &text)
    }
}

/// Parse the `servertime` body into milliseconds.
pub(crate) fn parse_server_time(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    let value = trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| serde_json::from_str::<serde_json::Value>(trimmed).ok().and_then(|v| parse_str_i64(Some(&v))))?;
    if value <= 0 {
        return None;
    }
    Some(if value < MS_THRESHOLD { value * 1000 } else { value })
}

/// Normalize a venue timestamp to Unix seconds.
pub(crate) fn to_unix_secs(ts: i64) -> i64 {
    if ts >= MS_THRESHOLD { ts / 1000 } else { ts }
}

/// Decode the `{"error", "result"}` envelope of a secure endpoint.
///
/// A venue error code wins over the HTTP status: Bitkub reports rejected
/// orders with a 4xx status *and* a JSON body carrying the real reason.
pub(crate) fn unwrap_envelope(status: u16, body: &str) -> GatewayResult<serde_json::Value> {
    let success = (200..300).contains(&status);
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();

    let code = parsed.as_ref().and_then(|v| parse_str_i64(v.get("error")));
    match (code, parsed) {
        (Some(code), _) if code != 0 => Err(GatewayError::Venue {
            code,
            message: describe_error_code(code).to_string(),
        }),
        (Some(_), Some(mut v)) if success => Ok(v
            .get_mut("result")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null)),
        _ if !success => Err(GatewayError::Http {
            status,
            body: truncate(body, 300),
        }),
        (None, Some(_)) => Err(GatewayError::Decode("response has no error field".into())),
        _ => Err(GatewayError::Decode(format!("non-JSON response: {}", truncate(body, 120)))),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
