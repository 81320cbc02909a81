//! GitHub Actions repository variable backend.
//!
//! | Operation | Method | Path                                           | Success |
//! |-----------|--------|------------------------------------------------|---------|
//! | Read      | GET    | `/repos/{repo}/actions/variables/{name}`       | 200     |
//! | Update    | PATCH  | `/repos/{repo}/actions/variables/{name}`       | 204     |
//! | Create    | POST   | `/repos/{repo}/actions/variables`              | 201     |

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use dca_core::TargetMap;
use dca_core::config::StoreConfig;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{StoreError, TargetStore};

const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct VariableBody {
    value: String,
}

#[derive(Debug, Serialize)]
struct WriteBody<'a> {
    name: &'a str,
    value: String,
}

pub struct GithubVariableStore {
    http: reqwest::Client,
    api_url: String,
    repository: String,
    variable: String,
    token: String,
}

impl GithubVariableStore {
    pub fn new(
        api_url: impl Into<String>,
        repository: impl Into<String>,
        variable: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("dca-runner/", env!("CARGO_PKG_VERSION")))
                .build()
                .context("failed to build HTTP client")?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            repository: repository.into(),
            variable: variable.into(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let repository = config
            .github_repository
            .as_deref()
            .ok_or_else(|| anyhow!("GITHUB_REPOSITORY is not set"))?;
        let token = config
            .github_token
            .as_deref()
            .ok_or_else(|| anyhow!("GIST_TOKEN / GITHUB_TOKEN is not set"))?;
        Self::new(
            &config.github_api_url,
            repository,
            &config.variable_name,
            token,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )
    }

    fn collection_url(&self) -> String {
        format!("{}/repos/{}/actions/variables", self.api_url, self.repository)
    }

    fn variable_url(&self) -> String {
        format!("{}/{}", self.collection_url(), self.variable)
    }

    async fn send(&self, method: Method, url: &str, body: Option<WriteBody<'_>>) -> Result<(u16, String), StoreError> {
        debug!("[store] {method} {url}");
        let mut req = self
            .http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.map_err(|e| StoreError::Transient(e.to_string()))?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(|e| StoreError::Transient(e.to_string()))?;
        Ok((status, text))
    }

    async fn write(&self, method: Method, url: &str, expected: u16, map: &TargetMap) -> Result<(), StoreError> {
        let body = WriteBody {
            name: &self.variable,
            value: map.to_json(),
        };
        let (status, text) = self.send(method, url, Some(body)).await?;
        if status == expected { Ok(()) } else { Err(classify(status, &text)) }
    }
}

#[async_trait]
impl TargetStore for GithubVariableStore {
    fn name(&self) -> &str {
        "github"
    }

    async fn get(&self) -> Result<TargetMap, StoreError> {
        let (status, text) = self.send(Method::GET, &self.variable_url(), None).await?;
        if status != 200 {
            return Err(classify(status, &text));
        }
        decode_variable(&text)
    }

    async fn put(&self, map: &TargetMap) -> Result<(), StoreError> {
        self.write(Method::PATCH, &self.variable_url(), 204, map).await
    }

    async fn create(&self, map: &TargetMap) -> Result<(), StoreError> {
        self.write(Method::POST, &self.collection_url(), 201, map).await
    }
}

/// Map a non-success status to a [`StoreError`].
/// Target map held in a variable response body.
fn decode_variable(text: &str) -> Result<TargetMap, StoreError> {
    let body: VariableBody = serde_json::from_str(text).map_err(|e| StoreError::Malformed(e.to_string()))?;
    Ok(TargetMap::parse(&body.value)?)
}

fn classify(status: u16, body: &str) -> StoreError {
    match status {
        404 => StoreError::NotFound,
        429 | 500..=599 => StoreError::Transient(format!("HTTP {status}")),
        _ => StoreError::Rejected {
            status,
            message: github_message(body),
        },
    }
}

fn github_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
