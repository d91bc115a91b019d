//! Platform client trait and implementations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use deploywatch_core::{config, DeploymentRecord, Error, Result};

use crate::types::{Deployment, ServiceStats, TraceSpan, TraceSummary};

/// Read-only view of the deployment-management platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// List all deployments the credential can see.
    async fn list_deployments(&self) -> Result<Vec<DeploymentRecord>>;

    /// Fetch the full detail for one deployment.
    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment>;

    /// Platform-computed service statistics for a window.
    async fn service_stats(
        &self,
        deployment_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ServiceStats>;

    /// Most recent traces, newest first, optionally filtered by status.
    async fn recent_traces(
        &self,
        deployment_id: &str,
        limit: usize,
        status: Option<&str>,
    ) -> Result<Vec<TraceSummary>>;

    /// Span breakdown of a single trace.
    async fn trace_detail(&self, deployment_id: &str, trace_id: &str) -> Result<Vec<TraceSpan>>;
}

/// Shared reference to a platform client.
pub type DynPlatformClient = Arc<dyn PlatformClient>;

/// REST client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// API base URL, without trailing slash.
    pub endpoint: String,
    /// Bearer token.
    pub api_token: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    config::agent::DEFAULT_PLATFORM_TIMEOUT_SECS
}

impl PlatformConfig {
    pub fn new(endpoint: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            endpoint: config::normalize_endpoint(endpoint.into()),
            api_token: api_token.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Build the config from the environment. Fails when no token is set.
    pub fn from_env() -> Result<Self> {
        let token = config::platform_api_token().ok_or_else(|| {
            Error::config(format!(
                "{} is not set",
                config::env_vars::PLATFORM_API_TOKEN
            ))
        })?;
        Ok(Self::new(config::platform_endpoint(), token))
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Page size used when walking the deployment listing.
const LIST_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct PageResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ServiceStatsResponse {
    metrics: ServiceStats,
}

#[derive(Debug, Deserialize)]
struct TraceDetailResponse {
    #[serde(default)]
    spans: Vec<TraceSpan>,
}

/// `reqwest`-backed platform client.
pub struct RestPlatformClient {
    config: PlatformConfig,
    client: Client,
}

impl RestPlatformClient {
    /// Create a new REST client with pooled connections.
    pub fn new(config: PlatformConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::network(e.to_string()))?;
        Ok(Self { config, client })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.config.endpoint, path);
        debug!(%url, "platform request");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::not_found(format!("{path} returned 404")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::platform(format!("{path} returned {status}: {body}")));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| Error::platform(format!("malformed response from {path}: {e}")))
    }
}

#[async_trait]
impl PlatformClient for RestPlatformClient {
    async fn list_deployments(&self) -> Result<Vec<DeploymentRecord>> {
        let mut records = Vec::new();
        let mut offset = 0usize;
        loop {
            let page: PageResponse<DeploymentRecord> = self
                .get_json(
                    "deployments/",
                    &[
                        ("limit", LIST_PAGE_SIZE.to_string()),
                        ("offset", offset.to_string()),
                    ],
                )
                .await?;
            let fetched = page.data.len();
            records.extend(page.data);
            if fetched < LIST_PAGE_SIZE {
                return Ok(records);
            }
            offset += fetched;
        }
    }

    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment> {
        self.get_json(&format!("deployments/{deployment_id}/"), &[])
            .await
    }

    async fn service_stats(
        &self,
        deployment_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ServiceStats> {
        let response: ServiceStatsResponse = self
            .get_json(
                &format!("deployments/{deployment_id}/serviceStats/"),
                &[
                    ("start", start.to_rfc3339()),
                    ("end", end.to_rfc3339()),
                ],
            )
            .await?;
        Ok(response.metrics)
    }

    async fn recent_traces(
        &self,
        deployment_id: &str,
        limit: usize,
        status: Option<&str>,
    ) -> Result<Vec<TraceSummary>> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(status) = status {
            if status != "all" {
                query.push(("status", status.to_string()));
            }
        }
        let page: PageResponse<TraceSummary> = self
            .get_json(
                &format!("deployments/{deployment_id}/dataExploration/traces/"),
                &query,
            )
            .await?;
        Ok(page.data)
    }

    async fn trace_detail(&self, deployment_id: &str, trace_id: &str) -> Result<Vec<TraceSpan>> {
        let response: TraceDetailResponse = self
            .get_json(
                &format!("deployments/{deployment_id}/dataExploration/traces/{trace_id}/"),
                &[],
            )
            .await?;
        Ok(response.spans)
    }
}

/// In-memory platform used by tests and offline demos.
///
/// Fixtures are registered through the builder methods; lookups behave
/// like the REST client, including not-found errors.
#[derive(Default)]
pub struct MemoryPlatform {
    deployments: RwLock<Vec<Deployment>>,
    stats: RwLock<HashMap<String, ServiceStats>>,
    traces: RwLock<HashMap<String, Vec<TraceSummary>>>,
    spans: RwLock<HashMap<String, Vec<TraceSpan>>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deployment(self, deployment: Deployment) -> Self {
        self.deployments.write().push(deployment);
        self
    }

    pub fn with_stats(self, deployment_id: &str, stats: ServiceStats) -> Self {
        self.stats.write().insert(deployment_id.to_string(), stats);
        self
    }

    pub fn with_traces(self, deployment_id: &str, traces: Vec<TraceSummary>) -> Self {
        self.traces
            .write()
            .insert(deployment_id.to_string(), traces);
        self
    }

    pub fn with_trace_spans(self, trace_id: &str, spans: Vec<TraceSpan>) -> Self {
        self.spans.write().insert(trace_id.to_string(), spans);
        self
    }
}

#[async_trait]
impl PlatformClient for MemoryPlatform {
    async fn list_deployments(&self) -> Result<Vec<DeploymentRecord>> {
        Ok(self.deployments.read().iter().map(|d| d.record()).collect())
    }

    async fn get_deployment(&self, deployment_id: &str) -> Result<Deployment> {
        self.deployments
            .read()
            .iter()
            .find(|d| d.id == deployment_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("deployment {deployment_id}")))
    }

    async fn service_stats(
        &self,
        deployment_id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<ServiceStats> {
        self.stats
            .read()
            .get(deployment_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("service stats for {deployment_id}")))
    }

    async fn recent_traces(
        &self,
        deployment_id: &str,
        limit: usize,
        status: Option<&str>,
    ) -> Result<Vec<TraceSummary>> {
        let traces = self
            .traces
            .read()
            .get(deployment_id)
            .cloned()
            .unwrap_or_default();
        Ok(traces
            .into_iter()
            .filter(|t| status.is_none_or(|s| s == "all" || t.status == s))
            .take(limit)
            .collect())
    }

    async fn trace_detail(&self, _deployment_id: &str, trace_id: &str) -> Result<Vec<TraceSpan>> {
        self.spans
            .read()
            .get(trace_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("trace {trace_id}")))
    }
}
