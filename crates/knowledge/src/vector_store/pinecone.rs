//! Pinecone vector store over its REST API.
//!
//! Index administration goes to the control plane (`api.pinecone.io`);
//! upserts and queries go to the per-index data plane host reported by
//! `describe`. Hosts are cached per index name and dropped on delete.

use super::{IndexStats, VectorMatch, VectorRecord, VectorStore};
use crate::types::{Metadata, Metric};
use ragbot_core::{AppError, AppResult};
use ragbot_llm::http;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

const API_VERSION: &str = "2024-07";

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Deserialize)]
struct IndexModel {
    name: String,
    dimension: usize,
    metric: String,
    host: String,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexModel>,
}

#[derive(Debug, Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a Metadata,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeStatsResponse {
    #[serde(default)]
    total_vector_count: u64,
}

/// Managed serverless vector store.
pub struct PineconeStore {
    client: reqwest::Client,
    control_url: String,
    api_key: String,
    cloud: String,
    region: String,
    ready_poll_interval: Duration,
    ready_poll_attempts: u32,
    hosts: RwLock<HashMap<String, String>>,
}

impl PineconeStore {
    pub const CONTROL_PLANE_URL: &'static str = "https://api.pinecone.io";

    pub fn new(
        control_url: &str,
        api_key: &str,
        cloud: &str,
        region: &str,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            control_url: control_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            cloud: cloud.to_string(),
            region: region.to_string(),
            ready_poll_interval: Duration::from_secs(1),
            ready_poll_attempts: 120,
            hosts: RwLock::new(HashMap::new()),
        })
    }

    /// Override how long `create_index` waits for the index to become ready.
    pub fn with_readiness_poll(mut self, interval: Duration, attempts: u32) -> Self {
        self.ready_poll_interval = interval;
        self.ready_poll_attempts = attempts.max(1);
        self
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    async fn fetch_index(&self, name: &str) -> AppResult<Option<IndexModel>> {
        let url = format!("{}/indexes/{}", self.control_url, name);
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| http::send_error("Pinecone", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = http::check_status("Pinecone", response).await?;
        let model: IndexModel = http::decode_json("Pinecone", response).await?;
        Ok(Some(model))
    }

    async fn data_host(&self, name: &str) -> AppResult<String> {
        if let Some(host) = self.hosts.read().await.get(name) {
            return Ok(host.clone());
        }

        let model = self
            .fetch_index(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Index '{}' does not exist", name)))?;
        let host = normalize_host(&model.host);

        self.hosts
            .write()
            .await
            .insert(name.to_string(), host.clone());
        Ok(host)
    }

    async fn vector_count(&self, host: &str) -> AppResult<u64> {
        let url = format!("{}/describe_index_stats", host);
        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| http::send_error("Pinecone", e))?;

        let response = http::check_status("Pinecone", response).await?;
        let stats: DescribeStatsResponse = http::decode_json("Pinecone", response).await?;
        Ok(stats.total_vector_count)
    }

    async fn wait_until_ready(&self, name: &str) -> AppResult<()> {
        for attempt in 1..=self.ready_poll_attempts {
            if let Some(model) = self.fetch_index(name).await? {
                if model.status.ready {
                    tracing::info!("Pinecone index '{}' is ready", name);
                    return Ok(());
                }
                tracing::debug!(
                    "Waiting for index '{}' (state={:?}, attempt {}/{})",
                    name,
                    model.status.state,
                    attempt,
                    self.ready_poll_attempts
                );
            }
            tokio::time::sleep(self.ready_poll_interval).await;
        }

        Err(AppError::retryable(format!(
            "Pinecone index '{}' did not become ready",
            name
        )))
    }

    /// Deletion is asynchronous: the index lingers in a terminating state and
    /// a create with the same name fails until it is gone.
    async fn wait_until_deleted(&self, name: &str) -> AppResult<()> {
        for attempt in 1..=self.ready_poll_attempts {
            let Some(model) = self.fetch_index(name).await? else {
                return Ok(());
            };
            tracing::debug!(
                "Waiting for index '{}' to go away (state={:?}, attempt {}/{})",
                name,
                model.status.state,
                attempt,
                self.ready_poll_attempts
            );
            tokio::time::sleep(self.ready_poll_interval).await;
        }

        Err(AppError::retryable(format!(
            "Pinecone index '{}' was not deleted",
            name
        )))
    }
}

/// Data plane hosts come back without a scheme.
fn normalize_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl VectorStore for PineconeStore {
    fn backend_name(&self) -> &str {
        "pinecone"
    }

    #[tracing::instrument(skip(self))]
    async fn create_index(&self, name: &str, dimension: usize, metric: Metric) -> AppResult<()> {
        let url = format!("{}/indexes", self.control_url);
        let body = CreateIndexRequest {
            name,
            dimension,
            metric: metric.as_str(),
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error("Pinecone", e))?;
        http::check_status("Pinecone", response).await?;

        tracing::info!(
            "Created Pinecone index '{}' (dimension={}, metric={}, {}/{})",
            name,
            dimension,
            metric.as_str(),
            self.cloud,
            self.region
        );

        self.wait_until_ready(name).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_index(&self, name: &str) -> AppResult<()> {
        let url = format!("{}/indexes/{}", self.control_url, name);
        let response = self
            .request(reqwest::Method::DELETE, &url)
            .send()
            .await
            .map_err(|e| http::send_error("Pinecone", e))?;

        self.hosts.write().await.remove(name);

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        http::check_status("Pinecone", response).await?;

        self.wait_until_deleted(name).await?;
        tracing::info!("Deleted Pinecone index '{}'", name);
        Ok(())
    }

    async fn describe_index(&self, name: &str) -> AppResult<Option<IndexStats>> {
        let Some(model) = self.fetch_index(name).await? else {
            return Ok(None);
        };

        let metric = Metric::parse(&model.metric).ok_or_else(|| {
            AppError::fatal_provider(format!("Unknown Pinecone metric '{}'", model.metric))
        })?;

        let host = normalize_host(&model.host);
        let vector_count = if model.status.ready {
            self.vector_count(&host).await?
        } else {
            0
        };

        self.hosts.write().await.insert(model.name.clone(), host);

        Ok(Some(IndexStats {
            name: model.name,
            dimension: model.dimension,
            metric,
            vector_count,
        }))
    }

    async fn list_indexes(&self) -> AppResult<Vec<String>> {
        let url = format!("{}/indexes", self.control_url);
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| http::send_error("Pinecone", e))?;

        let response = http::check_status("Pinecone", response).await?;
        let list: IndexList = http::decode_json("Pinecone", response).await?;
        Ok(list.indexes.into_iter().map(|i| i.name).collect())
    }

    #[tracing::instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, name: &str, records: Vec<VectorRecord>) -> AppResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let host = self.data_host(name).await?;
        let body = UpsertRequest {
            vectors: records
                .iter()
                .map(|r| UpsertVector {
                    id: &r.id,
                    values: &r.values,
                    metadata: &r.metadata,
                })
                .collect(),
        };

        let response = self
            .request(reqwest::Method::POST, &format!("{}/vectors/upsert", host))
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error("Pinecone", e))?;

        let response = http::check_status("Pinecone", response).await?;
        let upserted: UpsertResponse = http::decode_json("Pinecone", response).await?;
        Ok(upserted.upserted_count)
    }

    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> AppResult<Vec<VectorMatch>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let host = self.data_host(name).await?;
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
        };

        let response = self
            .request(reqwest::Method::POST, &format!("{}/query", host))
            .json(&body)
            .send()
            .await
            .map_err(|e| http::send_error("Pinecone", e))?;

        let response = http::check_status("Pinecone", response).await?;
        let result: QueryResponse = http::decode_json("Pinecone", response).await?;
        Ok(result.matches)
    }
}
