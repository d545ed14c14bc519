//! Keeps the vector index consistent with the embedding dimensionality.
//!
//! The index moves through three states: absent, ready (dimension matches
//! the embedder) and stale (dimension differs). Reconciliation drives any
//! state to ready. A stale index is deleted and recreated, which drops all
//! of its vectors, unless the dimension policy says to refuse.
//!
//! Only ingestion reconciles. The query path uses [`IndexManager::readable`],
//! which never writes to the store.

use crate::deadline::bounded;
use crate::types::{IndexDescriptor, Metric};
use crate::vector_store::{IndexStats, VectorStore};
use ragbot_core::{AppError, AppResult, DimensionPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Observed state of the configured index.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexState {
    Absent,
    Ready(IndexStats),
    Stale(IndexStats),
}

/// Reconciles one named index against the embedder's dimension.
pub struct IndexManager {
    store: Arc<dyn VectorStore>,
    name: String,
    metric: Metric,
    policy: DimensionPolicy,
    timeout: Duration,
    ready: Mutex<Option<IndexDescriptor>>,
}

impl IndexManager {
    pub fn new(
        store: Arc<dyn VectorStore>,
        name: impl Into<String>,
        policy: DimensionPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            name: name.into(),
            metric: Metric::Cosine,
            policy,
            timeout,
            ready: Mutex::new(None),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.name
    }

    /// Classify the index as it exists in the store right now.
    pub async fn inspect(&self, dimension: usize) -> AppResult<IndexState> {
        let described = bounded(
            "describe index",
            self.timeout,
            self.store.describe_index(&self.name),
        )
        .await?;

        Ok(match described {
            None => IndexState::Absent,
            Some(stats) if stats.dimension == dimension && stats.metric == self.metric => {
                IndexState::Ready(stats)
            }
            Some(stats) => IndexState::Stale(stats),
        })
    }

    /// Make sure the index exists with `dimension` and the cosine metric.
    ///
    /// Idempotent: once reconciled, later calls return the cached descriptor
    /// without touching the store. Concurrent callers wait on one another.
    pub async fn ensure_ready(&self, dimension: usize) -> AppResult<IndexDescriptor> {
        let mut ready = self.ready.lock().await;

        if let Some(descriptor) = ready.as_ref() {
            if descriptor.dimension == dimension {
                return Ok(descriptor.clone());
            }
        }

        let descriptor = self.reconcile(dimension).await?;
        *ready = Some(descriptor.clone());
        Ok(descriptor)
    }

    /// Read-only readiness check for queries.
    ///
    /// `None` when the index does not exist yet. A stale index is a
    /// `DimensionMismatch`; it is left untouched.
    pub async fn readable(&self, dimension: usize) -> AppResult<Option<IndexDescriptor>> {
        if let Some(descriptor) = self.ready.lock().await.as_ref() {
            if descriptor.dimension == dimension {
                return Ok(Some(descriptor.clone()));
            }
        }

        match self.inspect(dimension).await? {
            IndexState::Absent => Ok(None),
            IndexState::Stale(stats) => Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: stats.dimension,
            }),
            IndexState::Ready(_) => {
                let descriptor = self.descriptor(dimension);
                *self.ready.lock().await = Some(descriptor.clone());
                Ok(Some(descriptor))
            }
        }
    }

    /// Forget the cached descriptor so the next `ensure_ready` re-checks the store.
    pub async fn invalidate(&self) {
        *self.ready.lock().await = None;
    }

    async fn reconcile(&self, dimension: usize) -> AppResult<IndexDescriptor> {
        match self.inspect(dimension).await? {
            IndexState::Ready(stats) => {
                tracing::info!(
                    "Index '{}' ready (dimension={}, vectors={})",
                    self.name,
                    stats.dimension,
                    stats.vector_count
                );
            }
            IndexState::Absent => {
                tracing::info!(
                    "Index '{}' not found, creating (dimension={})",
                    self.name,
                    dimension
                );
                self.create(dimension).await?;
            }
            IndexState::Stale(stats) => {
                if self.policy == DimensionPolicy::Fail {
                    return Err(AppError::DimensionMismatch {
                        expected: dimension,
                        actual: stats.dimension,
                    });
                }

                tracing::warn!(
                    "Index '{}' has dimension {} ({}), embedder needs {} ({}); recreating and dropping {} vectors",
                    self.name,
                    stats.dimension,
                    stats.metric.as_str(),
                    dimension,
                    self.metric.as_str(),
                    stats.vector_count
                );
                self.store.delete_index(&self.name).await?;
                self.create(dimension).await?;
            }
        }

        Ok(self.descriptor(dimension))
    }

    fn descriptor(&self, dimension: usize) -> IndexDescriptor {
        IndexDescriptor {
            name: self.name.clone(),
            dimension,
            metric: self.metric,
        }
    }

    // Delete and create are not wrapped in the request timeout: both include
    // the store's own bounded wait for the change to settle, and each request
    // inside it is bounded.
    async fn create(&self, dimension: usize) -> AppResult<()> {
        self.store
            .create_index(&self.name, dimension, self.metric)
            .await
    }
}
