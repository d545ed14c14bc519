//! Vector store abstraction.
//!
//! A store holds named indexes of fixed dimensionality. Each index maps
//! vector ids to `(values, metadata)` and answers top-k nearest neighbor
//! queries. The store owns persisted vectors; the pipeline never caches them.

pub mod pinecone;
pub mod sqlite;

pub use pinecone::PineconeStore;
pub use sqlite::SqliteStore;

use crate::types::{Metadata, Metric};
use ragbot_core::config::VectorStoreSettings;
use ragbot_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A vector with its id and metadata, as written by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Metadata,
}

/// A query hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Description of an existing index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub vector_count: u64,
}

/// Trait for vector store backends.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name (e.g., "sqlite", "pinecone")
    fn backend_name(&self) -> &str;

    /// Create an empty index. Returns once the index accepts reads and writes.
    async fn create_index(&self, name: &str, dimension: usize, metric: Metric) -> AppResult<()>;

    /// Delete an index and every vector in it. Deleting a missing index is a no-op.
    async fn delete_index(&self, name: &str) -> AppResult<()>;

    /// Describe an index, or `None` if it does not exist.
    async fn describe_index(&self, name: &str) -> AppResult<Option<IndexStats>>;

    /// Names of all indexes.
    async fn list_indexes(&self) -> AppResult<Vec<String>>;

    /// Insert or overwrite vectors by id.
    async fn upsert(&self, name: &str, records: Vec<VectorRecord>) -> AppResult<usize>;

    /// The `top_k` nearest vectors to `vector`, best first.
    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> AppResult<Vec<VectorMatch>>;
}

/// Create a vector store from configuration.
pub fn create_store(
    settings: &VectorStoreSettings,
    timeout: Duration,
) -> AppResult<Arc<dyn VectorStore>> {
    tracing::debug!("Creating vector store backend '{}'", settings.backend);

    match settings.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteStore::open(&settings.path)?)),

        "pinecone" => {
            let api_key = settings.api_key.as_deref().ok_or_else(|| {
                AppError::Config("Pinecone backend requires an API key".to_string())
            })?;
            let region = settings.region.as_deref().ok_or_else(|| {
                AppError::Config("Pinecone backend requires a region".to_string())
            })?;
            let endpoint = settings
                .endpoint
                .as_deref()
                .unwrap_or(PineconeStore::CONTROL_PLANE_URL);
            Ok(Arc::new(PineconeStore::new(
                endpoint,
                api_key,
                &settings.cloud,
                region,
                timeout,
            )?))
        }

        other => Err(AppError::Config(format!(
            "Unknown vector store backend: '{}'. Supported backends: sqlite, pinecone",
            other
        ))),
    }
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_create_store_backends() {
        let sqlite = VectorStoreSettings {
            backend: "sqlite".to_string(),
            path: PathBuf::from(":memory:"),
            ..VectorStoreSettings::default()
        };
        assert_eq!(
            create_store(&sqlite, Duration::from_secs(1)).unwrap().backend_name(),
            "sqlite"
        );

        let pinecone = VectorStoreSettings {
            backend: "pinecone".to_string(),
            api_key: Some("pc-test".to_string()),
            region: None,
            ..VectorStoreSettings::default()
        };
        assert!(create_store(&pinecone, Duration::from_secs(1)).is_err());

        let unknown = VectorStoreSettings {
            backend: "faiss".to_string(),
            ..VectorStoreSettings::default()
        };
        assert!(create_store(&unknown, Duration::from_secs(1)).is_err());
    }
}
