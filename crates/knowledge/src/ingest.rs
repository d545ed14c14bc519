//! Batch ingestion: documents to chunks to vectors in the store.

use crate::chunk::{self, Chunk, ChunkConfig};
use crate::deadline::bounded;
use crate::embeddings::EmbeddingProvider;
use crate::index_manager::IndexManager;
use crate::types::{meta_keys, Document, IngestStats, Metadata};
use crate::vector_store::{VectorRecord, VectorStore};
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use ragbot_core::{AppError, AppResult};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Batching and concurrency limits for ingestion.
#[derive(Debug, Clone, Copy)]
pub struct IngestSettings {
    pub batch_size: usize,
    pub concurrency: usize,
    pub timeout: Duration,
}

/// Splits, embeds and upserts documents.
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    index: Arc<IndexManager>,
    chunking: ChunkConfig,
    settings: IngestSettings,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        index: Arc<IndexManager>,
        chunking: ChunkConfig,
        settings: IngestSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            index,
            chunking,
            settings,
        }
    }

    /// Ingest `documents` into the configured index.
    ///
    /// The index is reconciled first. Chunks are embedded and upserted in
    /// batches, with up to `concurrency` batches in flight. Chunk ids are
    /// deterministic, so ingesting the same corpus twice overwrites rather
    /// than duplicates.
    pub async fn ingest(&self, documents: &[Document]) -> AppResult<IngestStats> {
        let start = Instant::now();
        let dimension = self.embedder.dimensions();

        tracing::info!(
            "Ingesting {} documents with {} (model={}, dimension={})",
            documents.len(),
            self.embedder.provider_name(),
            self.embedder.model_name(),
            dimension
        );

        let descriptor = self.index.ensure_ready(dimension).await?;
        let chunks = chunk::split(documents, &self.chunking);

        let paths: HashMap<&str, &PathBuf> = documents
            .iter()
            .filter_map(|d| d.path.as_ref().map(|p| (d.source_id.as_str(), p)))
            .collect();
        let ingested_at = Utc::now().to_rfc3339();

        let batches: Vec<&[Chunk]> = chunks.chunks(self.settings.batch_size.max(1)).collect();
        let batch_count = batches.len();

        let upserted = stream::iter(batches.into_iter().enumerate())
            .map(|(i, batch)| {
                let name = descriptor.name.as_str();
                let paths = &paths;
                let ingested_at = ingested_at.as_str();
                async move {
                    let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
                    let vectors = bounded(
                        "batch embedding",
                        self.settings.timeout,
                        self.embedder.embed_batch(&texts),
                    )
                    .await?;

                    if vectors.len() != batch.len() {
                        return Err(AppError::fatal_provider(format!(
                            "Embedder returned {} vectors for {} chunks",
                            vectors.len(),
                            batch.len()
                        )));
                    }

                    let records = batch
                        .iter()
                        .zip(vectors)
                        .map(|(chunk, values)| {
                            if values.len() != dimension {
                                return Err(AppError::DimensionMismatch {
                                    expected: dimension,
                                    actual: values.len(),
                                });
                            }
                            let path = paths.get(chunk.source_id.as_str()).copied();
                            Ok(VectorRecord {
                                id: chunk.id.clone(),
                                values,
                                metadata: chunk_metadata(chunk, path, ingested_at),
                            })
                        })
                        .collect::<AppResult<Vec<_>>>()?;

                    let count = bounded(
                        "vector upsert",
                        self.settings.timeout,
                        self.store.upsert(name, records),
                    )
                    .await?;

                    tracing::debug!("Batch {}/{} upserted ({} vectors)", i + 1, batch_count, count);
                    Ok::<usize, AppError>(batch.len())
                }
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .try_fold(0usize, |total, n| async move { Ok::<usize, AppError>(total + n) })
            .await?;

        let duration = start.elapsed();
        tracing::info!(
            "Ingestion completed: {} documents, {} chunks in {} batches, {:.2}s",
            documents.len(),
            upserted,
            batch_count,
            duration.as_secs_f64()
        );

        Ok(IngestStats {
            documents: documents.len(),
            chunks: upserted,
            batches: batch_count,
            dimension,
            duration_secs: duration.as_secs_f64(),
        })
    }
}

fn chunk_metadata(chunk: &Chunk, path: Option<&PathBuf>, ingested_at: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(meta_keys::SOURCE.to_string(), json!(chunk.source_id));
    metadata.insert(meta_keys::SEQUENCE_INDEX.to_string(), json!(chunk.sequence_index));
    metadata.insert(meta_keys::TEXT.to_string(), json!(chunk.text));
    metadata.insert(meta_keys::CHAR_OFFSET.to_string(), json!(chunk.char_offset));
    metadata.insert(
        meta_keys::CONTENT_HASH.to_string(),
        json!(format!("{:x}", Sha256::digest(chunk.text.as_bytes()))),
    );
    metadata.insert(meta_keys::INGESTED_AT.to_string(), json!(ingested_at));
    if let Some(path) = path {
        metadata.insert(
            meta_keys::FILE_PATH.to_string(),
            json!(path.to_string_lossy()),
        );
    }
    metadata
}
