//! Question to ranked passages.

use crate::deadline::bounded;
use crate::embeddings::EmbeddingProvider;
use crate::index_manager::IndexManager;
use crate::types::{meta_keys, RetrievalResult, ScoredPassage};
use crate::vector_store::{VectorMatch, VectorStore};
use ragbot_core::config::RagSettings;
use ragbot_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Per-deployment retrieval limits.
#[derive(Debug, Clone, Copy)]
pub struct RetrieverSettings {
    /// Ceiling applied to any requested `top_k`
    pub max_top_k: usize,
    /// Passages scoring below this are dropped
    pub min_score: Option<f32>,
    pub timeout: Duration,
}

impl RetrieverSettings {
    pub fn from_settings(settings: &RagSettings) -> Self {
        Self {
            max_top_k: settings.max_top_k,
            min_score: settings.min_score,
            timeout: settings.request_timeout(),
        }
    }
}

/// Embeds a question and fetches its nearest passages.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    index: Arc<IndexManager>,
    settings: RetrieverSettings,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        index: Arc<IndexManager>,
        settings: RetrieverSettings,
    ) -> Self {
        Self {
            embedder,
            store,
            index,
            settings,
        }
    }

    /// Retrieve at most `top_k` passages for `question`, best first.
    ///
    /// A missing or empty index, or one where nothing clears `min_score`,
    /// gives an empty result rather than an error. The index is only read:
    /// a dimension mismatch is returned, never repaired.
    #[tracing::instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn retrieve(&self, question: &str, top_k: usize) -> AppResult<RetrievalResult> {
        if question.trim().is_empty() {
            return Err(AppError::Validation("Question must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(AppError::Validation("top_k must be positive".to_string()));
        }

        let top_k = if top_k > self.settings.max_top_k {
            tracing::debug!("Clamping top_k {} to {}", top_k, self.settings.max_top_k);
            self.settings.max_top_k
        } else {
            top_k
        };

        let dimension = self.embedder.dimensions();
        let Some(descriptor) = self.index.readable(dimension).await? else {
            tracing::info!("Index '{}' does not exist yet", self.index.index_name());
            return Ok(RetrievalResult::empty());
        };

        let vector = bounded(
            "question embedding",
            self.settings.timeout,
            self.embedder.embed(question),
        )
        .await?;

        if vector.len() != dimension {
            return Err(AppError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        let matches = bounded(
            "vector query",
            self.settings.timeout,
            self.store.query(&descriptor.name, &vector, top_k),
        )
        .await?;

        let mut passages: Vec<ScoredPassage> = matches
            .into_iter()
            .filter(|m| self.settings.min_score.map_or(true, |min| m.score >= min))
            .map(to_passage)
            .collect();

        passages.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        passages.truncate(top_k);

        if passages.is_empty() {
            tracing::info!("No passages retrieved");
        } else {
            tracing::info!(
                "Retrieved {} passages (top score: {:.3}, lowest: {:.3})",
                passages.len(),
                passages[0].score,
                passages[passages.len() - 1].score
            );
        }

        Ok(RetrievalResult { passages })
    }
}

fn to_passage(hit: VectorMatch) -> ScoredPassage {
    let text = hit
        .metadata
        .get(meta_keys::TEXT)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let source_id = hit
        .metadata
        .get(meta_keys::SOURCE)
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    let sequence_index = hit
        .metadata
        .get(meta_keys::SEQUENCE_INDEX)
        // Pinecone hands numbers back as floats
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
        .map(|i| i as usize);

    ScoredPassage {
        text,
        source_id,
        score: hit.score,
        sequence_index,
        metadata: hit.metadata,
    }
}
