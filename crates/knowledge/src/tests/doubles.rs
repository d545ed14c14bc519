//! Counting stand-ins for the external providers.

use crate::embeddings::EmbeddingProvider;
use crate::types::Metric;
use crate::vector_store::{IndexStats, SqliteStore, VectorMatch, VectorRecord, VectorStore};
use ragbot_core::AppResult;
use ragbot_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory SQLite store that counts calls per operation.
pub struct RecordingStore {
    inner: SqliteStore,
    pub creates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub describes: AtomicUsize,
    pub upserts: AtomicUsize,
    pub queries: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory().unwrap(),
            creates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            describes: AtomicUsize::new(0),
            upserts: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl VectorStore for RecordingStore {
    fn backend_name(&self) -> &str {
        "recording"
    }

    async fn create_index(&self, name: &str, dimension: usize, metric: Metric) -> AppResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.inner.create_index(name, dimension, metric).await
    }

    async fn delete_index(&self, name: &str) -> AppResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete_index(name).await
    }

    async fn describe_index(&self, name: &str) -> AppResult<Option<IndexStats>> {
        self.describes.fetch_add(1, Ordering::SeqCst);
        self.inner.describe_index(name).await
    }

    async fn list_indexes(&self) -> AppResult<Vec<String>> {
        self.inner.list_indexes().await
    }

    async fn upsert(&self, name: &str, records: Vec<VectorRecord>) -> AppResult<usize> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(name, records).await
    }

    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> AppResult<Vec<VectorMatch>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(name, vector, top_k).await
    }
}

/// Embeds text as keyword counts over a fixed vocabulary.
///
/// The last component is a small constant so no text maps to the zero vector.
#[derive(Debug)]
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    /// Length of the returned vectors, which may disagree with `dimensions()`
    emitted: usize,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
            emitted: vocabulary.len() + 1,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reports `dimensions()` correctly but returns vectors one short.
    pub fn truncating(vocabulary: &[&'static str]) -> Self {
        Self {
            emitted: vocabulary.len(),
            ..Self::new(vocabulary)
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .vocabulary
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect();
        vector.push(0.1);
        vector.truncate(self.emitted);
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn provider_name(&self) -> &str {
        "keyword"
    }

    fn model_name(&self) -> &str {
        "keyword-counts"
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len() + 1
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}

/// Answers every prompt with the same text and keeps the requests it saw.
pub struct ScriptedLlm {
    reply: String,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn last_prompt(&self) -> String {
        self.last_request().map(|r| r.prompt).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(LlmResponse {
            content: format!("  {}\n", self.reply),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 5),
        })
    }
}
