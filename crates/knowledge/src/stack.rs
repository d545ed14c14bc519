//! Wiring of the pipeline components from configuration.

use crate::chunk::ChunkConfig;
use crate::composer::{AnswerComposer, ComposerSettings};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::index_manager::IndexManager;
use crate::ingest::{IngestSettings, Ingestor};
use crate::pipeline::RagPipeline;
use crate::retriever::{Retriever, RetrieverSettings};
use crate::vector_store::{create_store, VectorStore};
use ragbot_core::{AppConfig, AppResult};
use ragbot_llm::LlmClient;
use ragbot_prompt::{load_template, GroundingTemplate};
use std::sync::Arc;

/// The shared providers every pipeline component is built from.
#[derive(Clone)]
pub struct RagStack {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub store: Arc<dyn VectorStore>,
    pub index: Arc<IndexManager>,
}

impl RagStack {
    /// Build the embedder, store and index manager described by `config`.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let timeout = config.rag.request_timeout();
        let embedder = create_provider(&config.embedding, timeout)?;
        let store = create_store(&config.vector_store, timeout)?;
        Ok(Self::new(embedder, store, config))
    }

    /// Assemble from already-built providers.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: &AppConfig,
    ) -> Self {
        let index = Arc::new(IndexManager::new(
            Arc::clone(&store),
            &config.vector_store.index_name,
            config.vector_store.dimension_policy,
            config.rag.request_timeout(),
        ));

        Self {
            embedder,
            store,
            index,
        }
    }

    /// The grounding template named by `rag.promptTemplate`, or the stock one.
    pub fn grounding_template(config: &AppConfig) -> AppResult<GroundingTemplate> {
        match &config.rag.prompt_template {
            Some(path) => GroundingTemplate::new(&load_template(path)?),
            None => GroundingTemplate::builtin(),
        }
    }

    pub fn retriever(&self, config: &AppConfig) -> Retriever {
        Retriever::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.store),
            Arc::clone(&self.index),
            RetrieverSettings::from_settings(&config.rag),
        )
    }

    pub fn ingestor(&self, config: &AppConfig) -> AppResult<Ingestor> {
        Ok(Ingestor::new(
            Arc::clone(&self.embedder),
            Arc::clone(&self.store),
            Arc::clone(&self.index),
            ChunkConfig::from_settings(&config.rag)?,
            IngestSettings {
                batch_size: config.embedding.batch_size,
                concurrency: config.rag.ingest_concurrency,
                timeout: config.rag.request_timeout(),
            },
        ))
    }

    pub fn pipeline(
        &self,
        config: &AppConfig,
        llm: Arc<dyn LlmClient>,
        template: GroundingTemplate,
    ) -> RagPipeline {
        let composer = AnswerComposer::new(
            llm,
            template,
            ComposerSettings::from_settings(&config.llm, &config.rag),
        );
        RagPipeline::new(self.retriever(config), composer, config.rag.top_k)
    }
}
