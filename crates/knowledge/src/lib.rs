//! Retrieval-augmented question answering over a markdown corpus.
//!
//! Documents are split into overlapping chunks, embedded and stored in a
//! vector index. A question is embedded the same way, its nearest passages
//! are retrieved, and a language model answers from those passages only.

pub mod chunk;
pub mod composer;
pub mod corpus;
pub mod deadline;
pub mod embeddings;
pub mod index_manager;
pub mod ingest;
pub mod pipeline;
pub mod retriever;
pub mod stack;
pub mod types;
pub mod vector_store;

#[cfg(test)]
mod tests;

pub use chunk::{Chunk, ChunkConfig};
pub use composer::{AnswerComposer, ComposerSettings, INSUFFICIENT_CONTEXT_ANSWER};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index_manager::{IndexManager, IndexState};
pub use ingest::{IngestSettings, Ingestor};
pub use pipeline::{QueryOutcome, RagPipeline};
pub use retriever::{Retriever, RetrieverSettings};
pub use stack::RagStack;
pub use types::{
    Answer, Document, DocumentSummary, IndexDescriptor, IngestStats, Metric, RetrievalResult,
    ScoredPassage,
};
pub use vector_store::{create_store, VectorStore};
