//! Document chunking.
//!
//! Splits documents into overlapping windows of at most `chunk_size`
//! characters. Each chunk is a fresh segment of at most
//! `chunk_size - chunk_overlap` characters prefixed by the `chunk_overlap`
//! characters that precede it in the document, so consecutive chunks share
//! exactly `chunk_overlap` characters (fewer only near the document start).

mod segment;

use crate::types::Document;
use ragbot_core::config::RagSettings;
use ragbot_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A window of document text, the unit that gets embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id derived from source and position
    pub id: String,

    /// Source document identifier
    pub source_id: String,

    /// Position in the document (0-indexed)
    pub sequence_index: usize,

    /// Character offset of the first character inside the document
    pub char_offset: usize,

    /// Chunk text content
    pub text: String,
}

impl Chunk {
    /// Stable vector id for a chunk position, so re-ingestion overwrites.
    pub fn id_for(source_id: &str, sequence_index: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source_id.as_bytes());
        hasher.update(b":");
        hasher.update(sequence_index.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Chunk window settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl ChunkConfig {
    /// Fails unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> AppResult<Self> {
        if chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be positive".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_settings(settings: &RagSettings) -> AppResult<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn fresh_budget(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Split every document, preserving document order and in-document order.
pub fn split(documents: &[Document], config: &ChunkConfig) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = documents
        .iter()
        .flat_map(|doc| split_document(doc, config))
        .collect();

    tracing::debug!(
        "Split {} documents into {} chunks (size={}, overlap={})",
        documents.len(),
        chunks.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    chunks
}

/// Split one document. Blank documents yield no chunks.
pub fn split_document(document: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    let text = document.content.as_str();
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut fresh_char_start = 0;

    for (sequence_index, range) in segment::segment(text, config.fresh_budget())
        .into_iter()
        .enumerate()
    {
        let start = overlap_start(text, range.start, config.chunk_overlap);
        let char_offset = fresh_char_start - text[start..range.start].chars().count();

        chunks.push(Chunk {
            id: Chunk::id_for(&document.source_id, sequence_index),
            source_id: document.source_id.clone(),
            sequence_index,
            char_offset,
            text: text[start..range.end].to_string(),
        });

        fresh_char_start += text[range].chars().count();
    }

    chunks
}

/// Byte index `overlap` characters before `at`, clamped to the start.
fn overlap_start(text: &str, at: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return at;
    }
    text[..at]
        .char_indices()
        .rev()
        .nth(overlap - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}
