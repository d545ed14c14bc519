//! Core types for the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Free-form metadata stored next to each vector.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata keys written at ingestion and read back at retrieval.
pub mod meta_keys {
    pub const SOURCE: &str = "source";
    pub const SEQUENCE_INDEX: &str = "sequence_index";
    pub const TEXT: &str = "text";
    pub const CHAR_OFFSET: &str = "char_offset";
    pub const CONTENT_HASH: &str = "content_hash";
    pub const INGESTED_AT: &str = "ingested_at";
    pub const FILE_PATH: &str = "file_path";
}

/// A source document, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    /// Stable identifier, the file name for corpus documents
    pub source_id: String,
    /// Where the document was read from, if anywhere
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Document {
    pub fn new(source_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_id: source_id.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Similarity metric of a vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Euclidean,
    #[serde(rename = "dotproduct")]
    DotProduct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::DotProduct => "dotproduct",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(Self::Cosine),
            "euclidean" => Some(Self::Euclidean),
            "dotproduct" => Some(Self::DotProduct),
            _ => None,
        }
    }
}

/// The logical index a deployment writes to and reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
}

/// One retrieved passage with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub text: String,
    pub source_id: String,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_index: Option<usize>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Passages ranked by descending score, at most `top_k` long.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub passages: Vec<ScoredPassage>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Source ids in first-seen ranking order, without repeats.
    pub fn unique_sources(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.passages
            .iter()
            .filter(|p| seen.insert(p.source_id.as_str()))
            .map(|p| p.source_id.clone())
            .collect()
    }
}

/// A grounded answer with deduplicated source attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<String>,
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    pub documents: usize,
    pub chunks: usize,
    pub batches: usize,
    pub dimension: usize,
    pub duration_secs: f64,
}

/// Listing entry for a corpus document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub title: String,
    pub preview: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(source: &str, score: f32) -> ScoredPassage {
        ScoredPassage {
            text: format!("text from {}", source),
            source_id: source.to_string(),
            score,
            sequence_index: None,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn test_unique_sources_first_seen_order() {
        let result = RetrievalResult {
            passages: vec![
                passage("A", 0.9),
                passage("B", 0.8),
                passage("A", 0.7),
                passage("C", 0.6),
            ],
        };
        assert_eq!(result.unique_sources(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_metric_serde_names() {
        assert_eq!(serde_json::to_string(&Metric::DotProduct).unwrap(), "\"dotproduct\"");
        assert_eq!(Metric::parse("COSINE"), Some(Metric::Cosine));
        assert_eq!(Metric::parse("manhattan"), None);
    }
}
