//! Offline embedding provider based on hashed character trigrams.

use crate::embeddings::provider::EmbeddingProvider;
use ragbot_core::AppResult;
use std::collections::HashMap;

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them", "what",
];

/// Deterministic, content-dependent embeddings without a model.
///
/// Words (minus stop words and punctuation) are hashed into the vector
/// along with their character trigrams, then the vector is normalized.
/// Texts sharing vocabulary land close together, which is enough for
/// local development and tests. Empty input maps to the zero vector.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        for (word, count) in term_counts(text) {
            let weight = count as f32;

            vector[bucket(word.as_bytes(), 31, self.dimensions)] += weight;

            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                vector[bucket(trigram.as_bytes(), 37, self.dimensions)] += weight.sqrt();
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

fn term_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for raw in text.split_whitespace() {
        let word: String = raw
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if word.chars().count() > 2 && !STOP_WORDS.contains(&word.as_str()) {
            *counts.entry(word).or_insert(0) += 1;
        }
    }
    counts
}

fn bucket(bytes: &[u8], multiplier: u64, dimensions: usize) -> usize {
    let hash = bytes
        .iter()
        .fold(0u64, |acc, b| acc.wrapping_mul(multiplier).wrapping_add(*b as u64));
    (hash % dimensions as u64) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vectorize(text)).collect())
    }
}
