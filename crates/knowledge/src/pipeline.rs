//! Query-side facade over retrieval and answer composition.

use crate::composer::AnswerComposer;
use crate::retriever::Retriever;
use crate::types::{Answer, RetrievalResult};
use ragbot_core::AppResult;
use serde::Serialize;

/// The answer together with the passages it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub answer: Answer,
    pub passages: RetrievalResult,
}

/// Shared across concurrent requests; `top_k` is chosen per call.
pub struct RagPipeline {
    retriever: Retriever,
    composer: AnswerComposer,
    default_top_k: usize,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, composer: AnswerComposer, default_top_k: usize) -> Self {
        Self {
            retriever,
            composer,
            default_top_k,
        }
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Retrieve passages and compose a grounded answer.
    pub async fn query(&self, question: &str, top_k: Option<usize>) -> AppResult<QueryOutcome> {
        let passages = self.search(question, top_k).await?;
        let answer = self.composer.compose(question, &passages).await?;
        Ok(QueryOutcome { answer, passages })
    }

    /// Similarity search only, no answer generation.
    pub async fn search(&self, question: &str, top_k: Option<usize>) -> AppResult<RetrievalResult> {
        self.retriever
            .retrieve(question, top_k.unwrap_or(self.default_top_k))
            .await
    }
}
