//! Grounded answer composition.
//!
//! One prompt per question: retrieved passages in ranking order, then the
//! question, then the instruction to stay within that context. The model is
//! called at temperature 0 with a bounded output length.

use crate::deadline::bounded;
use crate::types::{Answer, RetrievalResult};
use ragbot_core::config::{LlmSettings, RagSettings};
use ragbot_core::AppResult;
use ragbot_llm::{LlmClient, LlmRequest};
use ragbot_prompt::{GroundingInput, GroundingTemplate};
use std::sync::Arc;
use std::time::Duration;

/// Returned without calling the model when retrieval found nothing.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "I don't know. The indexed documents do not contain information relevant to this question.";

/// Sampling temperature for every answer.
pub const ANSWER_TEMPERATURE: f32 = 0.0;

/// Model parameters for answer generation.
#[derive(Debug, Clone)]
pub struct ComposerSettings {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ComposerSettings {
    pub fn from_settings(llm: &LlmSettings, rag: &RagSettings) -> Self {
        Self {
            model: llm.model.clone(),
            max_tokens: llm.max_tokens,
            timeout: rag.request_timeout(),
        }
    }
}

pub struct AnswerComposer {
    llm: Arc<dyn LlmClient>,
    template: GroundingTemplate,
    settings: ComposerSettings,
}

impl AnswerComposer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        template: GroundingTemplate,
        settings: ComposerSettings,
    ) -> Self {
        Self {
            llm,
            template,
            settings,
        }
    }

    /// Compose an answer to `question` from `retrieval`.
    ///
    /// Makes exactly one model call when there are passages. With none, the
    /// model is not called at all and the fixed insufficient-context answer
    /// is returned, so an empty index never produces an ungrounded reply.
    #[tracing::instrument(skip_all, fields(passages = retrieval.len()))]
    pub async fn compose(&self, question: &str, retrieval: &RetrievalResult) -> AppResult<Answer> {
        if retrieval.is_empty() {
            tracing::info!("No supporting passages; returning insufficient-context answer");
            return Ok(Answer {
                text: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let passages: Vec<&str> = retrieval.passages.iter().map(|p| p.text.as_str()).collect();
        let prompt = self.template.render(&GroundingInput::new(question, &passages))?;

        let request = LlmRequest::new(prompt, &self.settings.model)
            .with_temperature(ANSWER_TEMPERATURE)
            .with_max_tokens(self.settings.max_tokens);

        tracing::debug!(
            "Requesting answer from {} (model={})",
            self.llm.provider_name(),
            self.settings.model
        );

        let response = bounded(
            "answer generation",
            self.settings.timeout,
            self.llm.complete(&request),
        )
        .await?;

        tracing::debug!(
            "Answer generated ({} prompt tokens, {} completion tokens)",
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );

        Ok(Answer {
            text: response.content.trim().to_string(),
            sources: retrieval.unique_sources(),
        })
    }
}
