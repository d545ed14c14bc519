//! Grounding prompt builder.

use crate::template::DEFAULT_GROUNDING_TEMPLATE;
use handlebars::Handlebars;
use ragbot_core::{AppError, AppResult};
use serde::Serialize;

const TEMPLATE_NAME: &str = "grounding";

/// Separator placed between passages in the rendered context block.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Variables available to a grounding template.
#[derive(Debug, Serialize)]
pub struct GroundingInput<'a> {
    /// Passage texts joined in retrieval order
    pub context: String,
    /// The user's question, verbatim
    pub question: &'a str,
}

impl<'a> GroundingInput<'a> {
    pub fn new<S: AsRef<str>>(question: &'a str, passages: &[S]) -> Self {
        let context = passages
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(PASSAGE_SEPARATOR);
        Self { context, question }
    }
}

/// A compiled grounding template, built once and shared across requests.
pub struct GroundingTemplate {
    registry: Handlebars<'static>,
}

impl GroundingTemplate {
    /// Compile `source` as the grounding template.
    pub fn new(source: &str) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Plain text prompt: no HTML escaping
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);

        registry
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

        Ok(Self { registry })
    }

    /// Compile the stock template.
    pub fn builtin() -> AppResult<Self> {
        Self::new(DEFAULT_GROUNDING_TEMPLATE)
    }

    /// Render the prompt for one question.
    pub fn render(&self, input: &GroundingInput<'_>) -> AppResult<String> {
        self.registry
            .render(TEMPLATE_NAME, input)
            .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
    }
}
