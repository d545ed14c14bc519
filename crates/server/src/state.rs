use ragbot_core::{AppConfig, AppResult};
use ragbot_knowledge::{RagPipeline, RagStack};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared by every handler. Holds no per-request state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
    pub data_dir: PathBuf,
}

impl AppState {
    pub fn new(pipeline: Arc<RagPipeline>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            data_dir: data_dir.into(),
        }
    }

    /// Build the providers and the query pipeline from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let stack = RagStack::from_config(config)?;
        let llm = ragbot_llm::create_client(
            &config.llm.provider,
            config.llm.endpoint.as_deref(),
            config.llm.api_key.as_deref(),
            config.rag.request_timeout(),
        )?;
        let pipeline = stack.pipeline(config, llm, RagStack::grounding_template(config)?);

        Ok(Self::new(Arc::new(pipeline), &config.data_dir))
    }
}
