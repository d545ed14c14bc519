//! Ingest command handler.

use anyhow::Context;
use clap::Args;
use ragbot_core::config::AppConfig;
use ragbot_knowledge::{corpus, RagStack};

/// Chunk, embed and store the markdown corpus
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Ingesting corpus from {:?}", config.data_dir);

        let documents = corpus::load_markdown_documents(&config.data_dir)
            .with_context(|| format!("Failed to load documents from {:?}", config.data_dir))?;
        if documents.is_empty() {
            tracing::warn!("No markdown files found in {:?}", config.data_dir);
        }

        let stack = RagStack::from_config(config)?;
        let stats = stack.ingestor(config)?.ingest(&documents).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Ingested {} documents ({} chunks in {} batches, {} dims) into '{}' in {:.2}s",
                stats.documents,
                stats.chunks,
                stats.batches,
                stats.dimension,
                config.vector_store.index_name,
                stats.duration_secs
            );
        }

        Ok(())
    }
}
