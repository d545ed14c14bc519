use clap::Args;
use ragbot_core::config::AppConfig;
use ragbot_knowledge::RagStack;

/// Show the passages most similar to a question
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Text to search for
    pub question: String,

    /// Number of passages to return
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        // Retrieval only, no LLM client.
        let retriever = RagStack::from_config(config)?.retriever(config);
        let top_k = self.top_k.unwrap_or(config.rag.top_k);
        let result = retriever.retrieve(&self.question, top_k).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(());
        }

        if result.is_empty() {
            println!("No matching passages.");
            return Ok(());
        }

        for (rank, passage) in result.passages.iter().enumerate() {
            println!(
                "{}. [{:.3}] {}{}",
                rank + 1,
                passage.score,
                passage.source_id,
                passage
                    .sequence_index
                    .map(|i| format!(" #{}", i))
                    .unwrap_or_default()
            );
            println!("   {}", passage.text.replace('\n', "\n   "));
        }

        Ok(())
    }
}
