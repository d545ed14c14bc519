//! Query command handler.

use clap::Args;
use ragbot_core::config::AppConfig;
use ragbot_server::AppState;

/// Answer a question from the indexed documents
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// The question to ask
    pub question: String,

    /// Number of passages to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl QueryCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let state = AppState::from_config(config)?;
        let outcome = state.pipeline.query(&self.question, self.top_k).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            return Ok(());
        }

        println!("{}", outcome.answer.text);
        if !outcome.answer.sources.is_empty() {
            println!();
            println!("Sources:");
            for source in &outcome.answer.sources {
                println!("  - {}", source);
            }
        }

        Ok(())
    }
}
