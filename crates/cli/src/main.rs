//! ragbot command-line entry point.
//!
//! Serves the HTTP API, ingests the markdown corpus, and answers or searches
//! from the terminal.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{IngestCommand, QueryCommand, SearchCommand, ServeCommand};
use ragbot_core::{config::AppConfig, logging};
use std::path::PathBuf;

/// Retrieval-augmented question answering over a markdown corpus
#[derive(Parser, Debug)]
#[command(name = "ragbot")]
#[command(about = "Answer questions from your markdown documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file (default: ragbot.yaml if present)
    #[arg(short, long, global = true, env = "RAGBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the markdown corpus
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Vector index name
    #[arg(long, global = true)]
    index_name: Option<String>,

    /// Log level or filter directive (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API and chat page
    Serve(ServeCommand),

    /// Chunk, embed and store the markdown corpus
    Ingest(IngestCommand),

    /// Answer a question from the indexed documents
    Query(QueryCommand),

    /// Show the passages most similar to a question
    Search(SearchCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_file = cli.config.clone();
    let config = AppConfig::load_with(|key| match (key, &config_file) {
        ("RAGBOT_CONFIG", Some(path)) => Some(path.to_string_lossy().to_string()),
        _ => std::env::var(key).ok(),
    })
    .context("Failed to load configuration")?;

    let mut config = config.with_overrides(
        cli.data_dir,
        cli.index_name,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    config.log_json |= cli.log_json;

    logging::init_from_config(&config).context("Failed to initialize logging")?;
    config.validate().context("Invalid configuration")?;

    tracing::info!("ragbot starting");
    tracing::debug!("Data directory: {:?}", config.data_dir);
    tracing::debug!(
        "Index: {} ({})",
        config.vector_store.index_name,
        config.vector_store.backend
    );
    tracing::debug!(
        "Embedding: {} {} ({} dims)",
        config.embedding.provider,
        config.embedding.model,
        config.embedding.dimensions
    );

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Ingest(_) => "ingest",
        Commands::Query(_) => "query",
        Commands::Search(_) => "search",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(config).await,
        Commands::Ingest(cmd) => cmd.execute(&config).await,
        Commands::Query(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}
