//! Command handlers for the ragbot CLI.

pub mod ingest;
pub mod query;
pub mod search;
pub mod serve;

pub use ingest::IngestCommand;
pub use query::QueryCommand;
pub use search::SearchCommand;
pub use serve::ServeCommand;
