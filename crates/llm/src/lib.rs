//! Language model integration for ragbot.
//!
//! A provider-agnostic completion interface plus two adapters:
//! - **openai**: any OpenAI-compatible `/chat/completions` API (OpenRouter by default)
//! - **ollama**: a local Ollama runtime
//!
//! # Example
//! ```no_run
//! use ragbot_llm::{create_client, LlmRequest};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_client("ollama", None, None, Duration::from_secs(30))?;
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod http;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
