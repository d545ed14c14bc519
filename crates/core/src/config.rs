//! Configuration management for ragbot.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - A YAML config file (`ragbot.yaml` or the path in `RAGBOT_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! `AppConfig::load` is the only place that reads the process environment.
//! Everything downstream receives the finished value by reference.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};

const KNOWN_LLM_PROVIDERS: [&str; 3] = ["openai", "openrouter", "ollama"];
const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["openai", "ollama", "mock"];
const KNOWN_BACKENDS: [&str; 2] = ["sqlite", "pinecone"];

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Main application configuration.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Directory holding the markdown corpus
    pub data_dir: PathBuf,

    /// Directory holding the static chat page
    pub static_dir: PathBuf,

    /// Language model settings
    pub llm: LlmSettings,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Vector store settings
    pub vector_store: VectorStoreSettings,

    /// Chunking and retrieval settings
    pub rag: RagSettings,

    /// HTTP server settings
    pub server: ServerSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,
}

/// Language model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// Provider name: "openai" (any OpenAI-compatible API) or "ollama"
    pub provider: String,
    pub model: String,
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Output bound per answer; sampling temperature is always 0
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "google/gemma-3-12b-it:free".to_string(),
            endpoint: Some(OPENROUTER_BASE_URL.to_string()),
            api_key_env: Some("OPENROUTER_API_KEY".to_string()),
            api_key: None,
            max_tokens: 1000,
        }
    }
}

/// Embedding model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Provider name: "openai", "ollama" or "mock"
    pub provider: String,
    pub model: String,
    /// Output dimensionality of the model
    pub dimensions: usize,
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Texts per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "openai/text-embedding-3-small".to_string(),
            dimensions: 1536,
            endpoint: Some(OPENROUTER_BASE_URL.to_string()),
            api_key_env: Some("OPENROUTER_API_KEY".to_string()),
            api_key: None,
            batch_size: 64,
        }
    }
}

/// What the index manager does when the index dimension is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DimensionPolicy {
    /// Delete the index and recreate it (all vectors are lost).
    #[default]
    Recreate,
    /// Refuse and report a dimension mismatch.
    Fail,
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VectorStoreSettings {
    /// Backend name: "sqlite" or "pinecone"
    pub backend: String,
    pub index_name: String,
    /// SQLite database path (":memory:" for an ephemeral store)
    pub path: PathBuf,
    /// Pinecone control plane URL override
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
    pub cloud: String,
    pub region: Option<String>,
    pub dimension_policy: DimensionPolicy,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            index_name: "rag-bot-index".to_string(),
            path: PathBuf::from(".ragbot/index.sqlite"),
            endpoint: None,
            api_key_env: Some("PINECONE_API_KEY".to_string()),
            api_key: None,
            cloud: "aws".to_string(),
            region: None,
            dimension_policy: DimensionPolicy::Recreate,
        }
    }
}

/// Chunking and retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RagSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Default number of passages when a request does not say
    pub top_k: usize,
    /// Ceiling applied to any requested top_k
    pub max_top_k: usize,
    /// Optional similarity floor; passages below it are dropped
    pub min_score: Option<f32>,
    /// Embed/upsert batches in flight during ingestion
    pub ingest_concurrency: usize,
    /// Bound applied to every external call
    pub request_timeout_secs: u64,
    /// Handlebars file replacing the stock grounding prompt
    pub prompt_template: Option<PathBuf>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            max_top_k: 50,
            min_score: None,
            ingest_concurrency: 4,
            request_timeout_secs: 30,
            prompt_template: None,
        }
    }
}

impl RagSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    static_dir: Option<PathBuf>,
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    vector_store: Option<VectorStoreSettings>,
    rag: Option<RagSettings>,
    server: Option<ServerSettings>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            data_dir: PathBuf::from("data"),
            static_dir: PathBuf::from("static"),
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            vector_store: VectorStoreSettings::default(),
            rag: RagSettings::default(),
            server: ServerSettings::default(),
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and environment variables.
    ///
    /// Environment variables:
    /// - `RAGBOT_CONFIG`: Path to config file (default `./ragbot.yaml` if present)
    /// - `RAGBOT_DATA_DIR`: Corpus directory
    /// - `RAGBOT_LLM_MODEL`, `RAGBOT_EMBEDDING_MODEL`: Model identifiers
    /// - `RAGBOT_CHUNK_SIZE`, `RAGBOT_CHUNK_OVERLAP`, `RAGBOT_TOP_K`
    /// - `RAGBOT_INDEX_NAME`, `RAGBOT_VECTOR_BACKEND`, `RAGBOT_PINECONE_REGION`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    /// - the variables named by each section's `apiKeyEnv`
    ///
    /// # Example
    /// ```no_run
    /// use ragbot_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {}", config.vector_store.index_name);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    pub fn load_with<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(config_file) = lookup("RAGBOT_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("ragbot.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        config.apply_env(&lookup)?;
        config.resolve_api_keys(&lookup);

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();
        result.config_file = Some(path.to_path_buf());

        if let Some(data_dir) = config_file.data_dir {
            result.data_dir = data_dir;
        }
        if let Some(static_dir) = config_file.static_dir {
            result.static_dir = static_dir;
        }
        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(vector_store) = config_file.vector_store {
            result.vector_store = vector_store;
        }
        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }
        if let Some(server) = config_file.server {
            result.server = server;
        }

        // Merge logging settings
        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(json) = logging.json {
                result.log_json = json;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    fn apply_env<F>(&mut self, lookup: &F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(data_dir) = lookup("RAGBOT_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Some(model) = lookup("RAGBOT_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(model) = lookup("RAGBOT_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(size) = lookup("RAGBOT_CHUNK_SIZE") {
            self.rag.chunk_size = parse_number("RAGBOT_CHUNK_SIZE", &size)?;
        }
        if let Some(overlap) = lookup("RAGBOT_CHUNK_OVERLAP") {
            self.rag.chunk_overlap = parse_number("RAGBOT_CHUNK_OVERLAP", &overlap)?;
        }
        if let Some(top_k) = lookup("RAGBOT_TOP_K") {
            self.rag.top_k = parse_number("RAGBOT_TOP_K", &top_k)?;
        }
        if let Some(index_name) = lookup("RAGBOT_INDEX_NAME") {
            self.vector_store.index_name = index_name;
        }
        if let Some(backend) = lookup("RAGBOT_VECTOR_BACKEND") {
            self.vector_store.backend = backend;
        }
        if let Some(region) = lookup("RAGBOT_PINECONE_REGION") {
            self.vector_store.region = Some(region);
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = Some(level);
        }
        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }
        Ok(())
    }

    fn resolve_api_keys<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |env: &Option<String>| env.as_deref().and_then(lookup);

        if self.llm.api_key.is_none() {
            self.llm.api_key = resolve(&self.llm.api_key_env);
        }
        if self.embedding.api_key.is_none() {
            self.embedding.api_key = resolve(&self.embedding.api_key_env);
        }
        if self.vector_store.api_key.is_none() {
            self.vector_store.api_key = resolve(&self.vector_store.api_key_env);
        }
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        index_name: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(data_dir) = data_dir {
            self.data_dir = data_dir;
        }

        if let Some(index_name) = index_name {
            self.vector_store.index_name = index_name;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate the configuration. Any error here is fatal at startup.
    pub fn validate(&self) -> AppResult<()> {
        let rag = &self.rag;

        if rag.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be positive".to_string()));
        }
        if rag.chunk_overlap >= rag.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                rag.chunk_overlap, rag.chunk_size
            )));
        }
        if rag.top_k == 0 || rag.max_top_k == 0 {
            return Err(AppError::Config(
                "topK and maxTopK must be positive".to_string(),
            ));
        }
        if rag.top_k > rag.max_top_k {
            return Err(AppError::Config(format!(
                "topK ({}) exceeds maxTopK ({})",
                rag.top_k, rag.max_top_k
            )));
        }
        if let Some(min_score) = rag.min_score {
            if !(-1.0..=1.0).contains(&min_score) {
                return Err(AppError::Config(format!(
                    "minScore must be within [-1, 1], got {}",
                    min_score
                )));
            }
        }
        if rag.ingest_concurrency == 0 {
            return Err(AppError::Config(
                "ingestConcurrency must be positive".to_string(),
            ));
        }
        if rag.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "requestTimeoutSecs must be positive".to_string(),
            ));
        }

        self.validate_llm()?;
        self.validate_embedding()?;
        self.validate_vector_store()?;

        Ok(())
    }

    fn validate_llm(&self) -> AppResult<()> {
        let llm = &self.llm;
        check_known("LLM provider", &llm.provider, &KNOWN_LLM_PROVIDERS)?;

        if llm.max_tokens == 0 {
            return Err(AppError::Config("llm.maxTokens must be positive".to_string()));
        }
        if llm.provider != "ollama" {
            require_key("LLM", &llm.api_key, &llm.api_key_env)?;
        }
        Ok(())
    }

    fn validate_embedding(&self) -> AppResult<()> {
        let embedding = &self.embedding;
        check_known(
            "embedding provider",
            &embedding.provider,
            &KNOWN_EMBEDDING_PROVIDERS,
        )?;

        if embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be positive".to_string(),
            ));
        }
        if embedding.batch_size == 0 {
            return Err(AppError::Config(
                "embedding.batchSize must be positive".to_string(),
            ));
        }
        if embedding.provider == "openai" {
            require_key("embedding", &embedding.api_key, &embedding.api_key_env)?;
        }
        Ok(())
    }

    fn validate_vector_store(&self) -> AppResult<()> {
        let store = &self.vector_store;
        check_known("vector store backend", &store.backend, &KNOWN_BACKENDS)?;

        if store.index_name.trim().is_empty() {
            return Err(AppError::Config(
                "vectorStore.indexName must not be empty".to_string(),
            ));
        }
        if store.backend == "pinecone" {
            require_key("Pinecone", &store.api_key, &store.api_key_env)?;
            if store.region.is_none() {
                return Err(AppError::Config(
                    "Pinecone backend requires vectorStore.region".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn parse_number(name: &str, value: &str) -> AppResult<usize> {
    value.trim().parse::<usize>().map_err(|e| {
        AppError::Config(format!("{} must be a non-negative integer: {}", name, e))
    })
}

fn check_known(what: &str, value: &str, known: &[&str]) -> AppResult<()> {
    if known.contains(&value) {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "Unknown {}: {}. Supported: {}",
            what,
            value,
            known.join(", ")
        )))
    }
}

fn require_key(what: &str, key: &Option<String>, env: &Option<String>) -> AppResult<()> {
    match key {
        Some(k) if !k.trim().is_empty() => Ok(()),
        _ => Err(AppError::Config(format!(
            "{} API key not found in environment variable: {}",
            what,
            env.as_deref().unwrap_or("<unset>")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.llm.provider = "ollama".to_string();
        config.embedding.provider = "mock".to_string();
        config.embedding.dimensions = 64;
        config
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.rag.chunk_size, 1000);
        assert_eq!(config.rag.chunk_overlap, 200);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.vector_store.index_name, "rag-bot-index");
        assert_eq!(config.llm.max_tokens, 1000);
        assert!(!config.verbose);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let mut config = offline_config();
        config.rag.chunk_overlap = config.rag.chunk_size;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("chunkOverlap"));
    }

    #[test]
    fn test_validate_offline_config() {
        assert!(offline_config().validate().is_ok());
    }

    #[test]
    fn test_openai_requires_key() {
        let mut config = offline_config();
        config.llm.provider = "openai".to_string();
        assert!(config.validate().is_err());

        config.llm.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_openrouter_alias_accepted() {
        let mut config = offline_config();
        config.llm.provider = "openrouter".to_string();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.llm.api_key = Some("sk-or".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pinecone_requires_key_and_region() {
        let mut config = offline_config();
        config.vector_store.backend = "pinecone".to_string();
        config.vector_store.api_key = Some("pc-test".to_string());
        assert!(config.validate().is_err());

        config.vector_store.region = Some("us-east-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = offline_config();
        config.embedding.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_and_keys() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("absent.yaml");
        let lookup = env_from(&[
            ("RAGBOT_CHUNK_SIZE", "500"),
            ("RAGBOT_CHUNK_OVERLAP", "50"),
            ("RAGBOT_TOP_K", "3"),
            ("OPENROUTER_API_KEY", "sk-or-test"),
            ("NO_COLOR", "1"),
        ]);

        let mut config = AppConfig {
            config_file: Some(missing),
            ..AppConfig::default()
        };
        config.apply_env(&lookup).unwrap();
        config.resolve_api_keys(&lookup);

        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunk_overlap, 50);
        assert_eq!(config.rag.top_k, 3);
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-or-test"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-or-test"));
        assert!(config.no_color);
    }

    #[test]
    fn test_invalid_number_in_env() {
        let mut config = AppConfig::default();
        let lookup = env_from(&[("RAGBOT_CHUNK_SIZE", "big")]);
        assert!(matches!(
            config.apply_env(&lookup),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_load_yaml_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ragbot.yaml");
        std::fs::write(
            &path,
            r#"
dataDir: corpus
embedding:
  provider: mock
  model: trigram-v1
  dimensions: 128
vectorStore:
  backend: sqlite
  path: ":memory:"
  dimensionPolicy: fail
rag:
  chunkSize: 400
  chunkOverlap: 40
logging:
  level: debug
  color: false
"#,
        )
        .unwrap();

        let path_str = path.to_string_lossy().to_string();
        let config = AppConfig::load_with(|key| match key {
            "RAGBOT_CONFIG" => Some(path_str.clone()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("corpus"));
        assert_eq!(config.embedding.dimensions, 128);
        assert_eq!(config.embedding.batch_size, 64);
        assert_eq!(config.vector_store.dimension_policy, DimensionPolicy::Fail);
        assert_eq!(config.rag.chunk_size, 400);
        assert_eq!(config.rag.top_k, 5);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(config.no_color);
    }

    #[test]
    fn test_missing_explicit_config_file() {
        let result = AppConfig::load_with(|key| match key {
            "RAGBOT_CONFIG" => Some("/definitely/not/here.yaml".to_string()),
            _ => None,
        });
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some(PathBuf::from("docs")),
            Some("other-index".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(config.data_dir, PathBuf::from("docs"));
        assert_eq!(config.vector_store.index_name, "other-index");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }
}
