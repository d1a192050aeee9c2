//! Configuration loading, validation, and management for Capstone.
//!
//! Loads configuration from `~/.capstone/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.capstone/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Conversation orchestrator settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Document ingestion settings
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Vector index settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Capability settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.5-flash-lite".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("ingestion", &self.ingestion)
            .field("index", &self.index)
            .field("tools", &self.tools)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

/// Per-provider overrides.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on tool-dispatch rounds within one turn
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Replaces the built-in system instruction when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_max_tool_iterations() -> usize {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_tool_iterations(),
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks per upsert call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Wait before retrying a failed batch
    #[serde(default = "default_retry_cooldown_secs")]
    pub retry_cooldown_secs: u64,

    /// Pause between successful batches
    #[serde(default = "default_batch_cooldown_secs")]
    pub batch_cooldown_secs: u64,
}

fn default_chunk_size() -> usize {
    1024
}
fn default_chunk_overlap() -> usize {
    256
}
fn default_batch_size() -> usize {
    5
}
fn default_retry_cooldown_secs() -> u64 {
    30
}
fn default_batch_cooldown_secs() -> u64 {
    5
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            batch_size: default_batch_size(),
            retry_cooldown_secs: default_retry_cooldown_secs(),
            batch_cooldown_secs: default_batch_cooldown_secs(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// "memory" or "pinecone"
    #[serde(default = "default_index_backend")]
    pub backend: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Passages returned by document search
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinecone_api_key: Option<String>,

    #[serde(default = "default_pinecone_index")]
    pub pinecone_index: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinecone_namespace: Option<String>,

    /// Embedding dimension used when the index has to be created
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "default_cloud")]
    pub cloud: String,

    #[serde(default = "default_region")]
    pub region: String,
}

fn default_index_backend() -> String {
    "memory".into()
}
fn default_embedding_model() -> String {
    "text-embedding-004".into()
}
fn default_top_k() -> usize {
    3
}
fn default_pinecone_index() -> String {
    "capstone-agent-index".into()
}
fn default_dimension() -> usize {
    768
}
fn default_cloud() -> String {
    "aws".into()
}
fn default_region() -> String {
    "us-east-1".into()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            embedding_model: default_embedding_model(),
            top_k: default_top_k(),
            pinecone_api_key: None,
            pinecone_index: default_pinecone_index(),
            pinecone_namespace: None,
            dimension: default_dimension(),
            cloud: default_cloud(),
            region: default_region(),
        }
    }
}

impl std::fmt::Debug for IndexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexConfig")
            .field("backend", &self.backend)
            .field("embedding_model", &self.embedding_model)
            .field("top_k", &self.top_k)
            .field("pinecone_api_key", &redact(&self.pinecone_api_key))
            .field("pinecone_index", &self.pinecone_index)
            .field("pinecone_namespace", &self.pinecone_namespace)
            .field("dimension", &self.dimension)
            .field("cloud", &self.cloud)
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Timeout for outbound HTTP calls made by tools
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Fetched page text beyond this is truncated
    #[serde(default = "default_url_fetch_max_chars")]
    pub url_fetch_max_chars: usize,

    #[serde(default = "default_web_search_max_results")]
    pub web_search_max_results: usize,

    /// Characters of each passage shown by document search
    #[serde(default = "default_passage_preview_chars")]
    pub passage_preview_chars: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_http_timeout_secs() -> u64 {
    10
}
fn default_url_fetch_max_chars() -> usize {
    5000
}
fn default_web_search_max_results() -> usize {
    5
}
fn default_passage_preview_chars() -> usize {
    500
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout_secs(),
            url_fetch_max_chars: default_url_fetch_max_chars(),
            web_search_max_results: default_web_search_max_results(),
            passage_preview_chars: default_passage_preview_chars(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Upload body limit in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.capstone/config.toml).
    ///
    /// Environment variables override the file:
    /// - `CAPSTONE_API_KEY`, then `GEMINI_API_KEY`, then `OPENAI_API_KEY`
    /// - `CAPSTONE_PROVIDER`, `CAPSTONE_MODEL`
    /// - `PINECONE_API_KEY`, `CAPSTONE_INDEX_BACKEND`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("CAPSTONE_API_KEY")
                .ok()
                .or_else(|| std::env::var("GEMINI_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("CAPSTONE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("CAPSTONE_MODEL") {
            self.default_model = model;
        }

        if self.index.pinecone_api_key.is_none() {
            self.index.pinecone_api_key = std::env::var("PINECONE_API_KEY").ok();
        }

        if let Ok(backend) = std::env::var("CAPSTONE_INDEX_BACKEND") {
            self.index.backend = backend;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".capstone")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.ingestion.chunk_size == 0 {
            return Err(ConfigError::ValidationError("ingestion.chunk_size must be > 0".into()));
        }

        if self.ingestion.chunk_overlap >= self.ingestion.chunk_size {
            return Err(ConfigError::ValidationError(
                "ingestion.chunk_overlap must be smaller than ingestion.chunk_size".into(),
            ));
        }

        if self.ingestion.batch_size == 0 {
            return Err(ConfigError::ValidationError("ingestion.batch_size must be > 0".into()));
        }

        if self.agent.max_tool_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_tool_iterations must be > 0".into(),
            ));
        }

        if self.index.top_k == 0 {
            return Err(ConfigError::ValidationError("index.top_k must be > 0".into()));
        }

        match self.index.backend.as_str() {
            "memory" | "pinecone" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "index.backend must be 'memory' or 'pinecone', got '{other}'"
                )));
            }
        }

        Ok(())
    }

    /// API key for the given provider: per-provider entry first, then the global key.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            ingestion: IngestionConfig::default(),
            index: IndexConfig::default(),
            tools: ToolsConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
