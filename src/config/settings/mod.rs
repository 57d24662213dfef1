
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1536;

/// Environment variables that override the API keys stored in the config
/// file, so deployments can keep secrets out of the TOML.
pub const EMBEDDING_API_KEY_VAR: &str = "CATALOG_SEARCH_EMBEDDING_API_KEY";
pub const GENERATION_API_KEY_VAR: &str = "CATALOG_SEARCH_GENERATION_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/catalog_search".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub dimension: u32,
    pub batch_size: u32,
    pub timeout_seconds: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "text-embedding-3-small".to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            batch_size: 64,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Minimum similarity a product must reach to count as a match. One
    /// global cutoff for every query.
    pub similarity_floor: f64,
    pub result_limit: i64,
    /// Units sold at or above which a product is labeled popular.
    pub popularity_threshold: i64,
    /// Stock level at or below which a product (still in stock) is labeled
    /// scarce.
    pub scarcity_threshold: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_floor: 0.35,
            result_limit: 50,
            popularity_threshold: 50,
            scarcity_threshold: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { batch_size: 64 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8700,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid database URL: {0} (must start with postgres:// or postgresql://)")]
    InvalidDatabaseUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid max connections: {0} (must be between 1 and 100)")]
    InvalidMaxConnections(u32),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u64),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 300 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid similarity floor: {0} (must be between 0.0 and 1.0 exclusive)")]
    InvalidSimilarityFloor(f64),
    #[error("Invalid result limit: {0} (must be between 1 and 200)")]
    InvalidResultLimit(i64),
    #[error("Invalid popularity threshold: {0} (must be at least 1)")]
    InvalidPopularityThreshold(i64),
    #[error("Invalid scarcity threshold: {0} (must be at least 1)")]
    InvalidScarcityThreshold(i64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Load from the default per-user configuration directory.
    #[inline]
    pub fn load_default() -> Result<Self> {
        Self::load(Self::default_dir()?)
    }

    #[inline]
    pub fn default_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or(ConfigError::DirectoryError)?
            .join("catalog-search");
        Ok(dir)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.embedding.validate()?;
        self.generation.validate()?;
        self.search.validate()?;
        self.ingest.validate()?;
        self.server.validate()?;
        Ok(())
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            search: SearchConfig::default(),
            ingest: IngestConfig::default(),
            server: ServerConfig::default(),
            base_dir: PathBuf::new(),
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ConfigError::InvalidDatabaseUrl(self.url.clone()));
        }
        if self.max_connections == 0 || self.max_connections > 100 {
            return Err(ConfigError::InvalidMaxConnections(self.max_connections));
        }
        Ok(())
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(u64::from(self.batch_size)));
        }

        if !(64..=4096).contains(&self.dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(self.dimension));
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    /// Resolved API key, preferring the environment over the config file.
    #[inline]
    pub fn resolved_api_key(&self) -> String {
        env::var(EMBEDDING_API_KEY_VAR).unwrap_or_else(|_| self.api_key.clone())
    }

    pub fn embeddings_url(&self) -> Result<Url, ConfigError> {
        join_endpoint(&self.base_url, "embeddings")
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    #[inline]
    pub fn resolved_api_key(&self) -> String {
        env::var(GENERATION_API_KEY_VAR).unwrap_or_else(|_| self.api_key.clone())
    }

    pub fn chat_completions_url(&self) -> Result<Url, ConfigError> {
        join_endpoint(&self.base_url, "chat/completions")
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.similarity_floor > 0.0 && self.similarity_floor < 1.0) {
            return Err(ConfigError::InvalidSimilarityFloor(self.similarity_floor));
        }
        if self.result_limit < 1 || self.result_limit > 200 {
            return Err(ConfigError::InvalidResultLimit(self.result_limit));
        }
        if self.popularity_threshold < 1 {
            return Err(ConfigError::InvalidPopularityThreshold(
                self.popularity_threshold,
            ));
        }
        if self.scarcity_threshold < 1 {
            return Err(ConfigError::InvalidScarcityThreshold(
                self.scarcity_threshold,
            ));
        }
        Ok(())
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size as u64));
        }
        Ok(())
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }
        Ok(())
    }

    #[inline]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn join_endpoint(base_url: &str, path: &str) -> Result<Url, ConfigError> {
    let normalized = format!("{}/{}", base_url.trim_end_matches('/'), path);
    Url::parse(&normalized).map_err(|_| ConfigError::InvalidUrl(normalized))
}
