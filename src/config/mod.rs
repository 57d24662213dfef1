pub mod settings;

pub use settings::{
    Config, ConfigError, DatabaseConfig, EmbeddingConfig, GenerationConfig, IngestConfig,
    SearchConfig, ServerConfig,
};
