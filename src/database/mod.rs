// Database module
// Connection handling for the Postgres-backed vector store.

pub mod models;
pub mod store;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::{Result, SearchError};

pub struct Database {
    pool: PgPool,
}

impl Database {
    #[inline]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.url)
            .await
            .map_err(|e| SearchError::Store(format!("Failed to connect to Postgres: {e}")))?;

        info!("Connected to Postgres");
        Ok(Self { pool })
    }

    #[inline]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
