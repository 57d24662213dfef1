use anyhow::Context;
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::Result;
use crate::advice::AdviceGenerator;
use crate::catalog::CatalogSnapshot;
use crate::catalog::taxonomy::Taxonomy;
use crate::config::Config;
use crate::database::Database;
use crate::database::store::CatalogStore;
use crate::embeddings::EmbeddingClient;
use crate::ingest::IngestPipeline;
use crate::search::QueryEngine;
use crate::server::{self, AppState};

async fn open_store(config: &Config) -> Result<CatalogStore> {
    let database = Database::connect(&config.database).await?;
    let store = CatalogStore::new(
        database.pool().clone(),
        config.embedding.dimension as usize,
    );
    store.initialize().await?;
    Ok(store)
}

/// Ingest a catalog snapshot into the vector store.
#[inline]
pub async fn run_ingest(config: &Config, snapshot_path: &Path) -> Result<()> {
    info!("Ingesting catalog snapshot: {}", snapshot_path.display());

    let snapshot = CatalogSnapshot::load(snapshot_path)?;
    let store = open_store(config).await?;
    let embedder = EmbeddingClient::new(&config.embedding)?;

    let pipeline = IngestPipeline::new(store, embedder, config.ingest.batch_size);
    let report = pipeline.run(&snapshot).await?;

    println!(
        "{} Indexed {} products in {} batches",
        style("✓").green(),
        report.products_indexed,
        report.batches
    );
    println!("  Skipped (invisible): {}", report.products_skipped);
    println!(
        "  Categories upserted: {}, tags upserted: {}",
        report.categories, report.tags
    );

    Ok(())
}

/// Start the search API server.
#[inline]
pub async fn run_serve(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let taxonomy = Arc::new(Taxonomy::load(&store).await?);
    let embedder = EmbeddingClient::new(&config.embedding)?;
    let advisor = AdviceGenerator::new(&config.generation)?;

    let engine = QueryEngine::new(store, embedder, advisor, taxonomy, config.search.clone());
    let state = Arc::new(AppState { engine });

    server::serve(state, &config.server.bind_addr()).await
}

/// Show store statistics.
#[inline]
pub async fn show_status(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let counts = store.counts().await?;

    println!("Products:   {}", counts.products);
    println!("Searchable: {} (visible with embedding)", counts.searchable);
    println!("Categories: {}", counts.categories);
    println!("Tags:       {}", counts.tags);

    if counts.products > counts.searchable {
        println!(
            "{} {} products are not searchable; re-run ingestion if this is unexpected",
            style("!").yellow(),
            counts.products - counts.searchable
        );
    }

    Ok(())
}

/// Print the active configuration with secrets redacted.
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    let mut display = config.clone();
    if !display.embedding.api_key.is_empty() {
        display.embedding.api_key = "<set>".to_string();
    }
    if !display.generation.api_key.is_empty() {
        display.generation.api_key = "<set>".to_string();
    }

    let rendered =
        toml::to_string_pretty(&display).context("Failed to render configuration")?;
    println!("# {}", config.config_file_path().display());
    print!("{rendered}");

    Ok(())
}
