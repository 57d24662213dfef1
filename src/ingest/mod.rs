// Ingestion pipeline
// Turns a catalog snapshot into searchable, vector-indexed product rows:
// normalize -> one embedding call per batch -> idempotent upserts. A batch
// failure aborts the run; committed batches stay valid and a re-run from the
// start is the recovery path.

#[cfg(test)]
mod tests;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::catalog::normalizer::{self, NormalizedProduct};
use crate::catalog::{CatalogLookups, CatalogSnapshot, RawProduct, VariantTotals};
use crate::database::models::{CategoryRecord, NewProduct, TagRecord};
use crate::database::store::CatalogStore;
use crate::embeddings::EmbeddingClient;
use crate::{Result, SearchError};

pub struct IngestPipeline {
    store: CatalogStore,
    embedder: EmbeddingClient,
    batch_size: usize,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestReport {
    pub products_indexed: usize,
    pub products_skipped: usize,
    pub categories: usize,
    pub tags: usize,
    pub batches: usize,
}

impl IngestPipeline {
    #[inline]
    pub fn new(store: CatalogStore, embedder: EmbeddingClient, batch_size: usize) -> Self {
        Self {
            store,
            embedder,
            batch_size,
        }
    }

    /// Run one full ingestion pass over the snapshot. Expected to run alone;
    /// batches execute sequentially within the run.
    #[inline]
    pub async fn run(&self, snapshot: &CatalogSnapshot) -> Result<IngestReport> {
        info!(
            products = snapshot.products.len(),
            categories = snapshot.categories.len(),
            tags = snapshot.tags.len(),
            "Starting catalog ingestion"
        );

        // Categories and tags go in first, visible or not: join rows
        // reference them.
        for category in &snapshot.categories {
            self.store
                .upsert_category(&CategoryRecord {
                    id: category.id,
                    title: category.title.clone(),
                })
                .await?;
        }
        for tag in &snapshot.tags {
            self.store
                .upsert_tag(&TagRecord {
                    id: tag.id,
                    title: tag.title.clone(),
                    visible: tag.visible,
                })
                .await?;
        }

        let lookups = CatalogLookups::build(snapshot);
        let visible = snapshot.visible_products();
        let skipped = snapshot.products.len() - visible.len();

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(visible.len() as u64).with_style(
                ProgressStyle::with_template("{bar:30} [{pos}/{len}] Indexing products")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut batches = 0;
        for (batch_index, batch) in visible.chunks(self.batch_size).enumerate() {
            self.process_batch(batch, &lookups).await.map_err(|e| {
                SearchError::Ingestion(format!("Batch {} failed: {e}", batch_index + 1))
            })?;
            batches += 1;
            bar.inc(batch.len() as u64);
            debug!("Committed batch {} ({} products)", batch_index + 1, batch.len());
        }
        bar.finish_and_clear();

        let report = IngestReport {
            products_indexed: visible.len(),
            products_skipped: skipped,
            categories: snapshot.categories.len(),
            tags: snapshot.tags.len(),
            batches,
        };

        info!(
            indexed = report.products_indexed,
            skipped = report.products_skipped,
            batches = report.batches,
            "Catalog ingestion complete"
        );
        Ok(report)
    }

    /// Normalize and embed one batch, then upsert its rows sequentially.
    async fn process_batch(&self, batch: &[&RawProduct], lookups: &CatalogLookups) -> Result<()> {
        let normalized: Vec<NormalizedProduct> = batch
            .iter()
            .map(|product| normalizer::normalize(product, lookups))
            .collect();
        let texts: Vec<String> = normalized
            .iter()
            .map(|n| n.embedding_text.clone())
            .collect();

        let vectors = self.embedder.embed_batch(&texts)?;

        for ((product, normalized), embedding) in
            batch.iter().zip(&normalized).zip(vectors)
        {
            let row = build_product_row(
                product,
                normalized,
                lookups.variant_totals(product.id),
                embedding,
            );
            self.store.upsert_product(&row).await?;
            self.store
                .link_categories(product.id, lookups.category_ids(product.id))
                .await?;
            self.store
                .link_tags(product.id, lookups.tag_ids(product.id))
                .await?;
        }

        Ok(())
    }
}

/// Assemble the stored row for one product. Description and content are
/// persisted HTML-stripped.
#[inline]
pub fn build_product_row(
    product: &RawProduct,
    normalized: &NormalizedProduct,
    totals: VariantTotals,
    embedding: Vec<f32>,
) -> NewProduct {
    NewProduct {
        id: product.id,
        title: product.title.clone(),
        fulltitle: product.fulltitle.clone(),
        description: normalizer::strip_html(&product.description),
        content: normalizer::strip_html(&product.content),
        url: product.url.clone(),
        image: product.image.clone(),
        visible: product.visible,
        price: totals.price,
        old_price: totals.old_price,
        artist: normalized.artist.clone(),
        dimensions: normalized.dimensions.clone(),
        product_type: normalized.product_type.as_str().to_string(),
        stock: totals.stock,
        stock_sold: totals.sold,
        embedding,
    }
}
