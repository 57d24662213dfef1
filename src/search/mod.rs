// Query engine
// Free-text query -> query embedding -> similarity search -> enriched,
// ranked items plus an advisory message. Requests are stateless and safely
// concurrent; the only shared state is the store pool and the taxonomy cache.

#[cfg(test)]
mod tests;

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::advice::{AdviceContext, AdviceGenerator};
use crate::catalog::taxonomy::Taxonomy;
use crate::config::SearchConfig;
use crate::database::models::ScoredProduct;
use crate::database::store::CatalogStore;
use crate::embeddings::EmbeddingClient;
use crate::{Result, SearchError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub query: QueryEcho,
    pub results: ResultSet,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryEcho {
    pub original: String,
    pub took_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub total: usize,
    pub showing: usize,
    pub items: Vec<SearchItem>,
    pub advice: String,
}

/// One enriched result item. Field names follow the public search contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: i64,
    pub title: String,
    pub full_title: String,
    pub description: String,
    pub url: String,
    pub price: f64,
    pub old_price: Option<f64>,
    pub on_sale: bool,
    pub discount: u32,
    pub image: Option<String>,
    #[serde(rename = "type")]
    pub product_type: String,
    pub artist: Option<String>,
    pub dimensions: Option<String>,
    pub stock: i64,
    pub stock_sold: i64,
    pub is_popular: bool,
    pub is_scarce: bool,
    pub categories: Vec<String>,
    pub similarity: f64,
}

pub struct QueryEngine {
    store: CatalogStore,
    embedder: EmbeddingClient,
    advisor: AdviceGenerator,
    taxonomy: Arc<Taxonomy>,
    config: SearchConfig,
}

impl QueryEngine {
    #[inline]
    pub fn new(
        store: CatalogStore,
        embedder: EmbeddingClient,
        advisor: AdviceGenerator,
        taxonomy: Arc<Taxonomy>,
        config: SearchConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            advisor,
            taxonomy,
            config,
        }
    }

    /// Run one search request end to end. A failure at any step surfaces as
    /// a single error; no partial results are returned.
    #[inline]
    pub async fn search(&self, query: &str) -> Result<SearchResponse> {
        let query = validate_query(query)?;
        let started = Instant::now();

        let query_vector = self.embedder.embed(query)?;
        debug!("Query embedded, running similarity search");

        let rows = self
            .store
            .similarity_search(
                &query_vector,
                self.config.similarity_floor,
                self.config.result_limit,
            )
            .await?;

        let items: Vec<SearchItem> = rows
            .into_iter()
            .map(|row| enrich(row, &self.taxonomy, &self.config))
            .collect();

        let summary = self.taxonomy.summary();
        let advice = self.advisor.generate(&AdviceContext {
            query,
            result_count: items.len(),
            catalog: &summary,
        });

        let took_ms = started.elapsed().as_millis() as u64;
        info!(
            results = items.len(),
            took_ms, "Search completed for query \"{query}\""
        );

        Ok(build_response(query, took_ms, items, advice))
    }
}

/// Reject empty or blank queries before any external call is made.
#[inline]
pub fn validate_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::InvalidQuery(
            "Query must be a non-empty string".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Compute the enriched projection of one scored row.
#[inline]
pub fn enrich(row: ScoredProduct, taxonomy: &Taxonomy, config: &SearchConfig) -> SearchItem {
    let (on_sale, discount) = compute_discount(row.price, row.old_price);
    let categories = taxonomy.resolve_categories(&row.category_ids);

    SearchItem {
        id: row.id,
        title: row.title,
        full_title: row.fulltitle,
        description: row.description,
        url: row.url,
        price: row.price,
        old_price: row.old_price,
        on_sale,
        discount,
        image: row.image,
        product_type: row.product_type,
        artist: row.artist,
        dimensions: row.dimensions,
        stock: row.stock,
        stock_sold: row.stock_sold,
        is_popular: row.stock_sold >= config.popularity_threshold,
        is_scarce: row.stock > 0 && row.stock <= config.scarcity_threshold,
        categories,
        similarity: row.similarity,
    }
}

/// Sale flag and discount percentage, rounded to the nearest whole percent.
/// Only a prior price strictly above the current price counts as a sale.
#[inline]
pub fn compute_discount(price: f64, old_price: Option<f64>) -> (bool, u32) {
    match old_price {
        Some(old) if old > price && old > 0.0 => {
            let discount = ((old - price) / old * 100.0).round() as u32;
            (true, discount)
        }
        _ => (false, 0),
    }
}

/// Assemble the response payload. `showing` always equals `total`; there is
/// no pagination split.
#[inline]
pub fn build_response(
    query: &str,
    took_ms: u64,
    items: Vec<SearchItem>,
    advice: String,
) -> SearchResponse {
    let total = items.len();
    SearchResponse {
        success: true,
        query: QueryEcho {
            original: query.to_string(),
            took_ms,
        },
        results: ResultSet {
            total,
            showing: total,
            items,
            advice,
        },
    }
}
