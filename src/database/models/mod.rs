
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Product row as written by the ingestion pipeline. Text fields are already
/// HTML-stripped; the embedding is freshly computed every sync.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub id: i64,
    pub title: String,
    pub fulltitle: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image: Option<String>,
    pub visible: bool,
    pub price: f64,
    pub old_price: Option<f64>,
    pub artist: Option<String>,
    pub dimensions: Option<String>,
    pub product_type: String,
    pub stock: i64,
    pub stock_sold: i64,
    pub embedding: Vec<f32>,
}

/// Stored product row, without the embedding payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub fulltitle: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image: Option<String>,
    pub visible: bool,
    pub price: f64,
    pub old_price: Option<f64>,
    pub artist: Option<String>,
    pub dimensions: Option<String>,
    pub product_type: String,
    pub stock: i64,
    pub stock_sold: i64,
    pub has_embedding: bool,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// A product participates in search only when it is visible and its
    /// embedding has been computed.
    #[inline]
    pub fn is_searchable(&self) -> bool {
        self.visible && self.has_embedding
    }
}

/// Row returned by the similarity query: product scalars plus the computed
/// similarity score and aggregated category ids.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ScoredProduct {
    pub id: i64,
    pub title: String,
    pub fulltitle: String,
    pub description: String,
    pub url: String,
    pub image: Option<String>,
    pub price: f64,
    pub old_price: Option<f64>,
    pub artist: Option<String>,
    pub dimensions: Option<String>,
    pub product_type: String,
    pub stock: i64,
    pub stock_sold: i64,
    pub similarity: f64,
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CategoryRecord {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TagRecord {
    pub id: i64,
    pub title: String,
    pub visible: bool,
}

/// Row counts shown by the status command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCounts {
    pub products: i64,
    pub searchable: i64,
    pub categories: i64,
    pub tags: i64,
}
