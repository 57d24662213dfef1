// Catalog module
// Raw records as exported by the upstream commerce platform, plus the lookup
// tables the ingestion pipeline needs to resolve references.


pub mod normalizer;
pub mod taxonomy;

use anyhow::Context;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::Result;

/// One product as exported by the upstream catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub fulltitle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub brand_id: Option<i64>,
}

/// Price/stock data for one variant. A product can have several variants;
/// the first exported variant is the default one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVariant {
    pub product_id: i64,
    pub price: f64,
    #[serde(default)]
    pub old_price: Option<f64>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub sold: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCategory {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCategoryLink {
    pub product_id: i64,
    pub category_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTag {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTagLink {
    pub product_id: i64,
    pub tag_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBrand {
    pub id: i64,
    pub title: String,
}

/// Full catalog export consumed by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub products: Vec<RawProduct>,
    #[serde(default)]
    pub variants: Vec<RawVariant>,
    #[serde(default)]
    pub categories: Vec<RawCategory>,
    #[serde(default)]
    pub category_links: Vec<RawCategoryLink>,
    #[serde(default)]
    pub tags: Vec<RawTag>,
    #[serde(default)]
    pub tag_links: Vec<RawTagLink>,
    #[serde(default)]
    pub brands: Vec<RawBrand>,
}

impl CatalogSnapshot {
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read catalog snapshot: {}", path.as_ref().display())
        })?;
        let snapshot = serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse catalog snapshot: {}",
                path.as_ref().display()
            )
        })?;
        Ok(snapshot)
    }

    /// Products eligible for indexing. Invisible products are skipped, never
    /// deleted from the store.
    #[inline]
    pub fn visible_products(&self) -> Vec<&RawProduct> {
        self.products.iter().filter(|p| p.visible).collect()
    }
}

/// Aggregated price/stock figures for one product across its variants. The
/// default variant's prices win; stock and sold counts are summed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VariantTotals {
    pub price: f64,
    pub old_price: Option<f64>,
    pub stock: i64,
    pub sold: i64,
}

/// Reference-resolution tables built once per ingestion run.
#[derive(Debug, Clone, Default)]
pub struct CatalogLookups {
    brands: HashMap<i64, String>,
    category_titles: HashMap<i64, Vec<String>>,
    category_ids: HashMap<i64, Vec<i64>>,
    tag_titles: HashMap<i64, Vec<String>>,
    tag_ids: HashMap<i64, Vec<i64>>,
    variants: HashMap<i64, VariantTotals>,
}

impl CatalogLookups {
    #[inline]
    pub fn build(snapshot: &CatalogSnapshot) -> Self {
        let brands: HashMap<i64, String> = snapshot
            .brands
            .iter()
            .map(|b| (b.id, b.title.clone()))
            .collect();

        let category_names: HashMap<i64, &str> = snapshot
            .categories
            .iter()
            .map(|c| (c.id, c.title.as_str()))
            .collect();
        let tag_names: HashMap<i64, &str> =
            snapshot.tags.iter().map(|t| (t.id, t.title.as_str())).collect();

        let mut category_titles: HashMap<i64, Vec<String>> = HashMap::new();
        let mut category_ids: HashMap<i64, Vec<i64>> = HashMap::new();
        for link in snapshot
            .category_links
            .iter()
            .unique_by(|l| (l.product_id, l.category_id))
        {
            category_ids
                .entry(link.product_id)
                .or_default()
                .push(link.category_id);
            if let Some(name) = category_names.get(&link.category_id) {
                category_titles
                    .entry(link.product_id)
                    .or_default()
                    .push((*name).to_string());
            }
        }

        let mut tag_titles: HashMap<i64, Vec<String>> = HashMap::new();
        let mut tag_ids: HashMap<i64, Vec<i64>> = HashMap::new();
        for link in snapshot
            .tag_links
            .iter()
            .unique_by(|l| (l.product_id, l.tag_id))
        {
            tag_ids.entry(link.product_id).or_default().push(link.tag_id);
            if let Some(name) = tag_names.get(&link.tag_id) {
                tag_titles
                    .entry(link.product_id)
                    .or_default()
                    .push((*name).to_string());
            }
        }

        let mut variants: HashMap<i64, VariantTotals> = HashMap::new();
        for variant in &snapshot.variants {
            let totals = variants.entry(variant.product_id).or_insert(VariantTotals {
                price: variant.price,
                old_price: variant.old_price,
                stock: 0,
                sold: 0,
            });
            totals.stock += variant.stock.max(0);
            totals.sold += variant.sold.max(0);
        }

        Self {
            brands,
            category_titles,
            category_ids,
            tag_titles,
            tag_ids,
            variants,
        }
    }

    #[inline]
    pub fn brand_name(&self, brand_id: Option<i64>) -> Option<&str> {
        brand_id.and_then(|id| self.brands.get(&id).map(String::as_str))
    }

    #[inline]
    pub fn category_titles(&self, product_id: i64) -> &[String] {
        self.category_titles
            .get(&product_id)
            .map_or(&[], Vec::as_slice)
    }

    #[inline]
    pub fn category_ids(&self, product_id: i64) -> &[i64] {
        self.category_ids.get(&product_id).map_or(&[], Vec::as_slice)
    }

    #[inline]
    pub fn tag_titles(&self, product_id: i64) -> &[String] {
        self.tag_titles.get(&product_id).map_or(&[], Vec::as_slice)
    }

    #[inline]
    pub fn tag_ids(&self, product_id: i64) -> &[i64] {
        self.tag_ids.get(&product_id).map_or(&[], Vec::as_slice)
    }

    #[inline]
    pub fn variant_totals(&self, product_id: i64) -> VariantTotals {
        self.variants.get(&product_id).copied().unwrap_or_default()
    }
}
