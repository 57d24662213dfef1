// Cached catalog metadata: category names for result enrichment plus the
// type/theme summary the advice generator references. Loaded once at startup
// and shared immutably across requests.


use std::collections::HashMap;
use tracing::info;

use crate::Result;
use crate::database::store::CatalogStore;

/// Cap on theme names handed to the advice generator, to keep prompts short.
const MAX_THEMES: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    categories: HashMap<i64, String>,
    types: Vec<String>,
    themes: Vec<String>,
}

/// Catalog-wide summary used to parameterize advisory messages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSummary {
    pub types: Vec<String>,
    pub themes: Vec<String>,
}

impl Taxonomy {
    #[inline]
    pub fn new(
        categories: HashMap<i64, String>,
        types: Vec<String>,
        mut themes: Vec<String>,
    ) -> Self {
        themes.truncate(MAX_THEMES);
        Self {
            categories,
            types,
            themes,
        }
    }

    /// Load the taxonomy from the store. Called once at startup.
    #[inline]
    pub async fn load(store: &CatalogStore) -> Result<Self> {
        let categories: HashMap<i64, String> = store
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c.title))
            .collect();
        let types = store.list_product_types().await?;
        let themes = store.list_visible_tag_titles().await?;

        info!(
            categories = categories.len(),
            types = types.len(),
            themes = themes.len(),
            "Loaded catalog taxonomy"
        );

        Ok(Self::new(categories, types, themes))
    }

    #[inline]
    pub fn category_name(&self, id: i64) -> Option<&str> {
        self.categories.get(&id).map(String::as_str)
    }

    /// Resolve category ids to display names, dropping ids the taxonomy does
    /// not know about (stale join rows).
    #[inline]
    pub fn resolve_categories(&self, ids: &[i64]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.category_name(*id).map(str::to_string))
            .collect()
    }

    #[inline]
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            types: self
                .types
                .iter()
                .filter(|t| t.as_str() != "unknown")
                .cloned()
                .collect(),
            themes: self.themes.clone(),
        }
    }
}
