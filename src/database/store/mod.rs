// Vector store over Postgres with the pgvector extension. All writes are
// idempotent upserts keyed by the upstream product identifier; join rows use
// insert-if-absent semantics. Queries are bound at runtime because vector
// parameters defeat the compile-time macros.


use sqlx::PgPool;
use tracing::{debug, info};

use super::models::{
    CategoryRecord, NewProduct, Product, ScoredProduct, StoreCounts, TagRecord,
};
use crate::{Result, SearchError};

pub struct CatalogStore {
    pool: PgPool,
    dimension: usize,
}

impl CatalogStore {
    #[inline]
    pub fn new(pool: PgPool, dimension: usize) -> Self {
        Self { pool, dimension }
    }

    #[inline]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the pgvector extension, tables, and vector index. Idempotent;
    /// called once at startup.
    #[inline]
    pub async fn initialize(&self) -> Result<()> {
        debug!("Initializing catalog store schema");

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|e| SearchError::Store(format!("Failed to enable pgvector: {e}")))?;

        let create_products = format!(
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id BIGINT PRIMARY KEY,
                title TEXT NOT NULL,
                fulltitle TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                url TEXT NOT NULL DEFAULT '',
                image TEXT,
                visible BOOLEAN NOT NULL DEFAULT TRUE,
                price DOUBLE PRECISION NOT NULL DEFAULT 0,
                old_price DOUBLE PRECISION,
                artist TEXT,
                dimensions TEXT,
                product_type TEXT NOT NULL DEFAULT 'unknown',
                stock BIGINT NOT NULL DEFAULT 0,
                stock_sold BIGINT NOT NULL DEFAULT 0,
                embedding vector({}),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
            self.dimension
        );
        sqlx::query(&create_products)
            .execute(&self.pool)
            .await
            .map_err(|e| SearchError::Store(format!("Failed to create products table: {e}")))?;

        for ddl in [
            "CREATE TABLE IF NOT EXISTS categories (
                id BIGINT PRIMARY KEY,
                title TEXT NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS tags (
                id BIGINT PRIMARY KEY,
                title TEXT NOT NULL,
                visible BOOLEAN NOT NULL DEFAULT TRUE
            )",
            "CREATE TABLE IF NOT EXISTS product_categories (
                product_id BIGINT NOT NULL,
                category_id BIGINT NOT NULL REFERENCES categories (id),
                PRIMARY KEY (product_id, category_id)
            )",
            "CREATE TABLE IF NOT EXISTS product_tags (
                product_id BIGINT NOT NULL,
                tag_id BIGINT NOT NULL REFERENCES tags (id),
                PRIMARY KEY (product_id, tag_id)
            )",
            "CREATE INDEX IF NOT EXISTS products_embedding_idx ON products
                USING hnsw (embedding vector_cosine_ops)
                WITH (m = 16, ef_construction = 64)",
        ] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| SearchError::Store(format!("Failed to create schema: {e}")))?;
        }

        info!("Catalog store schema ready");
        Ok(())
    }

    /// Upsert one product row. Every scalar field and the embedding are
    /// overwritten and the update timestamp is refreshed.
    #[inline]
    pub async fn upsert_product(&self, product: &NewProduct) -> Result<()> {
        if product.embedding.len() != self.dimension {
            return Err(SearchError::Store(format!(
                "Embedding dimension mismatch for product {}: expected {}, got {}",
                product.id,
                self.dimension,
                product.embedding.len()
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO products (
                id, title, fulltitle, description, content, url, image, visible,
                price, old_price, artist, dimensions, product_type, stock,
                stock_sold, embedding, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16::vector, now())
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                fulltitle = EXCLUDED.fulltitle,
                description = EXCLUDED.description,
                content = EXCLUDED.content,
                url = EXCLUDED.url,
                image = EXCLUDED.image,
                visible = EXCLUDED.visible,
                price = EXCLUDED.price,
                old_price = EXCLUDED.old_price,
                artist = EXCLUDED.artist,
                dimensions = EXCLUDED.dimensions,
                product_type = EXCLUDED.product_type,
                stock = EXCLUDED.stock,
                stock_sold = EXCLUDED.stock_sold,
                embedding = EXCLUDED.embedding,
                updated_at = now()
            "#,
        )
        .bind(product.id)
        .bind(&product.title)
        .bind(&product.fulltitle)
        .bind(&product.description)
        .bind(&product.content)
        .bind(&product.url)
        .bind(&product.image)
        .bind(product.visible)
        .bind(product.price)
        .bind(product.old_price)
        .bind(&product.artist)
        .bind(&product.dimensions)
        .bind(&product.product_type)
        .bind(product.stock)
        .bind(product.stock_sold)
        .bind(vector_literal(&product.embedding))
        .execute(&self.pool)
        .await
        .map_err(|e| SearchError::Store(format!("Failed to upsert product {}: {e}", product.id)))?;

        debug!("Upserted product {}", product.id);
        Ok(())
    }

    #[inline]
    pub async fn upsert_category(&self, category: &CategoryRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO categories (id, title) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title",
        )
        .bind(category.id)
        .bind(&category.title)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            SearchError::Store(format!("Failed to upsert category {}: {e}", category.id))
        })?;
        Ok(())
    }

    #[inline]
    pub async fn upsert_tag(&self, tag: &TagRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO tags (id, title, visible) VALUES ($1, $2, $3)
             ON CONFLICT (id) DO UPDATE SET title = EXCLUDED.title, visible = EXCLUDED.visible",
        )
        .bind(tag.id)
        .bind(&tag.title)
        .bind(tag.visible)
        .execute(&self.pool)
        .await
        .map_err(|e| SearchError::Store(format!("Failed to upsert tag {}: {e}", tag.id)))?;
        Ok(())
    }

    /// Insert-if-absent join rows. Ingestion never removes join rows, so
    /// links from removed categories linger until a reconciliation pass.
    #[inline]
    pub async fn link_categories(&self, product_id: i64, category_ids: &[i64]) -> Result<()> {
        for category_id in category_ids {
            sqlx::query(
                "INSERT INTO product_categories (product_id, category_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(product_id)
            .bind(category_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                SearchError::Store(format!(
                    "Failed to link product {product_id} to category {category_id}: {e}"
                ))
            })?;
        }
        Ok(())
    }

    #[inline]
    pub async fn link_tags(&self, product_id: i64, tag_ids: &[i64]) -> Result<()> {
        for tag_id in tag_ids {
            sqlx::query(
                "INSERT INTO product_tags (product_id, tag_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(product_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                SearchError::Store(format!(
                    "Failed to link product {product_id} to tag {tag_id}: {e}"
                ))
            })?;
        }
        Ok(())
    }

    /// Similarity query: every visible, embedded product at or above the
    /// similarity floor, ordered by similarity with units sold as the
    /// tie-break, capped at `limit`.
    #[inline]
    pub async fn similarity_search(
        &self,
        query_vector: &[f32],
        floor: f64,
        limit: i64,
    ) -> Result<Vec<ScoredProduct>> {
        if query_vector.len() != self.dimension {
            return Err(SearchError::Store(format!(
                "Query vector dimension mismatch: expected {}, got {}",
                self.dimension,
                query_vector.len()
            )));
        }

        let rows = sqlx::query_as::<_, ScoredProduct>(
            r#"
            SELECT p.id,
                   p.title,
                   p.fulltitle,
                   p.description,
                   p.url,
                   p.image,
                   p.price,
                   p.old_price,
                   p.artist,
                   p.dimensions,
                   p.product_type,
                   p.stock,
                   p.stock_sold,
                   1 - (p.embedding <=> $1::vector) AS similarity,
                   COALESCE(
                       array_agg(pc.category_id) FILTER (WHERE pc.category_id IS NOT NULL),
                       ARRAY[]::BIGINT[]
                   ) AS category_ids
            FROM products p
            LEFT JOIN product_categories pc ON pc.product_id = p.id
            WHERE p.visible
              AND p.embedding IS NOT NULL
              AND 1 - (p.embedding <=> $1::vector) >= $2
            GROUP BY p.id
            ORDER BY similarity DESC, p.stock_sold DESC
            LIMIT $3
            "#,
        )
        .bind(vector_literal(query_vector))
        .bind(floor)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SearchError::Store(format!("Similarity query failed: {e}")))?;

        debug!("Similarity query returned {} rows", rows.len());
        Ok(rows)
    }

    #[inline]
    pub async fn get_product(&self, id: i64) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, title, fulltitle, description, content, url, image,
                   visible, price, old_price, artist, dimensions, product_type,
                   stock, stock_sold, (embedding IS NOT NULL) AS has_embedding,
                   updated_at
            FROM products WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SearchError::Store(format!("Failed to get product {id}: {e}")))?;

        Ok(row)
    }

    #[inline]
    pub async fn list_categories(&self) -> Result<Vec<CategoryRecord>> {
        sqlx::query_as::<_, CategoryRecord>("SELECT id, title FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SearchError::Store(format!("Failed to list categories: {e}")))
    }

    #[inline]
    pub async fn list_visible_tag_titles(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT title FROM tags WHERE visible ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SearchError::Store(format!("Failed to list tags: {e}")))
    }

    /// Distinct product types present among searchable products.
    #[inline]
    pub async fn list_product_types(&self) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT product_type FROM products
             WHERE visible AND embedding IS NOT NULL
             ORDER BY product_type",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SearchError::Store(format!("Failed to list product types: {e}")))
    }

    #[inline]
    pub async fn counts(&self) -> Result<StoreCounts> {
        let products = self.count_scalar("SELECT COUNT(*) FROM products").await?;
        let searchable = self
            .count_scalar(
                "SELECT COUNT(*) FROM products WHERE visible AND embedding IS NOT NULL",
            )
            .await?;
        let categories = self.count_scalar("SELECT COUNT(*) FROM categories").await?;
        let tags = self.count_scalar("SELECT COUNT(*) FROM tags").await?;

        Ok(StoreCounts {
            products,
            searchable,
            categories,
            tags,
        })
    }

    async fn count_scalar(&self, sql: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SearchError::Store(format!("Count query failed: {e}")))
    }
}

/// Encode a vector as the `[v1,v2,..]` literal pgvector parses from text.
fn vector_literal(vector: &[f32]) -> String {
    let values: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(","))
}
