#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Integration tests that require a local Postgres with the pgvector
// extension. They are skipped unless CATALOG_SEARCH_TEST_DATABASE_URL is
// set, e.g.:
//   CATALOG_SEARCH_TEST_DATABASE_URL=postgres://localhost/catalog_test \
//     cargo test --test integration_search

use std::env;
use std::sync::Arc;

use serial_test::serial;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use catalog_search::advice::{AdviceGenerator, FallbackAdvice, GenerationClient};
use catalog_search::catalog::taxonomy::Taxonomy;
use catalog_search::config::{DatabaseConfig, EmbeddingConfig, GenerationConfig, SearchConfig};
use catalog_search::database::Database;
use catalog_search::database::models::{CategoryRecord, NewProduct, TagRecord};
use catalog_search::database::store::CatalogStore;
use catalog_search::embeddings::EmbeddingClient;
use catalog_search::search::QueryEngine;

const DIMENSION: usize = 4;

async fn connect_store() -> Option<CatalogStore> {
    let url = env::var("CATALOG_SEARCH_TEST_DATABASE_URL").ok()?;
    let config = DatabaseConfig {
        url,
        max_connections: 5,
    };
    let database = Database::connect(&config)
        .await
        .expect("Failed to connect to test database");
    let store = CatalogStore::new(database.pool().clone(), DIMENSION);
    reset_schema(&store).await;
    store
        .initialize()
        .await
        .expect("Failed to initialize schema");
    Some(store)
}

async fn reset_schema(store: &CatalogStore) {
    for table in [
        "product_categories",
        "product_tags",
        "products",
        "categories",
        "tags",
    ] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(store.pool())
            .await
            .expect("Failed to drop table");
    }
}

fn product(id: i64, title: &str, embedding: Vec<f32>) -> NewProduct {
    NewProduct {
        id,
        title: title.to_string(),
        fulltitle: String::new(),
        description: String::new(),
        content: String::new(),
        url: format!("https://shop.example/{id}.html"),
        image: None,
        visible: true,
        price: 45.0,
        old_price: None,
        artist: None,
        dimensions: None,
        product_type: "statue".to_string(),
        stock: 3,
        stock_sold: 0,
        embedding,
    }
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn upsert_is_idempotent() {
    let Some(store) = connect_store().await else {
        eprintln!("CATALOG_SEARCH_TEST_DATABASE_URL not set, skipping");
        return;
    };

    store
        .upsert_category(&CategoryRecord {
            id: 10,
            title: "Beelden".to_string(),
        })
        .await
        .expect("Failed to upsert category");

    let row = product(1, "Kat beeld", vec![1.0, 0.0, 0.0, 0.0]);
    store.upsert_product(&row).await.expect("First upsert failed");
    store
        .link_categories(1, &[10])
        .await
        .expect("First link failed");

    let first = store
        .get_product(1)
        .await
        .expect("Failed to get product")
        .expect("Product missing after upsert");

    // Same data again: scalar fields must be identical and join rows must
    // not duplicate.
    store.upsert_product(&row).await.expect("Second upsert failed");
    store
        .link_categories(1, &[10])
        .await
        .expect("Second link failed");

    let second = store
        .get_product(1)
        .await
        .expect("Failed to get product")
        .expect("Product missing after second upsert");

    assert_eq!(first.title, second.title);
    assert_eq!(first.price, second.price);
    assert_eq!(first.product_type, second.product_type);
    assert_eq!(first.stock, second.stock);
    assert!(second.is_searchable());

    let join_rows: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM product_categories WHERE product_id = 1")
            .fetch_one(store.pool())
            .await
            .expect("Failed to count join rows");
    assert_eq!(join_rows, 1);
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn similarity_query_honors_floor_order_and_tiebreak() {
    let Some(store) = connect_store().await else {
        eprintln!("CATALOG_SEARCH_TEST_DATABASE_URL not set, skipping");
        return;
    };

    let mut exact_slow_seller = product(1, "Kat beeld", vec![1.0, 0.0, 0.0, 0.0]);
    exact_slow_seller.stock_sold = 5;
    let mut exact_best_seller = product(2, "Kat beeldje", vec![1.0, 0.0, 0.0, 0.0]);
    exact_best_seller.stock_sold = 80;
    let partial = product(3, "Hond beeld", vec![1.0, 1.0, 0.0, 0.0]);
    let unrelated = product(4, "Paraplu", vec![0.0, 1.0, 0.0, 0.0]);
    let mut hidden = product(5, "Verborgen kat beeld", vec![1.0, 0.0, 0.0, 0.0]);
    hidden.visible = false;

    for row in [
        &exact_slow_seller,
        &exact_best_seller,
        &partial,
        &unrelated,
        &hidden,
    ] {
        store.upsert_product(row).await.expect("Failed to upsert");
    }

    let results = store
        .similarity_search(&[1.0, 0.0, 0.0, 0.0], 0.3, 50)
        .await
        .expect("Similarity query failed");

    let ids: Vec<i64> = results.iter().map(|r| r.id).collect();
    // Unrelated (similarity 0) and hidden products must not appear.
    assert!(!ids.contains(&4));
    assert!(!ids.contains(&5));

    // Every row is at or above the floor and ordering is non-increasing.
    for row in &results {
        assert!(row.similarity >= 0.3);
    }
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
        if (pair[0].similarity - pair[1].similarity).abs() < 1e-6 {
            assert!(pair[0].stock_sold >= pair[1].stock_sold);
        }
    }

    // The two exact matches tie on similarity; the better seller wins.
    assert_eq!(ids[0], 2);
    assert_eq!(ids[1], 1);
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn end_to_end_search_with_failing_generation_service() {
    let Some(store) = connect_store().await else {
        eprintln!("CATALOG_SEARCH_TEST_DATABASE_URL not set, skipping");
        return;
    };

    // A visible, embedded statue whose embedding text mentioned the query
    // terms; the mocked embedding service maps the query onto the same
    // direction in vector space.
    let mut statue = product(1, "Kat beeld", vec![1.0, 0.0, 0.0, 0.0]);
    statue.price = 45.0;
    store.upsert_product(&statue).await.expect("Failed to upsert");
    store
        .upsert_tag(&TagRecord {
            id: 20,
            title: "katten".to_string(),
            visible: true,
        })
        .await
        .expect("Failed to upsert tag");

    let mock_services = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [1.0, 0.0, 0.0, 0.0]}]
        })))
        .mount(&mock_services)
        .await;
    // The generation service is down; the deterministic fallback must fire.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_services)
        .await;

    let embedding_config = EmbeddingConfig {
        base_url: format!("{}/v1", mock_services.uri()),
        api_key: String::new(),
        model: "test-model".to_string(),
        dimension: DIMENSION as u32,
        batch_size: 16,
        timeout_seconds: 5,
    };
    let generation_config = GenerationConfig {
        enabled: true,
        base_url: format!("{}/v1", mock_services.uri()),
        api_key: String::new(),
        model: "test-model".to_string(),
        timeout_seconds: 5,
    };

    let embedder = EmbeddingClient::new(&embedding_config).expect("Failed to create embedder");
    let advisor = AdviceGenerator::with_primary(Box::new(
        GenerationClient::new(&generation_config).expect("Failed to create generation client"),
    ));
    let taxonomy = Arc::new(Taxonomy::load(&store).await.expect("Failed to load taxonomy"));

    let engine = QueryEngine::new(
        store,
        embedder,
        advisor,
        taxonomy,
        SearchConfig::default(),
    );

    let response = engine
        .search("kat beeld onder 50 euro")
        .await
        .expect("Search failed");

    assert!(response.success);
    assert_eq!(response.results.total, 1);
    assert_eq!(response.results.showing, 1);
    let item = &response.results.items[0];
    assert_eq!(item.id, 1);
    assert_eq!(item.price, 45.0);
    assert!(item.similarity > 0.9);
    assert_eq!(response.results.advice, FallbackAdvice::results_text(1));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn empty_store_yields_guided_advice() {
    let Some(store) = connect_store().await else {
        eprintln!("CATALOG_SEARCH_TEST_DATABASE_URL not set, skipping");
        return;
    };

    let mock_services = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [1.0, 0.0, 0.0, 0.0]}]
        })))
        .mount(&mock_services)
        .await;

    let embedding_config = EmbeddingConfig {
        base_url: format!("{}/v1", mock_services.uri()),
        api_key: String::new(),
        model: "test-model".to_string(),
        dimension: DIMENSION as u32,
        batch_size: 16,
        timeout_seconds: 5,
    };
    let embedder = EmbeddingClient::new(&embedding_config).expect("Failed to create embedder");
    let taxonomy = Arc::new(Taxonomy::load(&store).await.expect("Failed to load taxonomy"));

    let engine = QueryEngine::new(
        store,
        embedder,
        AdviceGenerator::disabled(),
        taxonomy,
        SearchConfig::default(),
    );

    let response = engine
        .search("iets dat niet bestaat")
        .await
        .expect("Search failed");

    assert_eq!(response.results.total, 0);
    assert_eq!(response.results.showing, 0);
    assert!(response.results.items.is_empty());
    assert_eq!(response.results.advice, FallbackAdvice::empty_text());
}
