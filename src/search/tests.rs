use super::*;
use crate::SearchError;
use crate::database::models::ScoredProduct;

fn scored_product() -> ScoredProduct {
    ScoredProduct {
        id: 1,
        title: "Kat beeld".to_string(),
        fulltitle: "Kat beeld naar Picasso".to_string(),
        description: "Bronzen kat".to_string(),
        url: "https://shop.example/kat-beeld.html".to_string(),
        image: Some("kat.jpg".to_string()),
        price: 45.0,
        old_price: None,
        artist: Some("Atelier Mia".to_string()),
        dimensions: Some("24 cm".to_string()),
        product_type: "statue".to_string(),
        stock: 3,
        stock_sold: 12,
        similarity: 0.82,
        category_ids: vec![10],
    }
}

fn taxonomy() -> Taxonomy {
    Taxonomy::new(
        [(10, "Beelden".to_string())].into_iter().collect(),
        vec!["statue".to_string()],
        vec!["katten".to_string()],
    )
}

#[test]
fn empty_query_is_rejected() {
    assert!(matches!(
        validate_query(""),
        Err(SearchError::InvalidQuery(_))
    ));
    assert!(matches!(
        validate_query("   "),
        Err(SearchError::InvalidQuery(_))
    ));
    assert_eq!(validate_query(" kat beeld ").expect("valid"), "kat beeld");
}

#[test]
fn discount_from_prior_price() {
    assert_eq!(compute_discount(65.0, Some(100.0)), (true, 35));
}

#[test]
fn no_prior_price_means_no_sale() {
    assert_eq!(compute_discount(65.0, None), (false, 0));
}

#[test]
fn prior_price_not_above_current_means_no_sale() {
    assert_eq!(compute_discount(65.0, Some(65.0)), (false, 0));
    assert_eq!(compute_discount(65.0, Some(50.0)), (false, 0));
}

#[test]
fn discount_rounds_to_nearest_percent() {
    assert_eq!(compute_discount(66.5, Some(100.0)), (true, 34));
    assert_eq!(compute_discount(66.6, Some(100.0)), (true, 33));
}

#[test]
fn popularity_threshold_boundary() {
    let config = SearchConfig::default();

    let mut row = scored_product();
    row.stock_sold = 50;
    assert!(enrich(row, &taxonomy(), &config).is_popular);

    let mut row = scored_product();
    row.stock_sold = 49;
    assert!(!enrich(row, &taxonomy(), &config).is_popular);
}

#[test]
fn scarcity_threshold_boundary() {
    let config = SearchConfig::default();

    let mut row = scored_product();
    row.stock = 5;
    assert!(enrich(row, &taxonomy(), &config).is_scarce);

    let mut row = scored_product();
    row.stock = 6;
    assert!(!enrich(row, &taxonomy(), &config).is_scarce);

    // zero stock is unavailable, not scarce
    let mut row = scored_product();
    row.stock = 0;
    assert!(!enrich(row, &taxonomy(), &config).is_scarce);
}

#[test]
fn enrich_resolves_category_names() {
    let config = SearchConfig::default();
    let item = enrich(scored_product(), &taxonomy(), &config);

    assert_eq!(item.categories, ["Beelden"]);
    assert_eq!(item.product_type, "statue");
    assert_eq!(item.similarity, 0.82);
}

#[test]
fn response_shows_everything_it_totals() {
    let config = SearchConfig::default();
    let items = vec![enrich(scored_product(), &taxonomy(), &config)];
    let response = build_response("kat beeld", 42, items, "advies".to_string());

    assert!(response.success);
    assert_eq!(response.query.original, "kat beeld");
    assert_eq!(response.query.took_ms, 42);
    assert_eq!(response.results.total, 1);
    assert_eq!(response.results.showing, response.results.total);
    assert_eq!(response.results.advice, "advies");
}

#[test]
fn item_serializes_with_contract_field_names() {
    let config = SearchConfig::default();
    let mut row = scored_product();
    row.old_price = Some(60.0);
    let item = enrich(row, &taxonomy(), &config);

    let json = serde_json::to_value(&item).expect("Failed to serialize item");
    let object = json.as_object().expect("item is an object");

    for field in [
        "id",
        "title",
        "fullTitle",
        "description",
        "url",
        "price",
        "oldPrice",
        "onSale",
        "discount",
        "image",
        "type",
        "artist",
        "dimensions",
        "stock",
        "stockSold",
        "isPopular",
        "isScarce",
        "categories",
        "similarity",
    ] {
        assert!(object.contains_key(field), "missing field {field}");
    }
    assert_eq!(json["onSale"], true);
    assert_eq!(json["discount"], 25);
}
