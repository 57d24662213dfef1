use super::*;
use crate::catalog::normalizer::ProductType;
use crate::catalog::{RawBrand, RawVariant};

fn snapshot_with_variants() -> CatalogSnapshot {
    CatalogSnapshot {
        products: vec![RawProduct {
            id: 1,
            title: "Kat beeld".to_string(),
            fulltitle: String::new(),
            description: "<p>Bronzen kat, hoogte 24 cm</p>".to_string(),
            content: String::new(),
            url: "https://shop.example/kat-beeld.html".to_string(),
            image: Some("kat.jpg".to_string()),
            visible: true,
            brand_id: Some(7),
        }],
        variants: vec![RawVariant {
            product_id: 1,
            price: 45.0,
            old_price: Some(60.0),
            stock: 3,
            sold: 12,
        }],
        brands: vec![RawBrand {
            id: 7,
            title: "Atelier Mia".to_string(),
        }],
        ..CatalogSnapshot::default()
    }
}

#[test]
fn product_row_carries_derived_attributes() {
    let snapshot = snapshot_with_variants();
    let lookups = CatalogLookups::build(&snapshot);
    let product = &snapshot.products[0];
    let normalized = normalizer::normalize(product, &lookups);

    let row = build_product_row(
        product,
        &normalized,
        lookups.variant_totals(product.id),
        vec![0.1, 0.2],
    );

    assert_eq!(row.id, 1);
    assert_eq!(row.description, "Bronzen kat, hoogte 24 cm");
    assert_eq!(row.price, 45.0);
    assert_eq!(row.old_price, Some(60.0));
    assert_eq!(row.stock, 3);
    assert_eq!(row.stock_sold, 12);
    assert_eq!(row.artist.as_deref(), Some("Atelier Mia"));
    assert_eq!(row.dimensions.as_deref(), Some("24 cm"));
    assert_eq!(row.product_type, ProductType::Statue.as_str());
    assert_eq!(row.embedding, [0.1, 0.2]);
}

#[test]
fn product_row_defaults_without_variants() {
    let mut snapshot = snapshot_with_variants();
    snapshot.variants.clear();
    let lookups = CatalogLookups::build(&snapshot);
    let product = &snapshot.products[0];
    let normalized = normalizer::normalize(product, &lookups);

    let row = build_product_row(
        product,
        &normalized,
        lookups.variant_totals(product.id),
        Vec::new(),
    );

    assert_eq!(row.price, 0.0);
    assert_eq!(row.old_price, None);
    assert_eq!(row.stock, 0);
    assert_eq!(row.stock_sold, 0);
}

#[test]
fn batching_covers_every_visible_product() {
    let mut products = Vec::new();
    for id in 0..10 {
        products.push(RawProduct {
            id,
            title: format!("Product {id}"),
            fulltitle: String::new(),
            description: String::new(),
            content: String::new(),
            url: String::new(),
            image: None,
            visible: id % 2 == 0,
            brand_id: None,
        });
    }
    let snapshot = CatalogSnapshot {
        products,
        ..CatalogSnapshot::default()
    };

    let visible = snapshot.visible_products();
    assert_eq!(visible.len(), 5);

    let batches: Vec<_> = visible.chunks(2).collect();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), 5);
}
