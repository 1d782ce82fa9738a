//! Dictionaries aggregate tests: global and per-category facets

use serial_test::serial;
use volha_catalog::Dictionaries;

use crate::common::{CatalogFixture, TestApp};

/// Extrema computed straight from the products table
async fn direct_stats(app: &TestApp, category_id: &str) -> [i32; 8] {
    let row: (i32, i32, i32, i32, i32, i32, i32, i32) = sqlx::query_as(
        r#"
        SELECT MIN(price), MAX(price), MIN(width), MAX(width),
               MIN(height), MAX(height), MIN(depth), MAX(depth)
        FROM products WHERE category_id = $1
        "#,
    )
    .bind(category_id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    [row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7]
}

fn stats(d: &Dictionaries) -> [i32; 8] {
    [
        d.min_price,
        d.max_price,
        d.min_width,
        d.max_width,
        d.min_height,
        d.max_height,
        d.min_depth,
        d.max_depth,
    ]
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_category_scope_restricts_facets() {
    let app = TestApp::new().await.unwrap();
    let mut sofas = CatalogFixture::seed(&app).await.unwrap();
    let mut tables = CatalogFixture::seed(&app).await.unwrap();

    let mut small = sofas.draft("Loveseat", 90_000);
    small.width = 140;
    small.material_ids = vec![sofas.materials[0].id.clone()];
    small.color_ids = vec![sofas.colors[0].id.clone()];
    let mut large = sofas.draft("Chesterfield", 310_000);
    large.width = 260;
    large.depth = 110;
    large.material_ids = vec![sofas.materials[0].id.clone()];
    sofas.create_product(&app, small).await.unwrap();
    sofas.create_product(&app, large).await.unwrap();

    let mut table = tables.draft("Dining table", 75_000);
    table.material_ids = tables.material_ids();
    tables.create_product(&app, table).await.unwrap();

    let scoped = app
        .service
        .dictionaries(Some(&sofas.category.id), None)
        .await
        .unwrap();

    assert_eq!(scoped.brands, vec![sofas.brand.clone()]);
    assert_eq!(scoped.countries, vec![sofas.country.clone()]);
    assert_eq!(scoped.materials, vec![sofas.materials[0].clone()]);
    assert_eq!(scoped.colors, vec![sofas.colors[0].clone()]);

    // Categories are never narrowed
    assert!(scoped.categories.contains(&sofas.category));
    assert!(scoped.categories.contains(&tables.category));

    assert_eq!(stats(&scoped), direct_stats(&app, &sofas.category.id).await);
    assert_eq!(scoped.min_price, 90_000);
    assert_eq!(scoped.max_price, 310_000);
    assert_eq!(scoped.min_width, 140);
    assert_eq!(scoped.max_width, 260);

    sofas.cleanup(&app).await.unwrap();
    tables.cleanup(&app).await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_empty_category_has_zero_stats() {
    let app = TestApp::new().await.unwrap();
    let fixture = CatalogFixture::seed(&app).await.unwrap();

    let scoped = app
        .service
        .dictionaries(Some(&fixture.category.id), None)
        .await
        .unwrap();

    assert!(scoped.brands.is_empty());
    assert!(scoped.countries.is_empty());
    assert!(scoped.materials.is_empty());
    assert!(scoped.colors.is_empty());
    assert!(scoped.categories.contains(&fixture.category));
    assert_eq!(stats(&scoped), [0; 8]);

    fixture.cleanup(&app).await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL at TEST_DATABASE_URL"]
async fn test_global_aggregation_lists_every_dictionary_row() {
    let app = TestApp::new().await.unwrap();
    let mut fixture = CatalogFixture::seed(&app).await.unwrap();

    let draft = fixture.draft("Ottoman", 25_000);
    fixture.create_product(&app, draft).await.unwrap();

    // An empty category id means the whole catalog
    for category in [None, Some("")] {
        let all = app.service.dictionaries(category, None).await.unwrap();

        // Unused dictionary rows are still listed
        assert!(all.brands.contains(&fixture.brand));
        assert!(all.categories.contains(&fixture.category));
        assert!(all.countries.contains(&fixture.country));
        for material in &fixture.materials {
            assert!(all.materials.contains(material));
        }
        for color in &fixture.colors {
            assert!(all.colors.contains(color));
        }

        assert!(all.min_price <= 25_000 && 25_000 <= all.max_price);
        assert!(all.min_width <= all.max_width);
    }

    fixture.cleanup(&app).await.unwrap();
}
