//! Dictionaries aggregate
//!
//! Loads every facet list and the product extrema in one round trip. Each
//! row of the UNION carries a `kind` discriminator; the `stats` row packs the
//! eight extrema into `field1` as comma-separated integers.

use sqlx::postgres::PgRow;
use sqlx::FromRow;
use tokio::time::Instant;
use tracing::{debug, warn};
use volha_common::{within_deadline, DbScope, OpContext, RepositoryError, Result};

use crate::domain::entities::{Brand, Category, Color, Country, Dictionaries, Material};

const OP_GET: &str = "catalog.dictionaries.get";

const STATS_COLUMNS: &str = r#"
concat_ws(',',
    COALESCE(MIN(p.price), 0), COALESCE(MAX(p.price), 0),
    COALESCE(MIN(p.width), 0), COALESCE(MAX(p.width), 0),
    COALESCE(MIN(p.height), 0), COALESCE(MAX(p.height), 0),
    COALESCE(MIN(p.depth), 0), COALESCE(MAX(p.depth), 0))"#;

fn global_sql() -> String {
    format!(
        r#"
SELECT 'brand'::text AS kind, id, title AS field1, ''::text AS field2, ''::text AS field3 FROM brands
UNION ALL
SELECT 'category', id, title, uri, img FROM categories
UNION ALL
SELECT 'country', id, title, friendly, '' FROM countries
UNION ALL
SELECT 'material', id, title, '', '' FROM materials
UNION ALL
SELECT 'color', id, title, hex, '' FROM colors
UNION ALL
SELECT 'stats', '', {STATS_COLUMNS}, '', '' FROM products p
ORDER BY 1, 3, 2"#
    )
}

/// Facets restricted to what products of category `$1` use; categories stay complete
fn category_sql() -> String {
    format!(
        r#"
SELECT DISTINCT 'brand'::text AS kind, b.id, b.title AS field1, ''::text AS field2, ''::text AS field3
FROM brands b JOIN products p ON p.brand_id = b.id WHERE p.category_id = $1
UNION ALL
SELECT 'category', id, title, uri, img FROM categories
UNION ALL
SELECT DISTINCT 'country', co.id, co.title, co.friendly, ''
FROM countries co JOIN products p ON p.country_id = co.id WHERE p.category_id = $1
UNION ALL
SELECT DISTINCT 'material', m.id, m.title, '', ''
FROM materials m
JOIN product_materials pm ON pm.material_id = m.id
JOIN products p ON p.id = pm.product_id
WHERE p.category_id = $1
UNION ALL
SELECT DISTINCT 'color', c.id, c.title, c.hex, ''
FROM colors c
JOIN product_colors pc ON pc.color_id = c.id
JOIN products p ON p.id = pc.product_id
WHERE p.category_id = $1
UNION ALL
SELECT 'stats', '', {STATS_COLUMNS}, '', '' FROM products p WHERE p.category_id = $1
ORDER BY 1, 3, 2"#
    )
}

#[derive(Debug, sqlx::FromRow)]
struct FacetRow {
    kind: String,
    id: String,
    field1: String,
    field2: String,
    field3: String,
}

pub struct AggregateRepository<'t> {
    scope: DbScope<'t>,
    deadline: Option<Instant>,
}

impl<'t> AggregateRepository<'t> {
    pub fn new(scope: DbScope<'t>) -> Self {
        Self {
            scope,
            deadline: None,
        }
    }

    /// Give up with a timeout once `deadline` passes
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// All facets, or only those used within `category_id`
    pub async fn get(&mut self, category_id: Option<&str>) -> Result<Dictionaries> {
        debug!(category_id, "Loading dictionaries");
        let scope = &mut self.scope;
        let rows = within_deadline(self.deadline, async move {
            let mut conn = scope.conn().await?;
            let rows = match category_id {
                Some(category_id) => {
                    sqlx::query(&category_sql())
                        .bind(category_id)
                        .fetch_all(&mut *conn)
                        .await?
                }
                None => sqlx::query(&global_sql()).fetch_all(&mut *conn).await?,
            };
            Ok::<_, RepositoryError>(rows)
        })
        .await
        .op(OP_GET)?;

        Ok(collect_rows(&rows))
    }
}

/// Sort rows into their lists; rows that do not fit are logged and skipped
fn collect_rows(rows: &[PgRow]) -> Dictionaries {
    let mut dictionaries = Dictionaries::default();
    for row in rows {
        let facet = match FacetRow::from_row(row) {
            Ok(facet) => facet,
            Err(e) => {
                warn!(error = %e, "Skipping undecodable dictionaries row");
                continue;
            }
        };
        if let Err(reason) = classify(&mut dictionaries, facet) {
            warn!(reason = %reason, "Skipping malformed dictionaries row");
        }
    }
    dictionaries
}

fn classify(dictionaries: &mut Dictionaries, row: FacetRow) -> std::result::Result<(), String> {
    let FacetRow {
        kind,
        id,
        field1,
        field2,
        field3,
    } = row;

    match kind.as_str() {
        "brand" => dictionaries.brands.push(Brand { id, title: field1 }),
        "category" => dictionaries.categories.push(Category {
            id,
            title: field1,
            uri: field2,
            img: field3,
        }),
        "country" => dictionaries.countries.push(Country {
            id,
            title: field1,
            friendly: field2,
        }),
        "material" => dictionaries.materials.push(Material { id, title: field1 }),
        "color" => dictionaries.colors.push(Color {
            id,
            title: field1,
            hex: field2,
        }),
        "stats" => apply_stats(dictionaries, &field1)?,
        other => return Err(format!("unknown row kind {other:?}")),
    }
    Ok(())
}

fn apply_stats(dictionaries: &mut Dictionaries, packed: &str) -> std::result::Result<(), String> {
    let values = packed
        .split(',')
        .map(|v| v.trim().parse::<i32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("stats value is not an integer: {e}"))?;

    let &[min_price, max_price, min_width, max_width, min_height, max_height, min_depth, max_depth] =
        values.as_slice()
    else {
        return Err(format!("expected 8 stats values, got {}", values.len()));
    };

    dictionaries.min_price = min_price;
    dictionaries.max_price = max_price;
    dictionaries.min_width = min_width;
    dictionaries.max_width = max_width;
    dictionaries.min_height = min_height;
    dictionaries.max_height = max_height;
    dictionaries.min_depth = min_depth;
    dictionaries.max_depth = max_depth;
    Ok(())
}
