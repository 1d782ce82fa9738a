//! Statement-level product writes that run inside an open transaction
//!
//! The product repository strings these together on one connection so a
//! product and its associations are written atomically.

use sqlx::PgConnection;
use volha_common::RepositoryError;

use crate::domain::entities::ProductDraft;
use crate::repository::query::Relation;

/// Insert the product row itself.
pub async fn insert_product_tx(
    conn: &mut PgConnection,
    draft: &ProductDraft,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO products (
            id, title, article, brand_id, category_id, country_id,
            width, height, depth, photos, price, description, is_favorite
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(&draft.id)
    .bind(&draft.title)
    .bind(&draft.article)
    .bind(&draft.brand_id)
    .bind(&draft.category_id)
    .bind(&draft.country_id)
    .bind(draft.width)
    .bind(draft.height)
    .bind(draft.depth)
    .bind(&draft.photos)
    .bind(draft.price)
    .bind(&draft.description)
    .bind(draft.is_favorite)
    .execute(conn)
    .await?;
    Ok(())
}

/// Replace every scalar column of an existing product except `views`,
/// which only changes through `increment_views`.
///
/// Returns `RepositoryError::NotFound` if the product does not exist.
pub async fn update_product_row_tx(
    conn: &mut PgConnection,
    draft: &ProductDraft,
) -> std::result::Result<(), RepositoryError> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            title = $2,
            article = $3,
            brand_id = $4,
            category_id = $5,
            country_id = $6,
            width = $7,
            height = $8,
            depth = $9,
            photos = $10,
            price = $11,
            description = $12,
            is_favorite = $13
        WHERE id = $1
        "#,
    )
    .bind(&draft.id)
    .bind(&draft.title)
    .bind(&draft.article)
    .bind(&draft.brand_id)
    .bind(&draft.category_id)
    .bind(&draft.country_id)
    .bind(draft.width)
    .bind(draft.height)
    .bind(draft.depth)
    .bind(&draft.photos)
    .bind(draft.price)
    .bind(&draft.description)
    .bind(draft.is_favorite)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Link `ids` to the product, skipping links that already exist.
pub async fn link_tx(
    conn: &mut PgConnection,
    relation: Relation,
    product_id: &str,
    ids: &[String],
) -> std::result::Result<(), sqlx::Error> {
    if ids.is_empty() {
        return Ok(());
    }
    let sql = format!(
        "INSERT INTO {table} (product_id, {column}) \
         SELECT $1, linked FROM unnest($2::text[]) AS linked \
         ON CONFLICT (product_id, {column}) DO NOTHING",
        table = relation.table(),
        column = relation.column(),
    );
    sqlx::query(&sql)
        .bind(product_id)
        .bind(ids)
        .execute(conn)
        .await?;
    Ok(())
}

/// Drop every link of the product whose id is not in `keep`.
pub async fn prune_links_tx(
    conn: &mut PgConnection,
    relation: Relation,
    product_id: &str,
    keep: &[String],
) -> std::result::Result<(), sqlx::Error> {
    let sql = format!(
        "DELETE FROM {table} WHERE product_id = $1 AND NOT ({column} = ANY($2::text[]))",
        table = relation.table(),
        column = relation.column(),
    );
    sqlx::query(&sql)
        .bind(product_id)
        .bind(keep)
        .execute(conn)
        .await?;
    Ok(())
}

/// Bring one association set in line with `target`.
///
/// Missing links are added and extra ones removed; links present on both
/// sides are left untouched.
pub async fn reconcile_links_tx(
    conn: &mut PgConnection,
    relation: Relation,
    product_id: &str,
    target: &[String],
) -> std::result::Result<(), sqlx::Error> {
    link_tx(&mut *conn, relation, product_id, target).await?;
    prune_links_tx(conn, relation, product_id, target).await
}

impl ProductDraft {
    /// Target id set for one association
    pub fn linked_ids(&self, relation: Relation) -> &[String] {
        match relation {
            Relation::Materials => &self.material_ids,
            Relation::Colors => &self.color_ids,
            Relation::Seems => &self.seem_ids,
        }
    }
}
