//! Product color photos repository

use tracing::debug;
use volha_common::{DbScope, OpContext, RepositoryError, Result};

use crate::domain::entities::ProductColorPhotos;

const OP_GET_PHOTOS: &str = "catalog.color_photos.get_photos";
const OP_LIST: &str = "catalog.color_photos.list";
const OP_CREATE: &str = "catalog.color_photos.create";
const OP_UPDATE: &str = "catalog.color_photos.update";
const OP_DELETE: &str = "catalog.color_photos.delete";

pub struct ColorPhotosRepository<'t> {
    scope: DbScope<'t>,
}

impl<'t> ColorPhotosRepository<'t> {
    pub fn new(scope: DbScope<'t>) -> Self {
        Self { scope }
    }

    /// Photos of `product_id` in `color_id`
    pub async fn get_photos(&mut self, product_id: &str, color_id: &str) -> Result<Vec<String>> {
        debug!(product_id, color_id, "Fetching product color photos");
        let mut conn = self.scope.conn().await.op(OP_GET_PHOTOS)?;
        let photos: Option<Vec<String>> = sqlx::query_scalar(
            "SELECT photos FROM product_color_photos WHERE product_id = $1 AND color_id = $2",
        )
        .bind(product_id)
        .bind(color_id)
        .fetch_optional(&mut *conn)
        .await
        .op(OP_GET_PHOTOS)?;

        photos.ok_or_else(|| RepositoryError::NotFound.at(OP_GET_PHOTOS))
    }

    pub async fn list(&mut self) -> Result<Vec<ProductColorPhotos>> {
        let mut conn = self.scope.conn().await.op(OP_LIST)?;
        let rows = sqlx::query_as::<_, ProductColorPhotos>(
            r#"
            SELECT product_id, color_id, photos
            FROM product_color_photos
            ORDER BY product_id, color_id
            "#,
        )
        .fetch_all(&mut *conn)
        .await
        .op(OP_LIST)?;

        Ok(rows)
    }

    /// Insert photos for a new (product, color) pair
    pub async fn create(&mut self, pcp: &ProductColorPhotos) -> Result<()> {
        debug!(product_id = %pcp.product_id, color_id = %pcp.color_id, "Creating product color photos");
        let mut conn = self.scope.conn().await.op(OP_CREATE)?;
        sqlx::query(
            "INSERT INTO product_color_photos (product_id, color_id, photos) VALUES ($1, $2, $3)",
        )
        .bind(&pcp.product_id)
        .bind(&pcp.color_id)
        .bind(&pcp.photos)
        .execute(&mut *conn)
        .await
        .op(OP_CREATE)?;
        Ok(())
    }

    /// Replace the photos of an existing pair
    pub async fn update(&mut self, pcp: &ProductColorPhotos) -> Result<()> {
        debug!(product_id = %pcp.product_id, color_id = %pcp.color_id, "Updating product color photos");
        let mut conn = self.scope.conn().await.op(OP_UPDATE)?;
        let result = sqlx::query(
            "UPDATE product_color_photos SET photos = $3 WHERE product_id = $1 AND color_id = $2",
        )
        .bind(&pcp.product_id)
        .bind(&pcp.color_id)
        .bind(&pcp.photos)
        .execute(&mut *conn)
        .await
        .op(OP_UPDATE)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound.at(OP_UPDATE));
        }
        Ok(())
    }

    pub async fn delete(&mut self, product_id: &str, color_id: &str) -> Result<()> {
        debug!(product_id, color_id, "Deleting product color photos");
        let mut conn = self.scope.conn().await.op(OP_DELETE)?;
        let result = sqlx::query(
            "DELETE FROM product_color_photos WHERE product_id = $1 AND color_id = $2",
        )
        .bind(product_id)
        .bind(color_id)
        .execute(&mut *conn)
        .await
        .op(OP_DELETE)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound.at(OP_DELETE));
        }
        Ok(())
    }
}
