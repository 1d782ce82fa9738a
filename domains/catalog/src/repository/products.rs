//! Product repository

use sqlx::types::Json;
use sqlx::Postgres;
use tokio::time::Instant;
use tracing::debug;
use volha_common::{within_deadline, DbScope, OpContext, RepositoryError, Result};

use crate::domain::entities::{
    Brand, Category, Color, Country, Material, Product, ProductDraft, SimilarProduct,
};
use crate::domain::filter::{
    Pagination, ProductFilter, ProductSearch, SortDirection, SortField, SortSpec,
};
use crate::repository::query::{count_query, filter_query, search_query, BuiltQuery, Relation};
use crate::repository::transactions::{
    insert_product_tx, link_tx, reconcile_links_tx, update_product_row_tx,
};

const OP_LIST: &str = "catalog.products.list";
const OP_GET: &str = "catalog.products.get";
const OP_CREATE: &str = "catalog.products.create";
const OP_UPDATE: &str = "catalog.products.update";
const OP_DELETE: &str = "catalog.products.delete";
const OP_SEARCH: &str = "catalog.products.search";
const OP_FILTER: &str = "catalog.products.filter";
const OP_COUNT: &str = "catalog.products.count";
const OP_INCREMENT_VIEWS: &str = "catalog.products.increment_views";

/// Flat row produced by the hydrated product projection
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    title: String,
    article: String,
    width: i32,
    height: i32,
    depth: i32,
    photos: Vec<String>,
    price: i32,
    description: String,
    views: i32,
    is_favorite: bool,
    brand_id: String,
    brand_title: String,
    category_id: String,
    category_title: String,
    category_uri: String,
    category_img: String,
    country_id: String,
    country_title: String,
    country_friendly: String,
    materials: Json<Vec<Material>>,
    colors: Json<Vec<Color>>,
    seems: Json<Vec<SimilarProduct>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            title: row.title,
            article: row.article,
            brand: Brand {
                id: row.brand_id,
                title: row.brand_title,
            },
            category: Category {
                id: row.category_id,
                title: row.category_title,
                uri: row.category_uri,
                img: row.category_img,
            },
            country: Country {
                id: row.country_id,
                title: row.country_title,
                friendly: row.country_friendly,
            },
            width: row.width,
            height: row.height,
            depth: row.depth,
            materials: row.materials.0,
            colors: row.colors.0,
            photos: row.photos,
            seems: row.seems.0,
            price: row.price,
            description: row.description,
            views: row.views,
            is_favorite: row.is_favorite,
        }
    }
}

pub struct ProductRepository<'t> {
    scope: DbScope<'t>,
    deadline: Option<Instant>,
}

impl<'t> ProductRepository<'t> {
    pub fn new(scope: DbScope<'t>) -> Self {
        Self {
            scope,
            deadline: None,
        }
    }

    /// Give up reads with a timeout once `deadline` passes
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Products `[start, end)` ordered by title; an empty window returns nothing
    pub async fn list(&mut self, start: i64, end: i64) -> Result<Vec<Product>> {
        debug!(start, end, "Listing products");
        let filter = ProductFilter {
            sort: Some(SortSpec::new(SortField::Title, SortDirection::Asc)),
            pagination: Pagination::Window { start, end },
            ..ProductFilter::default()
        };
        self.fetch_filtered(&filter).await.op(OP_LIST)
    }

    /// Find product by ID
    pub async fn get(&mut self, id: &str) -> Result<Product> {
        debug!(id, "Fetching product");
        let query = search_query(&ProductSearch::Id(id.to_string()));
        self.fetch_all(query)
            .await
            .and_then(|products| products.into_iter().next().ok_or(RepositoryError::NotFound))
            .op(OP_GET)
    }

    /// Insert a product and all of its associations atomically
    pub async fn create(&mut self, draft: &ProductDraft) -> Result<()> {
        debug!(id = %draft.id, article = %draft.article, "Creating product");
        let mut atomic = self.scope.atomic().await.op(OP_CREATE)?;

        insert_product_tx(atomic.conn(), draft).await.op(OP_CREATE)?;
        for relation in Relation::ALL {
            link_tx(atomic.conn(), relation, &draft.id, draft.linked_ids(relation))
                .await
                .op(OP_CREATE)?;
        }

        atomic.commit().await.op(OP_CREATE)
    }

    /// Replace the product's scalars and reconcile its association sets
    pub async fn update(&mut self, draft: &ProductDraft) -> Result<()> {
        debug!(id = %draft.id, "Updating product");
        let mut atomic = self.scope.atomic().await.op(OP_UPDATE)?;

        update_product_row_tx(atomic.conn(), draft).await.op(OP_UPDATE)?;
        for relation in Relation::ALL {
            reconcile_links_tx(atomic.conn(), relation, &draft.id, draft.linked_ids(relation))
                .await
                .op(OP_UPDATE)?;
        }

        atomic.commit().await.op(OP_UPDATE)
    }

    /// Delete product by ID; its associations go with it
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        debug!(id, "Deleting product");
        let mut conn = self.scope.conn().await.op(OP_DELETE)?;
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .op(OP_DELETE)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound.at(OP_DELETE));
        }
        Ok(())
    }

    pub async fn search(&mut self, search: &ProductSearch) -> Result<Vec<Product>> {
        debug!(?search, "Searching products");
        self.fetch_all(search_query(search)).await.op(OP_SEARCH)
    }

    pub async fn filter(&mut self, filter: &ProductFilter) -> Result<Vec<Product>> {
        debug!(?filter, "Filtering products");
        self.fetch_filtered(filter).await.op(OP_FILTER)
    }

    /// Number of products matching `filter`, ignoring its sort and pagination
    pub async fn count(&mut self, filter: &ProductFilter) -> Result<i64> {
        let query = count_query(filter);
        let scope = &mut self.scope;
        within_deadline(self.deadline, async move {
            let arguments = query.arguments()?;
            let mut conn = scope.conn().await?;
            let count: i64 = sqlx::query_scalar_with::<Postgres, i64, _>(&query.sql, arguments)
                .fetch_one(&mut *conn)
                .await?;
            Ok(count)
        })
        .await
        .op(OP_COUNT)
    }

    pub async fn increment_views(&mut self, id: &str) -> Result<()> {
        let mut conn = self.scope.conn().await.op(OP_INCREMENT_VIEWS)?;
        let result = sqlx::query("UPDATE products SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await
            .op(OP_INCREMENT_VIEWS)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound.at(OP_INCREMENT_VIEWS));
        }
        Ok(())
    }

    async fn fetch_filtered(
        &mut self,
        filter: &ProductFilter,
    ) -> std::result::Result<Vec<Product>, RepositoryError> {
        match filter_query(filter) {
            Some(query) => self.fetch_all(query).await,
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_all(
        &mut self,
        query: BuiltQuery,
    ) -> std::result::Result<Vec<Product>, RepositoryError> {
        let scope = &mut self.scope;
        within_deadline(self.deadline, async move {
            let arguments = query.arguments()?;
            let mut conn = scope.conn().await?;
            let rows = sqlx::query_as_with::<Postgres, ProductRow, _>(&query.sql, arguments)
                .fetch_all(&mut *conn)
                .await?;
            Ok(rows.into_iter().map(Product::from).collect())
        })
        .await
    }
}
