//! Catalog service
//!
//! Validates payloads, runs every mutation in its own transaction and hands
//! reads to repositories bound to the pool.
//!
//! Each mutation has an `*_in` variant taking a [`DbScope`]. Given a scope
//! that carries a transaction, the write joins it and commits or rolls back
//! with the caller's work.

use sqlx::PgPool;
use tokio::time::Instant;
use tracing::instrument;
use volha_common::{DbScope, Error, OpContext, Result, TxRunner};

use crate::domain::entities::{
    Dictionaries, Dictionary, DictionaryKind, Product, ProductColorPhotos, ProductDraft,
};
use crate::domain::filter::{ProductFilter, ProductSearch};
use crate::domain::validation::{
    validate_color_photos, validate_dictionary, validate_filter, validate_id, validate_product,
    validate_range,
};
use crate::repository::CatalogRepositories;

/// Turn a validation failure into a failed precondition for `op`
fn check(op: &'static str, outcome: std::result::Result<(), String>) -> Result<()> {
    outcome.map_err(|reason| Error::failed_precondition(op, reason))
}

fn parse_kind(op: &'static str, kind: &str) -> Result<DictionaryKind> {
    kind.parse::<DictionaryKind>().op(op)
}

#[derive(Clone)]
pub struct CatalogService {
    runner: TxRunner,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            runner: TxRunner::new(pool),
        }
    }

    /// Transaction runner; pass its transaction to the `*_in` methods to
    /// compose several service-level writes atomically
    pub fn runner(&self) -> &TxRunner {
        &self.runner
    }

    fn repositories(&self, deadline: Option<Instant>) -> CatalogRepositories<'static> {
        CatalogRepositories::new(self.runner.scope()).with_deadline(deadline)
    }

    // --- Dictionaries ---

    pub async fn list_dictionary(
        &self,
        kind: &str,
        deadline: Option<Instant>,
    ) -> Result<Vec<Dictionary>> {
        let kind = parse_kind("catalog.service.list_dictionary", kind)?;
        self.repositories(deadline).dictionaries().list(kind).await
    }

    pub async fn get_dictionary(
        &self,
        kind: &str,
        id: &str,
        deadline: Option<Instant>,
    ) -> Result<Dictionary> {
        const OP: &str = "catalog.service.get_dictionary";
        let kind = parse_kind(OP, kind)?;
        check(OP, validate_id(id))?;
        self.repositories(deadline).dictionaries().get(kind, id).await
    }

    pub async fn create_dictionary(&self, kind: &str, entity: Dictionary) -> Result<()> {
        self.create_dictionary_in(&mut self.runner.scope(), kind, entity)
            .await
    }

    #[instrument(skip(self, scope, entity), fields(id = entity.id()))]
    pub async fn create_dictionary_in(
        &self,
        scope: &mut DbScope<'_>,
        kind: &str,
        entity: Dictionary,
    ) -> Result<()> {
        const OP: &str = "catalog.service.create_dictionary";
        let kind = parse_kind(OP, kind)?;
        check(OP, validate_dictionary(&entity))?;
        self.runner
            .run_in_scope(scope, move |tx| {
                Box::pin(async move {
                    CatalogRepositories::new(DbScope::tx(tx))
                        .dictionaries()
                        .create(kind, &entity)
                        .await
                })
            })
            .await
    }

    pub async fn update_dictionary(&self, kind: &str, entity: Dictionary) -> Result<()> {
        self.update_dictionary_in(&mut self.runner.scope(), kind, entity)
            .await
    }

    #[instrument(skip(self, scope, entity), fields(id = entity.id()))]
    pub async fn update_dictionary_in(
        &self,
        scope: &mut DbScope<'_>,
        kind: &str,
        entity: Dictionary,
    ) -> Result<()> {
        const OP: &str = "catalog.service.update_dictionary";
        let kind = parse_kind(OP, kind)?;
        check(OP, validate_dictionary(&entity))?;
        self.runner
            .run_in_scope(scope, move |tx| {
                Box::pin(async move {
                    CatalogRepositories::new(DbScope::tx(tx))
                        .dictionaries()
                        .update(kind, &entity)
                        .await
                })
            })
            .await
    }

    pub async fn delete_dictionary(&self, kind: &str, id: &str) -> Result<()> {
        self.delete_dictionary_in(&mut self.runner.scope(), kind, id)
            .await
    }

    #[instrument(skip(self, scope))]
    pub async fn delete_dictionary_in(
        &self,
        scope: &mut DbScope<'_>,
        kind: &str,
        id: &str,
    ) -> Result<()> {
        const OP: &str = "catalog.service.delete_dictionary";
        let kind = parse_kind(OP, kind)?;
        check(OP, validate_id(id))?;
        let id = id.to_string();
        self.runner
            .run_in_scope(scope, move |tx| {
                Box::pin(async move {
                    CatalogRepositories::new(DbScope::tx(tx))
                        .dictionaries()
                        .delete(kind, &id)
                        .await
                })
            })
            .await
    }

    /// Facets for the whole catalog, or for one category when `category_id` is non-empty
    pub async fn dictionaries(
        &self,
        category_id: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<Dictionaries> {
        let category_id = category_id.filter(|id| !id.is_empty());
        if let Some(id) = category_id {
            check("catalog.service.dictionaries", validate_id(id))?;
        }
        self.repositories(deadline).aggregate().get(category_id).await
    }

    // --- Products ---

    /// Products `[start, end)` ordered by title
    pub async fn list_products(
        &self,
        start: i64,
        end: i64,
        deadline: Option<Instant>,
    ) -> Result<Vec<Product>> {
        check("catalog.service.list_products", validate_range(start, end))?;
        self.repositories(deadline).products().list(start, end).await
    }

    /// Fetch a product and count the view
    pub async fn get_product(&self, id: &str) -> Result<Product> {
        self.get_product_in(&mut self.runner.scope(), id).await
    }

    #[instrument(skip(self, scope))]
    pub async fn get_product_in(&self, scope: &mut DbScope<'_>, id: &str) -> Result<Product> {
        check("catalog.service.get_product", validate_id(id))?;
        let id = id.to_string();
        self.runner
            .run_in_scope(scope, move |tx| {
                Box::pin(async move {
                    let mut repositories = CatalogRepositories::new(DbScope::tx(tx));
                    let product = repositories.products().get(&id).await?;
                    repositories.products().increment_views(&id).await?;
                    Ok(product)
                })
            })
            .await
    }

    pub async fn create_product(&self, draft: ProductDraft) -> Result<()> {
        self.create_product_in(&mut self.runner.scope(), draft).await
    }

    #[instrument(skip(self, scope, draft), fields(id = %draft.id))]
    pub async fn create_product_in(
        &self,
        scope: &mut DbScope<'_>,
        draft: ProductDraft,
    ) -> Result<()> {
        check("catalog.service.create_product", validate_product(&draft))?;
        self.runner
            .run_in_scope(scope, move |tx| {
                Box::pin(async move {
                    CatalogRepositories::new(DbScope::tx(tx))
                        .products()
                        .create(&draft)
                        .await
                })
            })
            .await
    }

    pub async fn update_product(&self, draft: ProductDraft) -> Result<()> {
        self.update_product_in(&mut self.runner.scope(), draft).await
    }

    #[instrument(skip(self, scope, draft), fields(id = %draft.id))]
    pub async fn update_product_in(
        &self,
        scope: &mut DbScope<'_>,
        draft: ProductDraft,
    ) -> Result<()> {
        check("catalog.service.update_product", validate_product(&draft))?;
        self.runner
            .run_in_scope(scope, move |tx| {
                Box::pin(async move {
                    CatalogRepositories::new(DbScope::tx(tx))
                        .products()
                        .update(&draft)
                        .await
                })
            })
            .await
    }

    pub async fn delete_product(&self, id: &str) -> Result<()> {
        self.delete_product_in(&mut self.runner.scope(), id).await
    }

    #[instrument(skip(self, scope))]
    pub async fn delete_product_in(&self, scope: &mut DbScope<'_>, id: &str) -> Result<()> {
        check("catalog.service.delete_product", validate_id(id))?;
        let id = id.to_string();
        self.runner
            .run_in_scope(scope, move |tx| {
                Box::pin(async move {
                    CatalogRepositories::new(DbScope::tx(tx))
                        .products()
                        .delete(&id)
                        .await
                })
            })
            .await
    }

    /// Look products up by exactly one of id, article or title fragment
    pub async fn search_products(
        &self,
        id: Option<&str>,
        article: Option<&str>,
        title: Option<&str>,
        deadline: Option<Instant>,
    ) -> Result<Vec<Product>> {
        let search =
            ProductSearch::from_fields(id, article, title).op("catalog.service.search_products")?;
        self.repositories(deadline).products().search(&search).await
    }

    pub async fn filter_products(
        &self,
        filter: &ProductFilter,
        deadline: Option<Instant>,
    ) -> Result<Vec<Product>> {
        check("catalog.service.filter_products", validate_filter(filter))?;
        self.repositories(deadline).products().filter(filter).await
    }

    pub async fn count_products(
        &self,
        filter: &ProductFilter,
        deadline: Option<Instant>,
    ) -> Result<i64> {
        self.repositories(deadline).products().count(filter).await
    }

    // --- Product color photos ---

    pub async fn get_color_photos(&self, product_id: &str, color_id: &str) -> Result<Vec<String>> {
        const OP: &str = "catalog.service.get_color_photos";
        check(OP, validate_id(product_id))?;
        check(OP, validate_id(color_id))?;
        self.repositories(None)
            .color_photos()
            .get_photos(product_id, color_id)
            .await
    }

    pub async fn list_color_photos(&self) -> Result<Vec<ProductColorPhotos>> {
        self.repositories(None).color_photos().list().await
    }

    pub async fn create_color_photos(&self, pcp: ProductColorPhotos) -> Result<()> {
        self.create_color_photos_in(&mut self.runner.scope(), pcp)
            .await
    }

    #[instrument(skip(self, scope, pcp), fields(product_id = %pcp.product_id, color_id = %pcp.color_id))]
    pub async fn create_color_photos_in(
        &self,
        scope: &mut DbScope<'_>,
        pcp: ProductColorPhotos,
    ) -> Result<()> {
        check("catalog.service.create_color_photos", validate_color_photos(&pcp))?;
        self.runner
            .run_in_scope(scope, move |tx| {
                Box::pin(async move {
                    CatalogRepositories::new(DbScope::tx(tx))
                        .color_photos()
                        .create(&pcp)
                        .await
                })
            })
            .await
    }

    pub async fn update_color_photos(&self, pcp: ProductColorPhotos) -> Result<()> {
        self.update_color_photos_in(&mut self.runner.scope(), pcp)
            .await
    }

    #[instrument(skip(self, scope, pcp), fields(product_id = %pcp.product_id, color_id = %pcp.color_id))]
    pub async fn update_color_photos_in(
        &self,
        scope: &mut DbScope<'_>,
        pcp: ProductColorPhotos,
    ) -> Result<()> {
        check("catalog.service.update_color_photos", validate_color_photos(&pcp))?;
        self.runner
            .run_in_scope(scope, move |tx| {
                Box::pin(async move {
                    CatalogRepositories::new(DbScope::tx(tx))
                        .color_photos()
                        .update(&pcp)
                        .await
                })
            })
            .await
    }

    pub async fn delete_color_photos(&self, product_id: &str, color_id: &str) -> Result<()> {
        self.delete_color_photos_in(&mut self.runner.scope(), product_id, color_id)
            .await
    }

    #[instrument(skip(self, scope))]
    pub async fn delete_color_photos_in(
        &self,
        scope: &mut DbScope<'_>,
        product_id: &str,
        color_id: &str,
    ) -> Result<()> {
        const OP: &str = "catalog.service.delete_color_photos";
        check(OP, validate_id(product_id))?;
        check(OP, validate_id(color_id))?;
        let (product_id, color_id) = (product_id.to_string(), color_id.to_string());
        self.runner
            .run_in_scope(scope, move |tx| {
                Box::pin(async move {
                    CatalogRepositories::new(DbScope::tx(tx))
                        .color_photos()
                        .delete(&product_id, &color_id)
                        .await
                })
            })
            .await
    }
}
