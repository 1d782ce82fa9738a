//! Repository implementations for the catalog domain

pub mod aggregate;
pub mod color_photos;
pub mod dictionaries;
pub mod products;
pub mod query;
pub mod records;
pub mod transactions;

use sqlx::migrate::MigrateError;
use sqlx::PgPool;
use tokio::time::Instant;
use volha_common::DbScope;

pub use aggregate::AggregateRepository;
pub use color_photos::ColorPhotosRepository;
pub use dictionaries::DictionaryRepository;
pub use products::ProductRepository;
pub use query::{BuiltQuery, Relation, SqlArg};
pub use records::DictionaryRecord;
pub use transactions::{
    insert_product_tx, link_tx, prune_links_tx, reconcile_links_tx, update_product_row_tx,
};

/// Combined repository access for the catalog domain
///
/// Every repository handed out shares this provider's scope, so inside a
/// transaction they all read each other's writes.
pub struct CatalogRepositories<'t> {
    scope: DbScope<'t>,
    deadline: Option<Instant>,
}

impl<'t> CatalogRepositories<'t> {
    pub fn new(scope: DbScope<'t>) -> Self {
        Self {
            scope,
            deadline: None,
        }
    }

    /// Deadline applied to reads of every repository handed out
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn dictionaries(&mut self) -> DictionaryRepository<'_> {
        DictionaryRepository::new(self.scope.reborrow()).with_deadline(self.deadline)
    }

    pub fn products(&mut self) -> ProductRepository<'_> {
        ProductRepository::new(self.scope.reborrow()).with_deadline(self.deadline)
    }

    pub fn color_photos(&mut self) -> ColorPhotosRepository<'_> {
        ColorPhotosRepository::new(self.scope.reborrow())
    }

    pub fn aggregate(&mut self) -> AggregateRepository<'_> {
        AggregateRepository::new(self.scope.reborrow()).with_deadline(self.deadline)
    }
}

/// Apply the embedded schema migrations
pub async fn migrate(pool: &PgPool) -> std::result::Result<(), MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
