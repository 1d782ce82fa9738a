//! Catalog domain: dictionaries, products, color photos, faceted statistics

pub mod domain;
pub mod repository;
pub mod service;

// Re-export domain types at the crate root for convenience
pub use domain::entities::*;
pub use domain::filter::{
    Pagination, ProductFilter, ProductSearch, Range, SortDirection, SortField, SortSpec,
};
// Re-export repository types
pub use repository::{
    migrate, AggregateRepository, CatalogRepositories, ColorPhotosRepository,
    DictionaryRepository, ProductRepository,
};
pub use service::CatalogService;
