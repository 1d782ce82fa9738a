//! Product filter, sort, pagination and search criteria

use serde::{Deserialize, Serialize};
use volha_common::RepositoryError;

/// Optional lower/upper bound on a numeric product attribute.
///
/// A bound only applies when it is present and greater than zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl Range {
    pub fn between(min: i32, max: i32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn effective_min(&self) -> Option<i32> {
        self.min.filter(|v| *v > 0)
    }

    pub fn effective_max(&self) -> Option<i32> {
        self.max.filter(|v| *v > 0)
    }
}

/// Sortable product columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Price,
    Width,
    Height,
    Depth,
    Title,
    Views,
}

impl SortField {
    /// Parse a caller-supplied field name; anything outside the list is `None`
    pub fn parse(field: &str) -> Option<Self> {
        match field {
            "price" => Some(SortField::Price),
            "width" => Some(SortField::Width),
            "height" => Some(SortField::Height),
            "depth" => Some(SortField::Depth),
            "title" => Some(SortField::Title),
            "views" => Some(SortField::Views),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::Price => "p.price",
            SortField::Width => "p.width",
            SortField::Height => "p.height",
            SortField::Depth => "p.depth",
            SortField::Title => "p.title",
            SortField::Views => "p.views",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Only an explicit `desc` (any case) sorts descending
    pub fn parse(order: &str) -> Self {
        if order.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Build from raw request strings. An unknown field means no sorting.
    pub fn from_request(field: &str, order: &str) -> Option<Self> {
        SortField::parse(field).map(|field| Self::new(field, SortDirection::parse(order)))
    }
}

/// Which slice of the result set to return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pagination {
    #[default]
    All,
    /// LIMIT/OFFSET, each applied only when greater than zero
    Page { limit: i64, offset: i64 },
    /// Half-open `[start, end)` window over the ordered result; a negative
    /// start counts from the first row
    Window { start: i64, end: i64 },
}

impl Pagination {
    /// `(limit, offset)` to apply, or `None` when the slice is empty
    pub fn bounds(&self) -> Option<(Option<i64>, Option<i64>)> {
        let positive = |v: i64| (v > 0).then_some(v);
        match *self {
            Pagination::All => Some((None, None)),
            Pagination::Page { limit, offset } => Some((positive(limit), positive(offset))),
            Pagination::Window { start, end } => {
                // A window cannot begin before the first row
                let start = start.max(0);
                match end.checked_sub(start) {
                    Some(len) if len > 0 => Some((Some(len), positive(start))),
                    _ => None,
                }
            }
        }
    }
}

/// Product filter criteria. Every part is optional; present parts are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub brand_ids: Vec<String>,
    pub category_ids: Vec<String>,
    pub country_ids: Vec<String>,
    pub material_ids: Vec<String>,
    pub color_ids: Vec<String>,
    pub width: Range,
    pub height: Range,
    pub depth: Range,
    pub price: Range,
    pub sort: Option<SortSpec>,
    pub pagination: Pagination,
}

/// Exactly one way to look a product up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductSearch {
    Id(String),
    Article(String),
    /// Case-insensitive substring of the title
    Title(String),
}

impl ProductSearch {
    /// Build from optional request fields; empty strings count as absent.
    ///
    /// Exactly one field must be given.
    pub fn from_fields(
        id: Option<&str>,
        article: Option<&str>,
        title: Option<&str>,
    ) -> Result<Self, RepositoryError> {
        let present = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(str::to_string);

        match (present(id), present(article), present(title)) {
            (Some(id), None, None) => Ok(ProductSearch::Id(id)),
            (None, Some(article), None) => Ok(ProductSearch::Article(article)),
            (None, None, Some(title)) => Ok(ProductSearch::Title(title)),
            (None, None, None) => Err(RepositoryError::InvalidCriteria(
                "no search parameter provided".to_string(),
            )),
            _ => Err(RepositoryError::InvalidCriteria(
                "only one of id, article or title may be given".to_string(),
            )),
        }
    }
}
