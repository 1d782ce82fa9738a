//! Product query builder
//!
//! Builds the product select/count statements from a filter, a search
//! criterion or a page window. Caller values only ever become bound
//! arguments; identifiers come from `SortField` and `Relation`.

use sqlx::postgres::PgArguments;
use sqlx::Arguments;
use volha_common::RepositoryError;

use crate::domain::filter::{ProductFilter, ProductSearch, Range};

/// Hydrated product projection; every read appends to this
pub const PRODUCT_SELECT: &str = r#"
SELECT
    p.id, p.title, p.article, p.width, p.height, p.depth, p.photos,
    p.price, p.description, p.views, p.is_favorite,
    b.id AS brand_id, b.title AS brand_title,
    cat.id AS category_id, cat.title AS category_title,
    cat.uri AS category_uri, cat.img AS category_img,
    co.id AS country_id, co.title AS country_title, co.friendly AS country_friendly,
    COALESCE((
        SELECT jsonb_agg(jsonb_build_object('id', m.id, 'title', m.title) ORDER BY m.title)
        FROM product_materials pm
        JOIN materials m ON m.id = pm.material_id
        WHERE pm.product_id = p.id
    ), '[]'::jsonb) AS materials,
    COALESCE((
        SELECT jsonb_agg(jsonb_build_object('id', c.id, 'title', c.title, 'hex', c.hex) ORDER BY c.title)
        FROM product_colors pc
        JOIN colors c ON c.id = pc.color_id
        WHERE pc.product_id = p.id
    ), '[]'::jsonb) AS colors,
    COALESCE((
        SELECT jsonb_agg(jsonb_build_object(
            'id', s.id, 'title', s.title, 'article', s.article,
            'width', s.width, 'height', s.height, 'depth', s.depth,
            'photos', s.photos, 'price', s.price, 'description', s.description
        ) ORDER BY s.title)
        FROM product_seems ps
        JOIN products s ON s.id = ps.similar_product_id
        WHERE ps.product_id = p.id
    ), '[]'::jsonb) AS seems
FROM products p
JOIN brands b ON b.id = p.brand_id
JOIN categories cat ON cat.id = p.category_id
JOIN countries co ON co.id = p.country_id"#;

const PRODUCT_COUNT: &str = "SELECT COUNT(*) FROM products p";

/// Many-to-many product associations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Materials,
    Colors,
    Seems,
}

impl Relation {
    pub const ALL: [Relation; 3] = [Relation::Materials, Relation::Colors, Relation::Seems];

    pub fn table(&self) -> &'static str {
        match self {
            Relation::Materials => "product_materials",
            Relation::Colors => "product_colors",
            Relation::Seems => "product_seems",
        }
    }

    /// Column holding the associated id
    pub fn column(&self) -> &'static str {
        match self {
            Relation::Materials => "material_id",
            Relation::Colors => "color_id",
            Relation::Seems => "similar_product_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlArg {
    Text(String),
    Int(i32),
    BigInt(i64),
}

/// Statement text plus its arguments in placeholder order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub args: Vec<SqlArg>,
}

impl BuiltQuery {
    pub fn arguments(&self) -> Result<PgArguments, RepositoryError> {
        let mut arguments = PgArguments::default();
        for arg in &self.args {
            match arg {
                SqlArg::Text(value) => arguments.add(value.as_str()),
                SqlArg::Int(value) => arguments.add(*value),
                SqlArg::BigInt(value) => arguments.add(*value),
            }
            .map_err(|e| RepositoryError::InvalidData(e.to_string()))?;
        }
        Ok(arguments)
    }
}

#[derive(Default)]
struct Predicates {
    clauses: Vec<String>,
    args: Vec<SqlArg>,
}

impl Predicates {
    fn from_filter(filter: &ProductFilter) -> Self {
        let mut predicates = Self::default();
        predicates.member_of("p.brand_id", &filter.brand_ids);
        predicates.member_of("p.category_id", &filter.category_ids);
        predicates.member_of("p.country_id", &filter.country_ids);
        predicates.linked_to(Relation::Materials, &filter.material_ids);
        predicates.linked_to(Relation::Colors, &filter.color_ids);
        predicates.within("p.width", filter.width);
        predicates.within("p.height", filter.height);
        predicates.within("p.depth", filter.depth);
        predicates.within("p.price", filter.price);
        predicates
    }

    fn placeholder(&mut self, arg: SqlArg) -> String {
        self.args.push(arg);
        format!("${}", self.args.len())
    }

    fn placeholder_list(&mut self, values: &[String]) -> String {
        values
            .iter()
            .map(|value| self.placeholder(SqlArg::Text(value.clone())))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn member_of(&mut self, column: &'static str, values: &[String]) {
        if values.is_empty() {
            return;
        }
        let list = self.placeholder_list(values);
        self.clauses.push(format!("{column} IN ({list})"));
    }

    fn linked_to(&mut self, relation: Relation, values: &[String]) {
        if values.is_empty() {
            return;
        }
        let list = self.placeholder_list(values);
        self.clauses.push(format!(
            "EXISTS (SELECT 1 FROM {table} l WHERE l.product_id = p.id AND l.{column} IN ({list}))",
            table = relation.table(),
            column = relation.column(),
        ));
    }

    fn within(&mut self, column: &'static str, range: Range) {
        if let Some(min) = range.effective_min() {
            let ph = self.placeholder(SqlArg::Int(min));
            self.clauses.push(format!("{column} >= {ph}"));
        }
        if let Some(max) = range.effective_max() {
            let ph = self.placeholder(SqlArg::Int(max));
            self.clauses.push(format!("{column} <= {ph}"));
        }
    }

    fn push_where(&self, sql: &mut String) {
        if !self.clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.clauses.join(" AND "));
        }
    }
}

/// Select matching products, or `None` when the requested window is empty
pub fn filter_query(filter: &ProductFilter) -> Option<BuiltQuery> {
    let (limit, offset) = filter.pagination.bounds()?;

    let mut predicates = Predicates::from_filter(filter);
    let mut sql = PRODUCT_SELECT.to_string();
    predicates.push_where(&mut sql);

    if let Some(sort) = filter.sort {
        sql.push_str(&format!(
            " ORDER BY {} {}, p.id",
            sort.field.column(),
            sort.direction.keyword()
        ));
    }
    if let Some(limit) = limit {
        let ph = predicates.placeholder(SqlArg::BigInt(limit));
        sql.push_str(&format!(" LIMIT {ph}"));
    }
    if let Some(offset) = offset {
        let ph = predicates.placeholder(SqlArg::BigInt(offset));
        sql.push_str(&format!(" OFFSET {ph}"));
    }

    Some(BuiltQuery {
        sql,
        args: predicates.args,
    })
}

/// Count matching products, ignoring sort and pagination
pub fn count_query(filter: &ProductFilter) -> BuiltQuery {
    let predicates = Predicates::from_filter(filter);
    let mut sql = PRODUCT_COUNT.to_string();
    predicates.push_where(&mut sql);
    BuiltQuery {
        sql,
        args: predicates.args,
    }
}

pub fn search_query(search: &ProductSearch) -> BuiltQuery {
    let (clause, arg) = match search {
        ProductSearch::Id(id) => ("p.id = $1", id.clone()),
        ProductSearch::Article(article) => ("p.article = $1", article.clone()),
        ProductSearch::Title(title) => (
            r"p.title ILIKE $1 ESCAPE '\'",
            format!("%{}%", escape_like(title)),
        ),
    };
    BuiltQuery {
        sql: format!("{PRODUCT_SELECT} WHERE {clause} ORDER BY p.title, p.id"),
        args: vec![SqlArg::Text(arg)],
    }
}

/// Escape LIKE metacharacters so input only ever matches literally
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
