//! Row mapping for dictionary entities
//!
//! Each dictionary type declares its table, its columns in bind order and how
//! to bind its values. The dictionary repository builds every statement from
//! these constants, so table and column names never come from callers.

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{FromRow, Postgres};
use volha_common::RepositoryError;

use crate::domain::entities::{
    Article, Brand, Category, Color, Country, Dictionary, DictionaryKind, Material, Slide,
};

pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

pub trait DictionaryRecord: for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + Sized {
    const KIND: DictionaryKind;
    const TABLE: &'static str;
    /// Column names in bind order, `id` first
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> &str;

    /// Bind every column value in `COLUMNS` order
    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;

    fn into_dictionary(self) -> Dictionary;
}

pub fn select_all_sql<E: DictionaryRecord>() -> String {
    format!("SELECT {} FROM {} ORDER BY id", E::COLUMNS.join(", "), E::TABLE)
}

pub fn select_one_sql<E: DictionaryRecord>() -> String {
    format!("SELECT {} FROM {} WHERE id = $1", E::COLUMNS.join(", "), E::TABLE)
}

pub fn insert_sql<E: DictionaryRecord>() -> String {
    let placeholders: Vec<String> = (1..=E::COLUMNS.len()).map(|n| format!("${n}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        E::TABLE,
        E::COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

pub fn update_sql<E: DictionaryRecord>() -> String {
    let assignments: Vec<String> = E::COLUMNS
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, column)| format!("{column} = ${}", i + 1))
        .collect();
    format!(
        "UPDATE {} SET {} WHERE id = $1",
        E::TABLE,
        assignments.join(", ")
    )
}

pub fn delete_sql<E: DictionaryRecord>() -> String {
    format!("DELETE FROM {} WHERE id = $1", E::TABLE)
}

/// Decode a single looked-up row; no row is `NotFound`
pub fn scan_one<E: DictionaryRecord>(row: Option<PgRow>) -> Result<E, RepositoryError> {
    let row = row.ok_or(RepositoryError::NotFound)?;
    Ok(E::from_row(&row)?)
}

/// Decode every row, failing on the first one that does not fit `E`
pub fn scan_many<E: DictionaryRecord>(rows: &[PgRow]) -> Result<Vec<E>, RepositoryError> {
    rows.iter()
        .map(|row| E::from_row(row).map_err(RepositoryError::from))
        .collect()
}

impl DictionaryRecord for Brand {
    const KIND: DictionaryKind = DictionaryKind::Brand;
    const TABLE: &'static str = "brands";
    const COLUMNS: &'static [&'static str] = &["id", "title"];

    fn id(&self) -> &str {
        &self.id
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(&self.id).bind(&self.title)
    }

    fn into_dictionary(self) -> Dictionary {
        Dictionary::Brand(self)
    }
}

impl DictionaryRecord for Category {
    const KIND: DictionaryKind = DictionaryKind::Category;
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static [&'static str] = &["id", "title", "uri", "img"];

    fn id(&self) -> &str {
        &self.id
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.id)
            .bind(&self.title)
            .bind(&self.uri)
            .bind(&self.img)
    }

    fn into_dictionary(self) -> Dictionary {
        Dictionary::Category(self)
    }
}

impl DictionaryRecord for Country {
    const KIND: DictionaryKind = DictionaryKind::Country;
    const TABLE: &'static str = "countries";
    const COLUMNS: &'static [&'static str] = &["id", "title", "friendly"];

    fn id(&self) -> &str {
        &self.id
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(&self.id).bind(&self.title).bind(&self.friendly)
    }

    fn into_dictionary(self) -> Dictionary {
        Dictionary::Country(self)
    }
}

impl DictionaryRecord for Material {
    const KIND: DictionaryKind = DictionaryKind::Material;
    const TABLE: &'static str = "materials";
    const COLUMNS: &'static [&'static str] = &["id", "title"];

    fn id(&self) -> &str {
        &self.id
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(&self.id).bind(&self.title)
    }

    fn into_dictionary(self) -> Dictionary {
        Dictionary::Material(self)
    }
}

impl DictionaryRecord for Color {
    const KIND: DictionaryKind = DictionaryKind::Color;
    const TABLE: &'static str = "colors";
    const COLUMNS: &'static [&'static str] = &["id", "title", "hex"];

    fn id(&self) -> &str {
        &self.id
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(&self.id).bind(&self.title).bind(&self.hex)
    }

    fn into_dictionary(self) -> Dictionary {
        Dictionary::Color(self)
    }
}

impl DictionaryRecord for Slide {
    const KIND: DictionaryKind = DictionaryKind::Slide;
    const TABLE: &'static str = "slides";
    const COLUMNS: &'static [&'static str] = &["id", "link", "img", "img762"];

    fn id(&self) -> &str {
        &self.id
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.id)
            .bind(&self.link)
            .bind(&self.img)
            .bind(&self.img762)
    }

    fn into_dictionary(self) -> Dictionary {
        Dictionary::Slide(self)
    }
}

impl DictionaryRecord for Article {
    const KIND: DictionaryKind = DictionaryKind::Article;
    const TABLE: &'static str = "articles";
    const COLUMNS: &'static [&'static str] = &["id", "title", "img", "text", "created_at"];

    fn id(&self) -> &str {
        &self.id
    }

    fn bind_columns<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.id)
            .bind(&self.title)
            .bind(&self.img)
            .bind(&self.text)
            .bind(self.created_at)
    }

    fn into_dictionary(self) -> Dictionary {
        Dictionary::Article(self)
    }
}
