//! Domain entities for the Volha catalog
//!
//! Dictionary entities (brand, category, country, material, color, slide,
//! article) are small lookup records; the product is the aggregate root that
//! references them.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use volha_common::RepositoryError;

/// Generate a new time-sortable identifier
pub fn new_id() -> String {
    Uuid::now_v7().simple().to_string()
}

/// Dictionary entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DictionaryKind {
    Brand,
    Category,
    Country,
    Material,
    Color,
    Slide,
    Article,
}

impl DictionaryKind {
    pub const ALL: [DictionaryKind; 7] = [
        DictionaryKind::Brand,
        DictionaryKind::Category,
        DictionaryKind::Country,
        DictionaryKind::Material,
        DictionaryKind::Color,
        DictionaryKind::Slide,
        DictionaryKind::Article,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DictionaryKind::Brand => "brand",
            DictionaryKind::Category => "category",
            DictionaryKind::Country => "country",
            DictionaryKind::Material => "material",
            DictionaryKind::Color => "color",
            DictionaryKind::Slide => "slide",
            DictionaryKind::Article => "article",
        }
    }
}

impl fmt::Display for DictionaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DictionaryKind {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DictionaryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| RepositoryError::UnknownType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Brand {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: String,
    pub title: String,
    pub uri: String,
    pub img: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Country {
    pub id: String,
    pub title: String,
    pub friendly: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Material {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Color {
    pub id: String,
    pub title: String,
    pub hex: String,
}

/// Home page carousel slide
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Slide {
    pub id: String,
    pub link: String,
    pub img: String,
    /// Image variant for narrow (762px) viewports
    pub img762: String,
}

/// Blog article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub img: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Article {
    pub fn new(id: String, title: String, img: String, text: String) -> Self {
        Self {
            id,
            title,
            img,
            text,
            // Postgres keeps microseconds
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

/// Any dictionary entity, tagged by its kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Dictionary {
    Brand(Brand),
    Category(Category),
    Country(Country),
    Material(Material),
    Color(Color),
    Slide(Slide),
    Article(Article),
}

impl Dictionary {
    pub fn kind(&self) -> DictionaryKind {
        match self {
            Dictionary::Brand(_) => DictionaryKind::Brand,
            Dictionary::Category(_) => DictionaryKind::Category,
            Dictionary::Country(_) => DictionaryKind::Country,
            Dictionary::Material(_) => DictionaryKind::Material,
            Dictionary::Color(_) => DictionaryKind::Color,
            Dictionary::Slide(_) => DictionaryKind::Slide,
            Dictionary::Article(_) => DictionaryKind::Article,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Dictionary::Brand(e) => &e.id,
            Dictionary::Category(e) => &e.id,
            Dictionary::Country(e) => &e.id,
            Dictionary::Material(e) => &e.id,
            Dictionary::Color(e) => &e.id,
            Dictionary::Slide(e) => &e.id,
            Dictionary::Article(e) => &e.id,
        }
    }

    /// Decode an untyped payload as an entity of `kind`.
    ///
    /// A payload that does not have the shape of `kind` is `InvalidType`.
    pub fn decode(kind: DictionaryKind, payload: serde_json::Value) -> Result<Self, RepositoryError> {
        fn shape<T: serde::de::DeserializeOwned>(
            kind: DictionaryKind,
            payload: serde_json::Value,
        ) -> Result<T, RepositoryError> {
            serde_json::from_value(payload).map_err(|_| RepositoryError::InvalidType {
                expected: kind.as_str(),
                found: "unrecognized payload",
            })
        }

        Ok(match kind {
            DictionaryKind::Brand => Dictionary::Brand(shape(kind, payload)?),
            DictionaryKind::Category => Dictionary::Category(shape(kind, payload)?),
            DictionaryKind::Country => Dictionary::Country(shape(kind, payload)?),
            DictionaryKind::Material => Dictionary::Material(shape(kind, payload)?),
            DictionaryKind::Color => Dictionary::Color(shape(kind, payload)?),
            DictionaryKind::Slide => Dictionary::Slide(shape(kind, payload)?),
            DictionaryKind::Article => Dictionary::Article(shape(kind, payload)?),
        })
    }
}

/// Similar product as embedded in another product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarProduct {
    pub id: String,
    pub title: String,
    pub article: String,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub photos: Vec<String>,
    pub price: i32,
    pub description: String,
}

/// Product read model with every reference hydrated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    /// 8-digit lookup code
    pub article: String,
    pub brand: Brand,
    pub category: Category,
    pub country: Country,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub materials: Vec<Material>,
    pub colors: Vec<Color>,
    pub photos: Vec<String>,
    pub seems: Vec<SimilarProduct>,
    /// Price in the smallest currency unit
    pub price: i32,
    pub description: String,
    pub views: i32,
    pub is_favorite: bool,
}

/// Product write model: scalars plus reference identifiers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProductDraft {
    pub id: String,
    pub title: String,
    pub article: String,
    pub brand_id: String,
    pub category_id: String,
    pub country_id: String,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
    pub material_ids: Vec<String>,
    pub color_ids: Vec<String>,
    pub photos: Vec<String>,
    pub seem_ids: Vec<String>,
    pub price: i32,
    pub description: String,
    pub is_favorite: bool,
}

/// Photos of a product in one of its colors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductColorPhotos {
    pub product_id: String,
    pub color_id: String,
    pub photos: Vec<String>,
}

/// Every dictionary list plus product extrema, for faceted search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionaries {
    pub brands: Vec<Brand>,
    pub categories: Vec<Category>,
    pub countries: Vec<Country>,
    pub materials: Vec<Material>,
    pub colors: Vec<Color>,
    pub min_price: i32,
    pub max_price: i32,
    pub min_width: i32,
    pub max_width: i32,
    pub min_height: i32,
    pub max_height: i32,
    pub min_depth: i32,
    pub max_depth: i32,
}
