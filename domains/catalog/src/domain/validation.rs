//! Payload validation for the catalog service
//!
//! Each check returns the reason a payload is rejected; the service turns it
//! into a failed-precondition error.

use regex::Regex;

use crate::domain::entities::{Dictionary, ProductColorPhotos, ProductDraft};
use crate::domain::filter::{Pagination, ProductFilter};

lazy_static::lazy_static! {
    /// Identifier charset: ASCII alphanumerics, `-` and `_`, at most 64 characters
    pub static ref ID_REGEX: Regex = Regex::new(r"^[0-9A-Za-z_-]{1,64}$").unwrap();

    /// Product article: exactly 8 digits
    pub static ref ARTICLE_REGEX: Regex = Regex::new(r"^[0-9]{8}$").unwrap();
}

pub fn validate_id(id: &str) -> Result<(), String> {
    if id.is_empty() {
        return Err("id is empty".to_string());
    }
    if !ID_REGEX.is_match(id) {
        return Err(format!("id {id:?} has an invalid format"));
    }
    Ok(())
}

fn required(value: &str, what: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{what} is empty"));
    }
    Ok(())
}

/// Required fields per dictionary kind
pub fn validate_dictionary(entity: &Dictionary) -> Result<(), String> {
    validate_id(entity.id())?;
    match entity {
        Dictionary::Brand(b) => required(&b.title, "brand title"),
        Dictionary::Category(c) => {
            required(&c.title, "category title")?;
            required(&c.uri, "category uri")
        }
        Dictionary::Country(c) => required(&c.title, "country title"),
        Dictionary::Material(m) => required(&m.title, "material title"),
        Dictionary::Color(c) => {
            required(&c.title, "color title")?;
            required(&c.hex, "color hex")
        }
        Dictionary::Slide(s) => {
            required(&s.link, "slide link")?;
            required(&s.img, "slide img")?;
            required(&s.img762, "slide img762")
        }
        Dictionary::Article(a) => {
            required(&a.title, "article title")?;
            required(&a.img, "article img")
        }
    }
}

pub fn validate_product(draft: &ProductDraft) -> Result<(), String> {
    validate_id(&draft.id)?;
    required(&draft.title, "product title")?;
    if !ARTICLE_REGEX.is_match(&draft.article) {
        return Err("product article must be 8 digits".to_string());
    }
    validate_id(&draft.brand_id).map_err(|_| "brand id is invalid".to_string())?;
    validate_id(&draft.category_id).map_err(|_| "category id is invalid".to_string())?;
    validate_id(&draft.country_id).map_err(|_| "country id is invalid".to_string())?;
    if draft.price <= 0 {
        return Err("price must be greater than zero".to_string());
    }
    if draft.width <= 0 || draft.height <= 0 || draft.depth <= 0 {
        return Err("dimensions must be greater than zero".to_string());
    }
    if draft.photos.is_empty() {
        return Err("photos are empty".to_string());
    }
    for id in &draft.material_ids {
        validate_id(id).map_err(|_| "material id is invalid".to_string())?;
    }
    for id in &draft.color_ids {
        validate_id(id).map_err(|_| "color id is invalid".to_string())?;
    }
    for id in &draft.seem_ids {
        validate_id(id).map_err(|_| "seem id is invalid".to_string())?;
    }
    Ok(())
}

pub fn validate_color_photos(pcp: &ProductColorPhotos) -> Result<(), String> {
    validate_id(&pcp.product_id)?;
    validate_id(&pcp.color_id)?;
    if pcp.photos.is_empty() {
        return Err("photos are empty".to_string());
    }
    Ok(())
}

pub fn validate_range(start: i64, end: i64) -> Result<(), String> {
    if start < 0 || end <= start {
        return Err("range boundaries are invalid".to_string());
    }
    Ok(())
}

pub fn validate_filter(filter: &ProductFilter) -> Result<(), String> {
    match filter.pagination {
        Pagination::Page { limit, offset } if limit < 0 || offset < 0 => {
            Err("limit or offset cannot be negative".to_string())
        }
        Pagination::Window { start, .. } if start < 0 => {
            Err("window start cannot be negative".to_string())
        }
        _ => Ok(()),
    }
}
