//! Validated product URL value objects

use serde::{Deserialize, Serialize};

/// A URL that passed validation and carries a product identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUrl {
    pub raw: String,
    /// Host without a leading `www.`
    pub domain: String,
    /// Matched product-detail path segment, e.g. `/dp/B0XXXXXXXX`
    pub path_segment: String,
    /// Fixed-length alphanumeric identifier (ASIN), upper-cased
    pub product_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlType {
    ProductDetail,
    Search,
    Other,
}

/// Outcome of `UrlValidator::validate`; never an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlValidation {
    pub is_valid: bool,
    pub domain: Option<String>,
    pub url_type: UrlType,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlVariant {
    Direct,
    Cleaned,
    Mobile,
    SearchFallback,
}

/// One candidate URL to fetch, ordered by `priority` (lower first)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCandidate {
    pub variant: UrlVariant,
    pub url: String,
    pub priority: u8,
}
