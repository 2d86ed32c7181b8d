//! Static reference tables consulted by the extractors
//!
//! The tables ship as JSON under `data/` and are embedded at compile time.
//! `ReferenceData::from_dir` swaps in replacement files so the tables can be
//! extended without touching extractor logic.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::domain::category::{CategoryRules, ProductCategory};

const CATEGORIES_JSON: &str = include_str!("../../data/categories.json");
const BRAND_ORIGINS_JSON: &str = include_str!("../../data/brand_origins.json");
const COUNTRY_ALIASES_JSON: &str = include_str!("../../data/country_aliases.json");
const COUNTRY_INDICATORS_JSON: &str = include_str!("../../data/country_indicators.json");
const URL_RULES_JSON: &str = include_str!("../../data/url_rules.json");

/// URL patterns, title keywords and rules for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTable {
    pub category: ProductCategory,
    pub url_patterns: Vec<String>,
    pub keywords: Vec<String>,
    pub rules: CategoryRules,
}

/// Address hints used to derive a country from manufacturer contact text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryIndicators {
    pub country: String,
    pub keywords: Vec<String>,
    pub cities: Vec<String>,
    #[serde(default)]
    pub postal_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlRules {
    pub supported_domains: Vec<String>,
    /// Query keys to strip; a trailing `*` marks a prefix match
    pub tracking_params: Vec<String>,
}

/// All static tables in one immutable bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceData {
    pub categories: Vec<CategoryTable>,
    /// Lower-case brand -> canonical country
    pub brand_origins: BTreeMap<String, String>,
    /// Lower-case alias -> canonical country
    pub country_aliases: BTreeMap<String, String>,
    pub country_indicators: Vec<CountryIndicators>,
    pub url_rules: UrlRules,
}

impl ReferenceData {
    /// Parse the tables embedded in the binary
    pub fn embedded() -> Result<Self> {
        Self::from_sources(
            CATEGORIES_JSON,
            BRAND_ORIGINS_JSON,
            COUNTRY_ALIASES_JSON,
            COUNTRY_INDICATORS_JSON,
            URL_RULES_JSON,
        )
    }

    /// Load tables from a directory; files that are absent fall back to the embedded copy
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let read = |name: &str, embedded: &'static str| -> Result<String> {
            let path = dir.join(name);
            if path.exists() {
                info!("Loading reference table from {:?}", path);
                std::fs::read_to_string(&path).with_context(|| format!("Failed to read reference table {path:?}"))
            } else {
                Ok(embedded.to_string())
            }
        };

        Self::from_sources(
            &read("categories.json", CATEGORIES_JSON)?,
            &read("brand_origins.json", BRAND_ORIGINS_JSON)?,
            &read("country_aliases.json", COUNTRY_ALIASES_JSON)?,
            &read("country_indicators.json", COUNTRY_INDICATORS_JSON)?,
            &read("url_rules.json", URL_RULES_JSON)?,
        )
    }

    fn from_sources(
        categories: &str,
        brand_origins: &str,
        country_aliases: &str,
        country_indicators: &str,
        url_rules: &str,
    ) -> Result<Self> {
        let categories: Vec<CategoryTable> =
            serde_json::from_str(categories).context("Invalid categories table")?;
        let brand_origins: BTreeMap<String, String> =
            serde_json::from_str(brand_origins).context("Invalid brand origins table")?;
        let country_aliases: BTreeMap<String, String> =
            serde_json::from_str(country_aliases).context("Invalid country aliases table")?;
        let country_indicators: Vec<CountryIndicators> =
            serde_json::from_str(country_indicators).context("Invalid country indicators table")?;
        let url_rules: UrlRules = serde_json::from_str(url_rules).context("Invalid URL rules table")?;

        Ok(Self {
            categories,
            brand_origins: lowercase_keys(brand_origins),
            country_aliases: lowercase_keys(country_aliases),
            country_indicators,
            url_rules,
        })
    }

    pub fn category_table(&self, category: ProductCategory) -> Option<&CategoryTable> {
        self.categories.iter().find(|t| t.category == category)
    }

    /// Rules for a category, falling back to the general rules and then to defaults
    pub fn rules(&self, category: ProductCategory) -> CategoryRules {
        self.category_table(category)
            .or_else(|| self.category_table(ProductCategory::General))
            .map(|t| t.rules.clone())
            .unwrap_or_default()
    }
}

fn lowercase_keys(map: BTreeMap<String, String>) -> BTreeMap<String, String> {
    map.into_iter().map(|(k, v)| (k.trim().to_lowercase(), v)).collect()
}
