//! Per-page context handed to every attribute extractor

use crate::domain::category::{CategoryInfo, CategoryRules, ProductCategory};
use crate::infrastructure::config::ExtractionConfig;

/// What the extractors know about the page beyond its HTML
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    /// Product URL being parsed
    pub url: String,

    /// Detected category and the rules it implies
    pub category: CategoryInfo,
    pub rules: CategoryRules,

    /// Brand found earlier in the pipeline, consulted by origin lookup
    pub brand: Option<String>,

    /// Numeric thresholds shared by the extractors
    pub settings: ExtractionConfig,
}

impl ExtractionContext {
    pub fn new(url: impl Into<String>, category: CategoryInfo, rules: CategoryRules) -> Self {
        Self {
            url: url.into(),
            category,
            rules,
            brand: None,
            settings: ExtractionConfig::default(),
        }
    }

    pub fn with_settings(mut self, settings: ExtractionConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_brand(mut self, brand: Option<String>) -> Self {
        self.brand = brand;
        self
    }

    pub fn category(&self) -> ProductCategory {
        self.category.category
    }

    /// A context for the general category with default rules
    #[cfg(test)]
    pub fn general(url: &str) -> Self {
        Self::new(url, CategoryInfo::general(), CategoryRules::default())
    }
}
