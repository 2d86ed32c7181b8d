//! Product category value objects
//!
//! Categories parameterize the attribute extractors: expected weight range,
//! whether a byline is a brand or an author, and the default material.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::product::MaterialType;

/// Coarse product category inferred from URL, title and page content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Books,
    Electronics,
    Health,
    Home,
    Clothing,
    Toys,
    Automotive,
    Food,
    General,
}

impl ProductCategory {
    /// All categories in definition order; used for tie-breaking
    pub const ALL: [ProductCategory; 9] = [
        ProductCategory::Books,
        ProductCategory::Electronics,
        ProductCategory::Health,
        ProductCategory::Home,
        ProductCategory::Clothing,
        ProductCategory::Toys,
        ProductCategory::Automotive,
        ProductCategory::Food,
        ProductCategory::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Books => "books",
            Self::Electronics => "electronics",
            Self::Health => "health",
            Self::Home => "home",
            Self::Clothing => "clothing",
            Self::Toys => "toys",
            Self::Automotive => "automotive",
            Self::Food => "food",
            Self::General => "general",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| format!("unknown product category: {s}"))
    }
}

/// Which classifier step produced the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    UrlPattern,
    TitleKeywords,
    PageContent,
    Default,
}

/// Result of category detection for a single page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub category: ProductCategory,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    pub detection_method: DetectionMethod,
    /// Patterns or keywords that matched
    pub evidence: Vec<String>,
}

impl CategoryInfo {
    pub fn general() -> Self {
        Self {
            category: ProductCategory::General,
            confidence: 0.0,
            detection_method: DetectionMethod::Default,
            evidence: Vec::new(),
        }
    }
}

/// Static per-category configuration consulted by the extractors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRules {
    /// False where the byline names an author rather than a manufacturer
    pub brand_detection: bool,
    /// Plausible `(min_kg, max_kg)` for a product of this category
    pub weight_range_kg: (f64, f64),
    pub default_material: MaterialType,
    /// Regexes for label text that must never be read as package weight
    #[serde(default)]
    pub nutritional_exclusions: Vec<String>,
}

impl CategoryRules {
    pub fn weight_midpoint(&self) -> f64 {
        let (min, max) = self.weight_range_kg;
        (min + max) / 2.0
    }

    pub fn weight_in_range(&self, weight_kg: f64) -> bool {
        let (min, max) = self.weight_range_kg;
        weight_kg >= min && weight_kg <= max
    }

    /// True when the weight is beyond `factor` times either end of the range
    pub fn is_weight_outlier(&self, weight_kg: f64, factor: f64) -> bool {
        let (min, max) = self.weight_range_kg;
        weight_kg > max * factor || weight_kg < min / factor
    }
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            brand_detection: true,
            weight_range_kg: (0.01, 100.0),
            default_material: MaterialType::Mixed,
            nutritional_exclusions: Vec::new(),
        }
    }
}
