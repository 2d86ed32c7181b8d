//! Scraped product record and its value types
//!
//! `ScrapingResult` is always fully populated. Unknown attributes carry
//! explicit sentinel values rather than being absent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::category::ProductCategory;
use super::events::ScrapeEvent;

/// Sentinel for unknown text attributes (brand, origin)
pub const UNKNOWN: &str = "Unknown";

/// Weight used when neither extraction nor category defaults apply
pub const DEFAULT_WEIGHT_KG: f64 = 1.0;

/// Dimensions used when none can be extracted
pub const DEFAULT_DIMENSIONS_CM: [f64; 3] = [10.0, 10.0, 10.0];

/// Packaging/product material vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialType {
    Plastic,
    Metal,
    Glass,
    Paper,
    Cardboard,
    Fabric,
    Wood,
    Mixed,
    Unknown,
}

impl MaterialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plastic => "Plastic",
            Self::Metal => "Metal",
            Self::Glass => "Glass",
            Self::Paper => "Paper",
            Self::Cardboard => "Cardboard",
            Self::Fabric => "Fabric",
            Self::Wood => "Wood",
            Self::Mixed => "Mixed",
            Self::Unknown => "Unknown",
        }
    }

    /// True for a concrete material (not Mixed/Unknown)
    pub fn is_specific(&self) -> bool {
        !matches!(self, Self::Mixed | Self::Unknown)
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse end-of-life recyclability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recyclability {
    High,
    Medium,
    Low,
    Unknown,
}

impl Recyclability {
    pub fn from_material(material: MaterialType) -> Self {
        match material {
            MaterialType::Glass | MaterialType::Metal | MaterialType::Paper => Self::High,
            MaterialType::Plastic | MaterialType::Wood | MaterialType::Cardboard => Self::Medium,
            MaterialType::Fabric | MaterialType::Mixed => Self::Low,
            MaterialType::Unknown => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Recyclability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse trust bucket derived from the quality score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Minimal,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::High,
            60..=79 => Self::Medium,
            40..=59 => Self::Low,
            _ => Self::Minimal,
        }
    }
}

/// Extraction strategy identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectFetch,
    StealthBrowser,
    MobileEmulation,
    IntelligentFallback,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectFetch => "direct_fetch",
            Self::StealthBrowser => "stealth_browser",
            Self::MobileEmulation => "mobile_emulation",
            Self::IntelligentFallback => "intelligent_fallback",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured product record produced by every strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapingResult {
    pub title: String,
    pub brand: String,
    /// Canonical country name or `"Unknown"`
    pub origin: String,
    pub weight_kg: f64,
    pub dimensions_cm: [f64; 3],
    pub material_type: MaterialType,
    pub recyclability: Recyclability,
    pub asin: String,
    pub category: ProductCategory,
    pub category_confidence: f64,
    pub quality_score: u8,
    pub confidence_level: ConfidenceLevel,
    pub strategy_used: StrategyKind,
    pub extraction_time_ms: u64,
    /// Field name -> provenance tag of the rule that produced it
    pub data_sources: BTreeMap<String, String>,
    pub warnings: Vec<String>,
    pub errors_encountered: Vec<String>,
    /// One entry per strategy attempted by the orchestrator
    pub attempts: Vec<ScrapeEvent>,
    pub cache_hit: bool,
}

impl ScrapingResult {
    /// A record with every field at its sentinel default
    pub fn unknown(asin: impl Into<String>, strategy: StrategyKind) -> Self {
        Self {
            title: UNKNOWN.to_string(),
            brand: UNKNOWN.to_string(),
            origin: UNKNOWN.to_string(),
            weight_kg: DEFAULT_WEIGHT_KG,
            dimensions_cm: DEFAULT_DIMENSIONS_CM,
            material_type: MaterialType::Unknown,
            recyclability: Recyclability::Unknown,
            asin: asin.into(),
            category: ProductCategory::General,
            category_confidence: 0.0,
            quality_score: 0,
            confidence_level: ConfidenceLevel::Minimal,
            strategy_used: strategy,
            extraction_time_ms: 0,
            data_sources: BTreeMap::new(),
            warnings: Vec::new(),
            errors_encountered: Vec::new(),
            attempts: Vec::new(),
            cache_hit: false,
        }
    }

    pub fn source_of(&self, field: &str) -> Option<&str> {
        self.data_sources.get(field).map(String::as_str)
    }

    pub fn has_known_origin(&self) -> bool {
        self.origin != UNKNOWN
    }

    pub fn has_known_brand(&self) -> bool {
        self.brand != UNKNOWN && !self.brand.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(100, ConfidenceLevel::High)]
    #[case(80, ConfidenceLevel::High)]
    #[case(79, ConfidenceLevel::Medium)]
    #[case(60, ConfidenceLevel::Medium)]
    #[case(59, ConfidenceLevel::Low)]
    #[case(40, ConfidenceLevel::Low)]
    #[case(39, ConfidenceLevel::Minimal)]
    #[case(0, ConfidenceLevel::Minimal)]
    fn confidence_buckets(#[case] score: u8, #[case] expected: ConfidenceLevel) {
        assert_eq!(ConfidenceLevel::from_score(score), expected);
    }

    #[test]
    fn unknown_record_is_fully_populated() {
        let result = ScrapingResult::unknown("B000000000", StrategyKind::IntelligentFallback);
        assert_eq!(result.origin, UNKNOWN);
        assert_eq!(result.weight_kg, DEFAULT_WEIGHT_KG);
        assert_eq!(result.dimensions_cm, DEFAULT_DIMENSIONS_CM);
        assert!(!result.has_known_brand());
        assert_eq!(result.recyclability, Recyclability::Unknown);
    }

    #[test]
    fn recyclability_follows_material() {
        assert_eq!(Recyclability::from_material(MaterialType::Glass), Recyclability::High);
        assert_eq!(Recyclability::from_material(MaterialType::Plastic), Recyclability::Medium);
        assert_eq!(Recyclability::from_material(MaterialType::Mixed), Recyclability::Low);
    }
}
