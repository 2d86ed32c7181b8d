//! Last-resort estimate built from the URL alone
//!
//! Never fails. Keywords in the URL slug pick a material and weight; a known
//! brand in the slug picks an origin. The result is always scored as minimal
//! confidence and says so in its warnings.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::ExtractionStrategy;
use super::pipeline::elapsed_ms;
use crate::domain::category::ProductCategory;
use crate::domain::errors::ScrapeError;
use crate::domain::product::{
    ConfidenceLevel, DEFAULT_WEIGHT_KG, MaterialType, Recyclability, ScrapingResult, StrategyKind, UNKNOWN,
};
use crate::infrastructure::category_classifier::CategoryClassifier;
use crate::infrastructure::parsing::text::is_term_or_plural;
use crate::infrastructure::reference_data::ReferenceData;
use crate::infrastructure::url_validator::UrlValidator;

pub const PRIORITY: u8 = u8::MAX;

/// Fixed score of every fallback result
pub const FALLBACK_QUALITY: u8 = 35;

struct KeywordRule {
    name: &'static str,
    keywords: &'static [&'static str],
    material: MaterialType,
    weight_kg: f64,
    origin: Option<&'static str>,
}

/// Checked in order; the first rule with a keyword among the slug terms wins
const KEYWORD_RULES: &[KeywordRule] = &[
    KeywordRule {
        name: "supplement",
        keywords: &["protein", "whey", "supplement", "creatine", "vitamin", "collagen"],
        material: MaterialType::Plastic,
        weight_kg: 2.0,
        origin: None,
    },
    KeywordRule {
        name: "book",
        keywords: &["book", "novel", "paperback", "hardcover", "kindle"],
        material: MaterialType::Paper,
        weight_kg: 0.3,
        origin: None,
    },
    KeywordRule {
        name: "electronics",
        keywords: &["electronic", "phone", "laptop", "charger", "headphone", "bluetooth", "usb", "cable"],
        material: MaterialType::Mixed,
        weight_kg: 0.5,
        origin: Some("China"),
    },
    KeywordRule {
        name: "clothing",
        keywords: &["shirt", "dress", "jacket", "hoodie", "jeans", "socks", "clothing"],
        material: MaterialType::Fabric,
        weight_kg: 0.4,
        origin: None,
    },
    KeywordRule {
        name: "glassware",
        keywords: &["glass", "jar", "vase"],
        material: MaterialType::Glass,
        weight_kg: 0.6,
        origin: None,
    },
    KeywordRule {
        name: "metalware",
        keywords: &["steel", "aluminium", "aluminum", "flask", "cookware", "pan"],
        material: MaterialType::Metal,
        weight_kg: 0.8,
        origin: None,
    },
    KeywordRule {
        name: "toy",
        keywords: &["toy", "lego", "puzzle", "doll"],
        material: MaterialType::Plastic,
        weight_kg: 0.5,
        origin: Some("China"),
    },
    KeywordRule {
        name: "furniture",
        keywords: &["wooden", "wood", "furniture", "shelf", "table"],
        material: MaterialType::Wood,
        weight_kg: 5.0,
        origin: None,
    },
];

pub struct IntelligentFallback {
    data: Arc<ReferenceData>,
    validator: UrlValidator,
    classifier: CategoryClassifier,
}

impl IntelligentFallback {
    pub fn new(data: Arc<ReferenceData>) -> Self {
        Self {
            validator: UrlValidator::new(Arc::clone(&data)),
            classifier: CategoryClassifier::new(Arc::clone(&data)),
            data,
        }
    }

    /// Build the estimate; infallible
    pub fn estimate(&self, url: &str) -> ScrapingResult {
        let started = Instant::now();
        let asin = self.validator.extract_product_id(url).unwrap_or_else(|| UNKNOWN.to_string());
        let terms = self.validator.extract_search_terms(url);

        let mut result = ScrapingResult::unknown(asin, StrategyKind::IntelligentFallback);
        let category = self.classifier.detect(url, "", "");
        result.category = category.category;
        result.category_confidence = category.confidence;

        if !terms.is_empty() {
            result.title = terms.iter().map(|t| capitalize(t)).collect::<Vec<_>>().join(" ");
            result.data_sources.insert("title".to_string(), "url_slug".to_string());
        }

        match KEYWORD_RULES
            .iter()
            .find_map(|rule| {
                rule.keywords
                    .iter()
                    .find(|k| terms.iter().any(|term| is_term_or_plural(term, k)))
                    .map(|k| (rule, *k))
            })
        {
            Some((rule, keyword)) => {
                let source = format!("url_keywords:{}:{keyword}", rule.name);
                result.material_type = rule.material;
                result.weight_kg = rule.weight_kg;
                result.data_sources.insert("material".to_string(), source.clone());
                result.data_sources.insert("weight".to_string(), "fallback".to_string());
                if let Some(origin) = rule.origin {
                    result.origin = origin.to_string();
                    result.data_sources.insert("origin".to_string(), source);
                }
            }
            None => {
                let rules = self.classifier.rules(category.category);
                result.material_type = rules.default_material;
                result.weight_kg = if category.category == ProductCategory::General {
                    DEFAULT_WEIGHT_KG
                } else {
                    rules.weight_midpoint()
                };
                result.data_sources.insert("material".to_string(), "category_default".to_string());
                result.data_sources.insert("weight".to_string(), "fallback".to_string());
            }
        }

        if let Some((brand, country)) = self.brand_in(&terms) {
            result.brand = capitalize(&brand);
            result.origin = country;
            let source = format!("brand_map:{brand}");
            result.data_sources.insert("brand".to_string(), "url_slug".to_string());
            result.data_sources.insert("origin".to_string(), source);
        }

        result.recyclability = Recyclability::from_material(result.material_type);
        result.quality_score = FALLBACK_QUALITY;
        result.confidence_level = ConfidenceLevel::Minimal;
        result.warnings.push(
            "Real product data unavailable; values are estimated from URL keywords".to_string(),
        );
        result.extraction_time_ms = elapsed_ms(started);
        result
    }

    /// Longest brand key formed by one or two adjacent slug terms
    fn brand_in(&self, terms: &[String]) -> Option<(String, String)> {
        let pairs = terms.windows(2).map(|w| format!("{} {}", w[0], w[1]));
        pairs
            .chain(terms.iter().cloned())
            .find_map(|candidate| {
                self.data
                    .brand_origins
                    .get(&candidate)
                    .map(|country| (candidate.clone(), country.clone()))
            })
    }
}

fn capitalize(word: &str) -> String {
    word.split(' ')
        .map(|w| {
            let mut chars = w.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect::<String>())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl ExtractionStrategy for IntelligentFallback {
    fn kind(&self) -> StrategyKind {
        StrategyKind::IntelligentFallback
    }

    fn priority(&self) -> u8 {
        PRIORITY
    }

    fn can_handle(&self, _url: &str) -> bool {
        true
    }

    async fn scrape(&self, url: &str, _cancel: &CancellationToken) -> Result<ScrapingResult, ScrapeError> {
        let result = self.estimate(url);
        info!(url, material = %result.material_type, "Using URL-keyword estimate");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn fallback() -> IntelligentFallback {
        IntelligentFallback::new(Arc::new(ReferenceData::embedded().unwrap()))
    }

    #[rstest]
    #[case("https://www.amazon.co.uk/Whey-Protein-Powder-Chocolate/dp/B000QSNYGI", MaterialType::Plastic, 2.0)]
    #[case("https://www.amazon.co.uk/Great-Gatsby-Paperback-Book/dp/0141182636", MaterialType::Paper, 0.3)]
    #[case("https://www.amazon.co.uk/Steel-Water-Flask/dp/B0ABCDEFGH", MaterialType::Metal, 0.8)]
    fn keywords_drive_material_and_weight(#[case] url: &str, #[case] material: MaterialType, #[case] weight: f64) {
        let result = fallback().estimate(url);
        assert_eq!(result.material_type, material);
        assert!((result.weight_kg - weight).abs() < 1e-9);
        assert_eq!(result.quality_score, FALLBACK_QUALITY);
        assert_eq!(result.confidence_level, ConfidenceLevel::Minimal);
        assert!(!result.warnings.is_empty());
    }

    #[rstest]
    #[case("https://www.amazon.co.uk/Japanese-Ceramic-Teapot/dp/B0ABCDEFGH")]
    #[case("https://www.amazon.co.uk/Stable-Vegetable-Rack/dp/B0ABCDEFGH")]
    #[case("https://www.amazon.co.uk/Toyota-Floor-Mats/dp/B0ABCDEFGH")]
    #[case("https://www.amazon.co.uk/Husband-Birthday-Card/dp/B0ABCDEFGH")]
    #[case("https://www.amazon.co.uk/Polarised-Sunglasses/dp/B0ABCDEFGH")]
    fn keywords_inside_longer_words_do_not_match(#[case] url: &str) {
        let result = fallback().estimate(url);
        assert!(
            result.data_sources.get("material").is_some_and(|s| !s.starts_with("url_keywords")),
            "{url} matched {:?}",
            result.data_sources.get("material")
        );
    }

    #[test]
    fn electronics_default_to_china() {
        let result = fallback().estimate("https://www.amazon.co.uk/Wireless-Bluetooth-Headphones/dp/B0ABCDEFGH");
        assert_eq!(result.origin, "China");
        assert_eq!(result.material_type, MaterialType::Mixed);
    }

    #[test]
    fn title_and_asin_come_from_the_url() {
        let result = fallback().estimate("https://www.amazon.co.uk/Bamboo-Cutting-Board/dp/B0ABCDEFGH?tag=x");
        assert_eq!(result.asin, "B0ABCDEFGH");
        assert_eq!(result.title, "Bamboo Cutting Board");
    }

    #[test]
    fn garbage_input_still_yields_a_record() {
        let result = fallback().estimate("not even a url");
        assert_eq!(result.asin, UNKNOWN);
        assert_eq!(result.confidence_level, ConfidenceLevel::Minimal);
        assert!(result.weight_kg > 0.0);
    }

    #[tokio::test]
    async fn scrape_never_fails() {
        let result = fallback()
            .scrape("https://www.amazon.co.uk/dp/B000QSNYGI", &CancellationToken::new())
            .await;
        assert!(result.is_ok());
    }
}
