//! Fetched HTML to `ScrapingResult`
//!
//! Shared by every page-backed strategy: blocking check, parse, classify,
//! then each attribute extractor in turn. Attributes that cannot be found get
//! their documented default and a warning; only a blocked page or a page with
//! no usable title fails the attempt.

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::errors::ScrapeError;
use crate::domain::product::{Recyclability, ScrapingResult, StrategyKind, UNKNOWN};
use crate::infrastructure::category_classifier::CategoryClassifier;
use crate::infrastructure::config::ExtractionConfig;
use crate::infrastructure::page_source::{FetchedPage, PageSource};
use crate::infrastructure::parsing::{
    AttributeExtractor, BlockingDetector, BrandExtractor, CompiledSelectors, DimensionsExtractor, Extracted,
    ExtractionContext, MaterialExtractor, OriginExtractor, PageSelectors, ParsedPage, TitleCleaner, WeightExtractor,
};
use crate::infrastructure::quality::apply_quality;
use crate::infrastructure::reference_data::ReferenceData;
use crate::infrastructure::url_validator::UrlValidator;

pub struct PagePipeline {
    selectors: CompiledSelectors,
    detector: BlockingDetector,
    classifier: CategoryClassifier,
    validator: UrlValidator,
    titles: TitleCleaner,
    brands: BrandExtractor,
    weights: WeightExtractor,
    materials: MaterialExtractor,
    origins: OriginExtractor,
    dimensions: DimensionsExtractor,
    settings: ExtractionConfig,
}

impl PagePipeline {
    pub fn new(data: Arc<ReferenceData>, settings: ExtractionConfig) -> Result<Self> {
        Self::with_selectors(data, settings, &PageSelectors::default())
    }

    pub fn with_selectors(data: Arc<ReferenceData>, settings: ExtractionConfig, selectors: &PageSelectors) -> Result<Self> {
        Ok(Self {
            selectors: CompiledSelectors::compile(selectors)?,
            detector: BlockingDetector::new(),
            classifier: CategoryClassifier::new(Arc::clone(&data)),
            validator: UrlValidator::new(Arc::clone(&data)),
            titles: TitleCleaner::new(),
            brands: BrandExtractor::new(),
            weights: WeightExtractor::with_reference_data(&data),
            materials: MaterialExtractor::new(),
            origins: OriginExtractor::new(data),
            dimensions: DimensionsExtractor::new(),
            settings,
        })
    }

    pub fn validator(&self) -> &UrlValidator {
        &self.validator
    }

    pub fn classifier(&self) -> &CategoryClassifier {
        &self.classifier
    }

    /// Load `fetch_url` through `source` and extract a result attributed to `url`
    pub async fn scrape_with(
        &self,
        source: &dyn PageSource,
        url: &str,
        fetch_url: &str,
        strategy: StrategyKind,
        cancel: &CancellationToken,
    ) -> Result<ScrapingResult, ScrapeError> {
        let started = Instant::now();
        let page = source.load(fetch_url, cancel).await?;
        let mut result = self.process(url, &page, strategy)?;
        result.extraction_time_ms = elapsed_ms(started);
        Ok(result)
    }

    /// Turn one fetched document into a scored result
    pub fn process(&self, url: &str, page: &FetchedPage, strategy: StrategyKind) -> Result<ScrapingResult, ScrapeError> {
        if let Some(reason) = self.detector.detect(&page.body) {
            info!(url, strategy = %strategy, reason = %reason, "Blocking page detected");
            return Err(ScrapeError::blocked(url, strategy, Some(page.status), reason));
        }
        self.extract(url, &page.body, strategy)
    }

    /// Extraction without the blocking check
    pub fn extract(&self, url: &str, html: &str, strategy: StrategyKind) -> Result<ScrapingResult, ScrapeError> {
        let parsed = ParsedPage::parse(html, &self.selectors);

        let preliminary = ExtractionContext::new(url, self.classifier.detect(url, "", ""), Default::default())
            .with_settings(self.settings.clone());
        let title = self
            .titles
            .extract(&parsed, &preliminary)
            .ok_or_else(|| ScrapeError::parsing(url, strategy, "page has no product title"))?;

        let category = self.classifier.detect(url, &title.value, &parsed.content_text());
        let rules = self.classifier.rules(category.category);
        debug!(
            url,
            category = %category.category,
            confidence = category.confidence,
            "Category detected"
        );

        let mut result = ScrapingResult::unknown(self.asin(url), strategy);
        result.category = category.category;
        result.category_confidence = category.confidence;
        record(&mut result, "title", title, |r, v| r.title = v);

        let mut context = ExtractionContext::new(url, category, rules.clone()).with_settings(self.settings.clone());

        match self.brands.extract(&parsed, &context) {
            Some(brand) => {
                context = context.with_brand(Some(brand.value.clone()));
                record(&mut result, "brand", brand, |r, v| r.brand = v);
            }
            None if !rules.brand_detection => {
                result.data_sources.insert("brand".to_string(), "not_applicable".to_string());
                if let Some(author) = self.brands.author(&parsed, self.settings.max_brand_length) {
                    result
                        .warnings
                        .push(format!("Byline names an author ({author}); brand left unknown"));
                }
            }
            None => result.warnings.push("Brand not found".to_string()),
        }

        let weight = self
            .weights
            .extract(&parsed, &context)
            .unwrap_or_else(|| self.weights.fallback(&context));
        record(&mut result, "weight", weight, |r, v| r.weight_kg = v);

        let material = self
            .materials
            .extract(&parsed, &context)
            .unwrap_or_else(|| self.materials.fallback(&context));
        record(&mut result, "material", material, |r, v| r.material_type = v);
        result.recyclability = Recyclability::from_material(result.material_type);
        result
            .data_sources
            .insert("recyclability".to_string(), "material".to_string());

        match self.origins.extract(&parsed, &context) {
            Some(origin) => record(&mut result, "origin", origin, |r, v| r.origin = v),
            None => {
                result.origin = UNKNOWN.to_string();
                result.warnings.push("Origin not found".to_string());
            }
        }

        let dimensions = self
            .dimensions
            .extract(&parsed, &context)
            .unwrap_or_else(|| self.dimensions.fallback());
        record(&mut result, "dimensions", dimensions, |r, v| r.dimensions_cm = v);

        apply_quality(&mut result, &rules);
        Ok(result)
    }

    fn asin(&self, url: &str) -> String {
        self.validator
            .parse(url)
            .map_or_else(|_| UNKNOWN.to_string(), |product| product.product_id)
    }
}

/// Store an extracted value, its provenance and its warnings on the result
fn record<T>(result: &mut ScrapingResult, field: &str, found: Extracted<T>, set: impl FnOnce(&mut ScrapingResult, T)) {
    result.data_sources.insert(field.to_string(), found.source);
    result.warnings.extend(found.warnings);
    set(result, found.value);
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::product::{ConfidenceLevel, MaterialType};

    const URL: &str = "https://www.amazon.co.uk/Optimum-Nutrition-Standard-Protein/dp/B000QSNYGI";

    fn pipeline() -> PagePipeline {
        let data = Arc::new(ReferenceData::embedded().unwrap());
        PagePipeline::new(data, ExtractionConfig::default()).unwrap()
    }

    fn product_page(title: &str, rows: &str, bullets: &str) -> String {
        format!(
            r#"<html><head><title>Amazon.co.uk: {title}</title></head><body>
            <span id="productTitle">{title}</span>
            <a id="bylineInfo">Visit the Optimum Nutrition Store</a>
            <div id="feature-bullets"><ul>{bullets}</ul></div>
            <table id="productDetails_techSpec_section_1">{rows}</table>
            <div id="productDescription"><p>Whey protein powder for muscle recovery after training.</p></div>
            {padding}
            </body></html>"#,
            padding = "<p>Product information and customer questions.</p>".repeat(10)
        )
    }

    #[test]
    fn spec_table_weight_wins_over_protein_in_title() {
        let html = product_page(
            "Optimum Nutrition Gold Standard Whey 25g Protein Powder",
            "<tr><th>Item Weight</th><td>727 g</td></tr><tr><th>Country of origin</th><td>United States</td></tr>",
            "<li>Delivered in a plastic tub</li>",
        );
        let result = pipeline().extract(URL, &html, StrategyKind::DirectFetch).unwrap();

        assert!((result.weight_kg - 0.727).abs() < 1e-9);
        assert_eq!(result.source_of("weight"), Some("spec_table:item_weight"));
        assert_eq!(result.brand, "Optimum Nutrition");
        assert_eq!(result.asin, "B000QSNYGI");
        assert_eq!(result.material_type, MaterialType::Plastic);
        assert_eq!(result.recyclability, Recyclability::Medium);
        assert!(result.has_known_origin());
    }

    #[test]
    fn blocked_page_is_an_error_not_a_result() {
        let html = format!(
            "<html><head><title>Robot Check</title></head><body><p>Please verify you are human</p>{}</body></html>",
            "<p>filler</p>".repeat(60)
        );
        let page = FetchedPage::new(URL, 200, html);
        let err = pipeline().process(URL, &page, StrategyKind::DirectFetch).unwrap_err();
        assert!(err.is_blocked());
    }

    #[test]
    fn page_without_title_is_a_parsing_failure() {
        let html = format!("<html><body>{}</body></html>", "<p>nothing useful here</p>".repeat(40));
        let err = pipeline().extract(URL, &html, StrategyKind::DirectFetch).unwrap_err();
        assert!(matches!(err, ScrapeError::ParsingFailure { .. }));
    }

    #[test]
    fn missing_attributes_get_defaults_and_warnings() {
        let html = product_page("Plain Storage Thing", "", "");
        let result = pipeline()
            .extract("https://www.amazon.co.uk/dp/B0ABCDEFGH", &html, StrategyKind::DirectFetch)
            .unwrap();
        assert_eq!(result.dimensions_cm, [10.0, 10.0, 10.0]);
        assert!(result.warnings.iter().any(|w| w.contains("Dimensions")));
        assert!(result.quality_score <= 100);
        assert_ne!(result.confidence_level, ConfidenceLevel::High);
    }
}
