//! HTML parsing and attribute extraction for product detail pages
//!
//! A page is parsed once into a [`ParsedPage`]; every attribute extractor then
//! works on that structured view together with an [`ExtractionContext`].
//! Extractors never fail: an attribute that cannot be found is `None` and the
//! page pipeline applies the documented default plus a warning.

pub mod blocking;
pub mod brand;
pub mod config;
pub mod context;
pub mod country;
pub mod dimensions;
pub mod material;
pub mod origin;
pub mod page;
pub mod text;
pub mod title;
pub mod units;
pub mod weight;

pub use blocking::BlockingDetector;
pub use brand::BrandExtractor;
pub use config::{CompiledSelectors, PageSelectors};
pub use context::ExtractionContext;
pub use country::CountryNormalizer;
pub use dimensions::DimensionsExtractor;
pub use material::MaterialExtractor;
pub use origin::OriginExtractor;
pub use page::{ParsedPage, SpecRow};
pub use title::TitleCleaner;
pub use weight::WeightExtractor;

/// A value produced by an extractor, tagged with the rule that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    pub value: T,
    /// Provenance tag, e.g. `spec_table:item_weight`
    pub source: String,
    /// Non-fatal observations made while accepting the value
    pub warnings: Vec<String>,
}

impl<T> Extracted<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            source: source.into(),
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// One attribute extractor over a parsed page
pub trait AttributeExtractor {
    type Output;

    /// Try the extractor's rules in priority order, stopping at the first success
    fn extract(&self, page: &ParsedPage, context: &ExtractionContext) -> Option<Extracted<Self::Output>>;
}
