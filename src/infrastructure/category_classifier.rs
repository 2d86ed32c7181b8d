//! Product category detection
//!
//! Three ordered steps (URL patterns, title keywords, page content), each with
//! its own confidence formula. A later step only replaces the current choice
//! when it is strictly more confident.

use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::domain::category::{CategoryInfo, CategoryRules, DetectionMethod, ProductCategory};
use crate::infrastructure::parsing::text::{contains_word, is_term_or_plural};
use crate::infrastructure::reference_data::{CategoryTable, ReferenceData};

/// URL confidence at which title and content are not consulted
pub const URL_SHORT_CIRCUIT_CONFIDENCE: f64 = 0.9;

const URL_BASE: f64 = 0.5;
const URL_PER_MATCH: f64 = 0.2;
const URL_CAP: f64 = 0.95;
const TITLE_BASE: f64 = 0.3;
const TITLE_SPAN: f64 = 0.5;
const TITLE_CAP: f64 = 0.8;
const CONTENT_PENALTY: f64 = 0.7;
const CONTENT_CAP: f64 = 0.6;

pub struct CategoryClassifier {
    data: Arc<ReferenceData>,
}

impl CategoryClassifier {
    pub fn new(data: Arc<ReferenceData>) -> Self {
        Self { data }
    }

    /// Detect a category from the URL, the title and descriptive page text
    pub fn detect(&self, url: &str, title: &str, page_content: &str) -> CategoryInfo {
        let mut best = CategoryInfo::general();

        if let Some(by_url) = self.detect_from_url(url) {
            best = by_url;
            if best.confidence >= URL_SHORT_CIRCUIT_CONFIDENCE {
                debug!("Category {} from URL ({:.2})", best.category, best.confidence);
                return best;
            }
        }

        if let Some(by_title) = self.detect_from_keywords(title, DetectionMethod::TitleKeywords) {
            if by_title.confidence > best.confidence {
                best = by_title;
            }
        }

        if let Some(by_content) = self.detect_from_keywords(page_content, DetectionMethod::PageContent) {
            if by_content.confidence > best.confidence {
                best = by_content;
            }
        }

        debug!(
            "Category {} via {:?} ({:.2})",
            best.category, best.detection_method, best.confidence
        );
        best
    }

    /// Static rules for a category, always defined
    pub fn rules(&self, category: ProductCategory) -> CategoryRules {
        self.data.rules(category)
    }

    fn detect_from_url(&self, url: &str) -> Option<CategoryInfo> {
        let url = UrlText::parse(url)?;
        let mut best: Option<CategoryInfo> = None;

        for table in self.tables() {
            let evidence: Vec<String> = table
                .url_patterns
                .iter()
                .filter(|p| url.matches(&p.to_lowercase()))
                .cloned()
                .collect();
            if evidence.is_empty() {
                continue;
            }
            let confidence = (URL_BASE + URL_PER_MATCH * evidence.len() as f64).min(URL_CAP);
            if best.as_ref().is_none_or(|b| confidence > b.confidence) {
                best = Some(CategoryInfo {
                    category: table.category,
                    confidence,
                    detection_method: DetectionMethod::UrlPattern,
                    evidence,
                });
            }
        }
        best
    }

    fn detect_from_keywords(&self, text: &str, method: DetectionMethod) -> Option<CategoryInfo> {
        if text.trim().is_empty() {
            return None;
        }
        let text = text.to_lowercase();
        let mut best: Option<CategoryInfo> = None;

        for table in self.tables() {
            if table.keywords.is_empty() {
                continue;
            }
            let evidence: Vec<String> = table
                .keywords
                .iter()
                .filter(|k| contains_word(&text, &k.to_lowercase()))
                .cloned()
                .collect();
            if evidence.is_empty() {
                continue;
            }
            let ratio = evidence.len() as f64 / table.keywords.len() as f64;
            let raw = TITLE_BASE + TITLE_SPAN * ratio;
            let confidence = match method {
                DetectionMethod::PageContent => (raw * CONTENT_PENALTY).min(CONTENT_CAP),
                _ => raw.min(TITLE_CAP),
            };
            if best.as_ref().is_none_or(|b| confidence > b.confidence) {
                best = Some(CategoryInfo {
                    category: table.category,
                    confidence,
                    detection_method: method,
                    evidence,
                });
            }
        }
        best
    }

    /// Category tables in definition order, general excluded
    fn tables(&self) -> impl Iterator<Item = &CategoryTable> {
        ProductCategory::ALL
            .iter()
            .filter(|c| **c != ProductCategory::General)
            .filter_map(|c| self.data.category_table(*c))
    }
}

/// Lower-cased path pieces of a product URL
struct UrlText {
    path: String,
    query: Option<String>,
    terms: Vec<String>,
}

impl UrlText {
    fn parse(url: &str) -> Option<Self> {
        let parsed = Url::parse(url.trim()).ok()?;
        let path = parsed.path().to_lowercase();
        let terms = path
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Some(Self {
            query: parsed.query().map(str::to_lowercase),
            path,
            terms,
        })
    }

    /// Patterns with `/` or `?` are path fragments; anything else is a run of
    /// whole path terms, where hyphens separate the terms.
    fn matches(&self, pattern: &str) -> bool {
        if pattern.contains('?') {
            let full = match &self.query {
                Some(query) => format!("{}?{query}", self.path),
                None => self.path.clone(),
            };
            return full.contains(pattern);
        }
        if pattern.contains('/') {
            return self.path.contains(pattern);
        }

        let words: Vec<&str> = pattern.split('-').filter(|w| !w.is_empty()).collect();
        let Some((last, leading)) = words.split_last() else {
            return false;
        };
        self.terms.windows(words.len()).any(|window| {
            window[..leading.len()].iter().zip(leading).all(|(term, word)| term == word)
                && is_term_or_plural(&window[leading.len()], last)
        })
    }
}
