//! Brand extraction from byline regions

use regex::Regex;

use super::context::ExtractionContext;
use super::page::ParsedPage;
use super::text::{normalize_whitespace, truncate_chars};
use super::{AttributeExtractor, Extracted};

/// Byline texts that name no brand at all
const NON_BRANDS: &[&str] = &["generic", "unbranded", "unknown", "n/a", "na", "none", "amazon"];

pub struct BrandExtractor {
    visit_store: Regex,
    prefixes: Regex,
    role_suffix: Regex,
}

impl BrandExtractor {
    pub fn new() -> Self {
        Self {
            visit_store: Regex::new(r"(?i)^visit\s+the\s+(.+?)\s+store$").expect("static regex"),
            prefixes: Regex::new(r"(?i)^(?:brand\s*:|by\s+|manufacturer\s*:)\s*").expect("static regex"),
            role_suffix: Regex::new(r"(?i)\s*\((?:author|editor|illustrator|translator)\)|\s*\(format:.*\)$")
                .expect("static regex"),
        }
    }

    /// Strip byline decoration; `None` when nothing brand-like remains
    pub fn clean(&self, raw: &str, max_length: usize) -> Option<String> {
        let text = normalize_whitespace(raw);
        let text = match self.visit_store.captures(&text) {
            Some(caps) => caps[1].to_string(),
            None => text,
        };
        let text = self.prefixes.replace(&text, "");
        let text = self.role_suffix.replace_all(&text, "");
        let text = text.trim().trim_matches(|c: char| c == ',' || c == ':' || c == '-').trim();

        if text.is_empty() || NON_BRANDS.contains(&text.to_lowercase().as_str()) {
            return None;
        }
        Some(truncate_chars(text, max_length))
    }

    /// Author named on a book page, reported instead of a brand
    pub fn author(&self, page: &ParsedPage, max_length: usize) -> Option<String> {
        page.authors
            .iter()
            .chain(page.byline.iter())
            .find_map(|raw| self.clean(raw, max_length))
    }
}

impl Default for BrandExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeExtractor for BrandExtractor {
    type Output = String;

    /// Books and similar categories never yield a brand
    fn extract(&self, page: &ParsedPage, context: &ExtractionContext) -> Option<Extracted<String>> {
        if !context.rules.brand_detection {
            return None;
        }
        let max_length = context.settings.max_brand_length;

        page.byline
            .iter()
            .find_map(|raw| self.clean(raw, max_length))
            .map(|brand| Extracted::new(brand, "byline"))
            .or_else(|| {
                ["brand", "brand name", "manufacturer"].iter().find_map(|label| {
                    page.spec_rows
                        .iter()
                        .find(|row| row.label == *label)
                        .and_then(|row| self.clean(&row.value, max_length))
                        .map(|brand| Extracted::new(brand, format!("spec_table:{}", label.replace(' ', "_"))))
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::{CategoryInfo, CategoryRules};
    use crate::infrastructure::parsing::page::SpecRow;
    use rstest::rstest;

    #[rstest]
    #[case("Visit the Myprotein Store", Some("Myprotein"))]
    #[case("Brand: Optimum Nutrition", Some("Optimum Nutrition"))]
    #[case("by  Anker", Some("Anker"))]
    #[case("J. K. Rowling (Author)", Some("J. K. Rowling"))]
    #[case("Generic", None)]
    #[case("   ", None)]
    fn cleans_byline_text(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(BrandExtractor::new().clean(raw, 50).as_deref(), expected);
    }

    #[test]
    fn long_bylines_are_truncated() {
        let brand = BrandExtractor::new().clean(&"A".repeat(80), 50).unwrap();
        assert_eq!(brand.chars().count(), 50);
    }

    #[test]
    fn falls_back_to_spec_rows() {
        let mut page = ParsedPage {
            byline: vec!["Generic".to_string()],
            ..Default::default()
        };
        page.spec_rows.push(SpecRow::new("Brand", "Joseph Joseph"));
        let found = BrandExtractor::new()
            .extract(&page, &ExtractionContext::general("https://x"))
            .unwrap();
        assert_eq!(found.value, "Joseph Joseph");
        assert_eq!(found.source, "spec_table:brand");
    }

    #[test]
    fn suppressed_when_byline_names_an_author() {
        let page = ParsedPage {
            byline: vec!["by Penguin Classics".to_string()],
            authors: vec!["Jane Austen (Author)".to_string()],
            ..Default::default()
        };
        let rules = CategoryRules {
            brand_detection: false,
            ..Default::default()
        };
        let context = ExtractionContext::new("https://x", CategoryInfo::general(), rules);
        let extractor = BrandExtractor::new();
        assert_eq!(extractor.extract(&page, &context), None);
        assert_eq!(extractor.author(&page, 50).as_deref(), Some("Jane Austen"));
    }
}
