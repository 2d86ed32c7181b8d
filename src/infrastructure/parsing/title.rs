//! Title cleanup
//!
//! Storefront `<title>` elements carry the store name and department around
//! the product name; both are removed and the result truncated.

use regex::Regex;

use super::context::ExtractionContext;
use super::page::ParsedPage;
use super::text::{normalize_whitespace, truncate_chars};
use super::{AttributeExtractor, Extracted};

const DEPARTMENTS: &[&str] = &[
    "health & personal care",
    "health & household",
    "sports & outdoors",
    "home & kitchen",
    "kitchen & home",
    "electronics",
    "computers & accessories",
    "books",
    "toys & games",
    "grocery",
    "grocery & gourmet food",
    "automotive",
    "clothing",
    "fashion",
    "beauty",
    "diy & tools",
    "pet supplies",
    "baby",
    "baby products",
];

pub struct TitleCleaner {
    store_prefix: Regex,
    store_suffix: Regex,
}

impl TitleCleaner {
    pub fn new() -> Self {
        Self {
            store_prefix: Regex::new(r"(?i)^amazon(?:\.[a-z]{2,3}){1,2}\s*:\s*").expect("static regex"),
            store_suffix: Regex::new(r"(?i)\s*[:|\-]\s*amazon(?:\.[a-z]{2,3}){1,2}.*$").expect("static regex"),
        }
    }

    pub fn clean(&self, raw: &str, max_length: usize) -> Option<String> {
        let text = normalize_whitespace(raw);
        let text = self.store_prefix.replace(&text, "");
        let mut text = self.store_suffix.replace(&text, "").trim().to_string();

        if let Some((head, tail)) = text.rsplit_once(':') {
            if DEPARTMENTS.contains(&tail.trim().to_lowercase().as_str()) {
                text = head.trim().to_string();
            }
        }

        let text = text.trim_matches(|c: char| c == ':' || c == '|' || c.is_whitespace());
        if text.is_empty() || self.store_prefix.is_match(&format!("{text}:")) {
            return None;
        }
        Some(truncate_chars(text, max_length))
    }
}

impl Default for TitleCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeExtractor for TitleCleaner {
    type Output = String;

    fn extract(&self, page: &ParsedPage, context: &ExtractionContext) -> Option<Extracted<String>> {
        let max_length = context.settings.max_title_length;
        self.clean(&page.title, max_length)
            .map(|t| Extracted::new(t, "title_element"))
            .or_else(|| {
                self.clean(&page.document_title, max_length)
                    .map(|t| Extracted::new(t, "document_title"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "Amazon.co.uk: Optimum Nutrition Gold Standard Whey : Health & Personal Care",
        Some("Optimum Nutrition Gold Standard Whey")
    )]
    #[case("Stainless Steel Bottle : Amazon.com: Kitchen", Some("Stainless Steel Bottle"))]
    #[case("  Ratio: 3:1 Mixer  ", Some("Ratio: 3:1 Mixer"))]
    #[case("Amazon.co.uk", None)]
    #[case("", None)]
    fn strips_store_decoration(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(TitleCleaner::new().clean(raw, 200).as_deref(), expected);
    }

    #[test]
    fn truncates_long_titles() {
        let title = TitleCleaner::new().clean(&"word ".repeat(100), 200).unwrap();
        assert!(title.chars().count() <= 200);
    }

    #[test]
    fn document_title_is_the_fallback() {
        let page = ParsedPage {
            document_title: "Amazon.de: Lego Technic Set".to_string(),
            ..Default::default()
        };
        let found = TitleCleaner::new()
            .extract(&page, &ExtractionContext::general("https://x"))
            .unwrap();
        assert_eq!(found.value, "Lego Technic Set");
        assert_eq!(found.source, "document_title");
    }
}
