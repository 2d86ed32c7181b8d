//! Country of origin extraction
//!
//! Four sources in strict priority: explicit origin statements inside the
//! structured details sections, manufacturer/importer contact addresses, the
//! brand→country table, and free-text phrases in title, bullets and description.
//! The first source that yields a recognised country wins.

use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use super::context::ExtractionContext;
use super::country::CountryNormalizer;
use super::page::ParsedPage;
use super::text::find_word;
use super::{AttributeExtractor, Extracted};
use crate::infrastructure::reference_data::ReferenceData;

const ORIGIN_ROW_LABELS: &[&str] = &[
    "country of origin",
    "country of manufacture",
    "country/region of origin",
    "made in",
    "manufactured in",
    "origin",
];

/// How many leading title words can form a brand name
const MAX_BRAND_WORDS: usize = 3;

struct OriginRule {
    name: &'static str,
    pattern: Regex,
}

impl OriginRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("static origin rule"),
        }
    }
}

pub struct OriginExtractor {
    data: Arc<ReferenceData>,
    normalizer: CountryNormalizer,
    structured: Vec<OriginRule>,
    phrases: Vec<OriginRule>,
}

impl OriginExtractor {
    pub fn new(data: Arc<ReferenceData>) -> Self {
        let place = r"(?P<place>[A-Za-z][A-Za-z .,'()\-]{1,60})";
        Self {
            normalizer: CountryNormalizer::new(data.clone()),
            data,
            structured: vec![
                OriginRule::new(
                    "country_of_origin",
                    &format!(r"(?i)country(?:/region)?\s+of\s+(?:origin|manufacture)\s*[:\-]?\s*{place}"),
                ),
                OriginRule::new("made_in", &format!(r"(?i)\bmade\s+in\s+(?:the\s+)?{place}")),
                OriginRule::new("manufactured_in", &format!(r"(?i)\bmanufactured\s+in\s+(?:the\s+)?{place}")),
                OriginRule::new("product_of", &format!(r"(?i)\bproduct\s+of\s+(?:the\s+)?{place}")),
            ],
            phrases: vec![
                OriginRule::new("country_made", r"(?i)\b(?P<place>uk|british|usa|american|german|italian|swiss|japanese)[\s-]+made\b"),
                OriginRule::new("made_in", &format!(r"(?i)\bmade\s+in\s+(?:the\s+)?{place}")),
                OriginRule::new("produced_in", &format!(r"(?i)\b(?:produced|manufactured|designed and made)\s+in\s+(?:the\s+)?{place}")),
            ],
        }
    }

    pub fn normalizer(&self) -> &CountryNormalizer {
        &self.normalizer
    }

    fn from_structured(&self, page: &ParsedPage) -> Option<Extracted<String>> {
        let from_rows = ORIGIN_ROW_LABELS.iter().find_map(|label| {
            page.spec_rows
                .iter()
                .filter(|row| row.label.contains(label))
                .find_map(|row| self.normalizer.normalize_prefix(&row.value))
                .map(|country| Extracted::new(country, format!("spec_table:{}", label.replace(' ', "_"))))
        });
        from_rows.or_else(|| self.apply(&self.structured, &page.spec_text, "spec_section"))
    }

    fn from_contacts(&self, page: &ParsedPage) -> Option<Extracted<String>> {
        page.contact_text
            .iter()
            .find_map(|block| self.normalizer.from_address(block))
            .map(|country| Extracted::new(country, "manufacturer_contact"))
    }

    fn from_brand(&self, page: &ParsedPage, context: &ExtractionContext) -> Option<Extracted<String>> {
        if !context.rules.brand_detection {
            return None;
        }
        let brands = &self.data.brand_origins;

        if let Some(brand) = context.brand.as_deref() {
            let key = brand.trim().to_lowercase();
            if let Some(country) = brands.get(&key) {
                return Some(Extracted::new(country.clone(), format!("brand_map:{key}")));
            }
        }

        let title = page.title.to_lowercase();
        let words: Vec<&str> = title.split_whitespace().take(MAX_BRAND_WORDS).collect();
        for n in (1..=words.len()).rev() {
            let candidate = words[..n].join(" ");
            let candidate = candidate.trim_matches(|c: char| !c.is_alphanumeric() && c != '&');
            if let Some(country) = brands.get(candidate) {
                return Some(Extracted::new(country.clone(), format!("brand_map:{candidate}")));
            }
        }

        // Earliest mention in the title wins, the longer name on a tie
        brands
            .iter()
            .filter(|(name, _)| name.contains(' '))
            .filter_map(|(name, country)| find_word(&title, name).map(|at| (at, name, country)))
            .min_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.len().cmp(&a.1.len())))
            .map(|(_, name, country)| Extracted::new(country.clone(), format!("brand_map:{name}")))
    }

    fn from_phrases(&self, page: &ParsedPage) -> Option<Extracted<String>> {
        let bullets = page.bullets_text();
        [
            (page.title.as_str(), "title"),
            (bullets.as_str(), "bullets"),
            (page.description.as_str(), "description"),
        ]
        .into_iter()
        .find_map(|(text, origin)| self.apply(&self.phrases, text, origin))
    }

    fn apply(&self, rules: &[OriginRule], text: &str, origin: &str) -> Option<Extracted<String>> {
        if text.is_empty() {
            return None;
        }
        rules.iter().find_map(|rule| {
            rule.pattern.captures_iter(text).find_map(|caps| {
                let place = caps.name("place")?.as_str();
                let country = self.normalizer.normalize_prefix(place).or_else(|| demonym(place))?;
                Some(Extracted::new(country, format!("{origin}:{}", rule.name)))
            })
        })
    }
}

/// Adjective forms used in "British made" style phrases
fn demonym(word: &str) -> Option<String> {
    let country = match word.trim().to_lowercase().as_str() {
        "british" => "UK",
        "american" => "USA",
        "german" => "Germany",
        "italian" => "Italy",
        "swiss" => "Switzerland",
        "japanese" => "Japan",
        _ => return None,
    };
    Some(country.to_string())
}

impl AttributeExtractor for OriginExtractor {
    type Output = String;

    fn extract(&self, page: &ParsedPage, context: &ExtractionContext) -> Option<Extracted<String>> {
        let found = self
            .from_structured(page)
            .or_else(|| self.from_contacts(page))
            .or_else(|| self.from_brand(page, context))
            .or_else(|| self.from_phrases(page))?;
        debug!("Origin {} via {}", found.value, found.source);
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::{CategoryInfo, CategoryRules};
    use crate::infrastructure::parsing::page::SpecRow;

    fn extractor() -> OriginExtractor {
        OriginExtractor::new(Arc::new(ReferenceData::embedded().unwrap()))
    }

    fn context() -> ExtractionContext {
        ExtractionContext::general("https://www.amazon.co.uk/dp/B000QSNYGI")
    }

    #[test]
    fn structured_row_wins_over_everything_else() {
        let mut page = ParsedPage {
            title: "Myprotein Impact Whey Made in Germany".to_string(),
            ..Default::default()
        };
        page.spec_rows.push(SpecRow::new("Country of origin", "China"));
        page.contact_text.push("Manchester M90 3DQ".to_string());

        let found = extractor().extract(&page, &context()).unwrap();
        assert_eq!(found.value, "China");
        assert_eq!(found.source, "spec_table:country_of_origin");
    }

    #[test]
    fn section_text_statement() {
        let page = ParsedPage {
            spec_text: "Brand : Acme | Country of origin : United Kingdom | Batteries : No".to_string(),
            ..Default::default()
        };
        let found = extractor().extract(&page, &context()).unwrap();
        assert_eq!(found.value, "UK");
        assert_eq!(found.source, "spec_section:country_of_origin");
    }

    #[test]
    fn contact_address_before_brand_table() {
        let page = ParsedPage {
            title: "Optimum Nutrition Gold Standard Whey".to_string(),
            contact_text: vec!["Glanbia Performance Nutrition, Dublin, Ireland".to_string()],
            ..Default::default()
        };
        let found = extractor().extract(&page, &context()).unwrap();
        assert_eq!(found.value, "Ireland");
        assert_eq!(found.source, "manufacturer_contact");
    }

    #[test]
    fn brand_table_from_title() {
        let page = ParsedPage {
            title: "Optimum Nutrition Gold Standard 100% Whey Protein Powder".to_string(),
            ..Default::default()
        };
        let found = extractor().extract(&page, &context()).unwrap();
        assert_eq!(found.value, "USA");
        assert_eq!(found.source, "brand_map:optimum nutrition");
    }

    #[test]
    fn first_brand_mentioned_in_the_title_wins() {
        let page = ParsedPage {
            title: "Shaker Bottle for Scitec Nutrition and Optimum Nutrition Fans".to_string(),
            ..Default::default()
        };
        let found = extractor().extract(&page, &context()).unwrap();
        assert_eq!(found.value, "Hungary");
        assert_eq!(found.source, "brand_map:scitec nutrition");
    }

    #[test]
    fn extracted_brand_is_consulted_first() {
        let page = ParsedPage {
            title: "Impact Whey Protein".to_string(),
            ..Default::default()
        };
        let found = extractor()
            .extract(&page, &context().with_brand(Some("Myprotein".to_string())))
            .unwrap();
        assert_eq!(found.value, "UK");
    }

    #[test]
    fn free_text_phrases_are_last() {
        let page = ParsedPage {
            title: "Handmade Oak Chopping Board".to_string(),
            bullets: vec!["Proudly British made from sustainable timber".to_string()],
            ..Default::default()
        };
        let found = extractor().extract(&page, &context()).unwrap();
        assert_eq!(found.value, "UK");
        assert_eq!(found.source, "bullets:country_made");
    }

    #[test]
    fn books_skip_the_brand_table() {
        let info = CategoryInfo::general();
        let rules = CategoryRules {
            brand_detection: false,
            ..Default::default()
        };
        let context = ExtractionContext::new("https://x", info, rules);
        let page = ParsedPage {
            title: "Apple Pie Recipes".to_string(),
            ..Default::default()
        };
        assert_eq!(extractor().extract(&page, &context), None);
    }

    #[test]
    fn unknown_places_are_not_guessed() {
        let page = ParsedPage {
            title: "Made in small batches".to_string(),
            ..Default::default()
        };
        assert_eq!(extractor().extract(&page, &context()), None);
    }
}
