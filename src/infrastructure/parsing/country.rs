//! Country name normalisation and address-based country inference

use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use super::text::contains_word;
use crate::infrastructure::reference_data::ReferenceData;

const KEYWORD_POINTS: u32 = 3;
const CITY_POINTS: u32 = 2;
const POSTAL_POINTS: u32 = 1;

/// Longest alias, in words, tried when a phrase trails into unrelated text
const MAX_ALIAS_WORDS: usize = 5;

pub struct CountryNormalizer {
    data: Arc<ReferenceData>,
    postal: Vec<Vec<Regex>>,
}

impl CountryNormalizer {
    pub fn new(data: Arc<ReferenceData>) -> Self {
        let postal = data
            .country_indicators
            .iter()
            .map(|indicators| {
                indicators
                    .postal_patterns
                    .iter()
                    .filter_map(|p| match Regex::new(p) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            debug!("Skipping postal pattern '{}' for {}: {}", p, indicators.country, e);
                            None
                        }
                    })
                    .collect()
            })
            .collect();
        Self { data, postal }
    }

    /// Map a raw country string onto its canonical name.
    /// Unrecognised names yield `None` rather than a guess.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let lower = raw
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '.')
            .to_lowercase();
        let dotted = lower.strip_prefix("the ").unwrap_or(&lower).trim();
        let bare = dotted.trim_end_matches('.');
        if bare.is_empty() {
            return None;
        }
        for key in [dotted, bare] {
            if let Some(canonical) = self.data.country_aliases.get(key) {
                return Some(canonical.clone());
            }
        }
        self.canonical_names().find(|name| name.eq_ignore_ascii_case(bare)).map(str::to_string)
    }

    /// Normalise the longest leading run of words that names a country.
    /// `"United Kingdom by Acme Ltd"` yields `"UK"`.
    pub fn normalize_prefix(&self, phrase: &str) -> Option<String> {
        let words: Vec<&str> = phrase.split_whitespace().take(MAX_ALIAS_WORDS).collect();
        (1..=words.len())
            .rev()
            .find_map(|n| self.normalize(&words[..n].join(" ")))
    }

    /// Score each country's address hints against contact text and return the best,
    /// keywords 3 points, cities 2 and postal codes 1. Ties keep table order.
    pub fn from_address(&self, text: &str) -> Option<String> {
        let lower = text.to_lowercase();
        let mut best: Option<(&str, u32)> = None;

        for (indicators, postal) in self.data.country_indicators.iter().zip(&self.postal) {
            let keywords = indicators.keywords.iter().filter(|k| contains_word(&lower, k)).count() as u32;
            let cities = indicators.cities.iter().filter(|c| contains_word(&lower, c)).count() as u32;
            let postcodes = postal.iter().filter(|re| re.is_match(text)).count() as u32;
            let score = keywords * KEYWORD_POINTS + cities * CITY_POINTS + postcodes * POSTAL_POINTS;
            if score > 0 && best.is_none_or(|(_, s)| score > s) {
                best = Some((indicators.country.as_str(), score));
            }
        }

        if let Some((country, score)) = best {
            debug!("Address scored {} for {}", score, country);
        }
        best.map(|(country, _)| country.to_string())
    }

    fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.data
            .country_aliases
            .values()
            .map(String::as_str)
            .chain(self.data.country_indicators.iter().map(|i| i.country.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn normalizer() -> CountryNormalizer {
        CountryNormalizer::new(Arc::new(ReferenceData::embedded().unwrap()))
    }

    #[rstest]
    #[case("gb", Some("UK"))]
    #[case("Britain", Some("UK"))]
    #[case(" United Kingdom. ", Some("UK"))]
    #[case("Deutschland", Some("Germany"))]
    #[case("the Netherlands", Some("Netherlands"))]
    #[case("USA", Some("USA"))]
    #[case("small batches", None)]
    #[case("", None)]
    fn normalizes_aliases(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalizer().normalize(raw).as_deref(), expected);
    }

    #[test]
    fn prefix_normalization_ignores_trailing_words() {
        let n = normalizer();
        assert_eq!(n.normalize_prefix("United Kingdom by Acme Ltd").as_deref(), Some("UK"));
        assert_eq!(n.normalize_prefix("China and packed in Spain").as_deref(), Some("China"));
        assert_eq!(n.normalize_prefix("recycled materials"), None);
    }

    #[test]
    fn address_scoring_prefers_strongest_evidence() {
        let n = normalizer();
        assert_eq!(
            n.from_address("The Hut Group, 5th Floor, Voyager House, Manchester M90 3DQ").as_deref(),
            Some("UK")
        );
        assert_eq!(
            n.from_address("Optimum Nutrition Inc, Downers Grove, Illinois, United States").as_deref(),
            Some("USA")
        );
        assert_eq!(n.from_address("Unit 4, Some Business Park"), None);
    }
}
