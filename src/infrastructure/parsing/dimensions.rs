//! Product dimensions (`L x W x H unit`) extraction

use regex::Regex;

use super::context::ExtractionContext;
use super::page::ParsedPage;
use super::text::parse_decimal;
use super::units::LengthUnit;
use super::{AttributeExtractor, Extracted};
use crate::domain::product::DEFAULT_DIMENSIONS_CM;

/// Largest side accepted, in centimetres
const MAX_SIDE_CM: f64 = 500.0;

pub struct DimensionsExtractor {
    triple: Regex,
}

impl DimensionsExtractor {
    pub fn new() -> Self {
        let number = r"\d+(?:[.,]\d+)?";
        let unit = r"millimetres|millimeters|centimetres|centimeters|inches|inch|mm|cm|in|m";
        let side = |name: &str| format!(r"(?P<{name}>{number})\s*(?:{unit})?");
        let pattern = format!(
            r"(?i)\b{}\s*[x×*]\s*{}\s*[x×*]\s*(?P<l3>{number})\s*(?P<unit>{unit})\b",
            side("l1"),
            side("l2"),
        );
        Self {
            triple: Regex::new(&pattern).expect("static dimensions pattern"),
        }
    }

    pub fn fallback(&self) -> Extracted<[f64; 3]> {
        Extracted::new(DEFAULT_DIMENSIONS_CM, "default").with_warning("Dimensions not found; using 10 x 10 x 10 cm")
    }

    /// Parse the first plausible `L x W x H unit` triple in `text`, in centimetres
    pub fn parse(&self, text: &str) -> Option<[f64; 3]> {
        self.triple.captures_iter(text).find_map(|caps| {
            let unit = LengthUnit::parse(caps.name("unit")?.as_str())?;
            let mut sides = [0.0; 3];
            for (slot, name) in sides.iter_mut().zip(["l1", "l2", "l3"]) {
                *slot = unit.to_cm(parse_decimal(caps.name(name)?.as_str())?);
            }
            sides
                .iter()
                .all(|s| *s > 0.0 && *s <= MAX_SIDE_CM)
                .then_some(sides)
        })
    }
}

impl Default for DimensionsExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeExtractor for DimensionsExtractor {
    type Output = [f64; 3];

    fn extract(&self, page: &ParsedPage, _context: &ExtractionContext) -> Option<Extracted<[f64; 3]>> {
        let from_rows = page
            .spec_rows
            .iter()
            .filter(|row| row.label.contains("dimensions") || row.label == "size")
            .find_map(|row| {
                self.parse(&row.value)
                    .map(|dims| Extracted::new(dims, format!("spec_table:{}", row.label.replace(' ', "_"))))
            });

        from_rows
            .or_else(|| self.parse(&page.spec_text).map(|d| Extracted::new(d, "spec_section")))
            .or_else(|| self.parse(&page.bullets_text()).map(|d| Extracted::new(d, "bullets")))
            .or_else(|| self.parse(&page.title).map(|d| Extracted::new(d, "title")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::parsing::page::SpecRow;
    use rstest::rstest;

    #[rstest]
    #[case("20 x 15 x 10 cm; 727 g", Some([20.0, 15.0, 10.0]))]
    #[case("120 x 80 x 45 mm", Some([12.0, 8.0, 4.5]))]
    #[case("10 x 4 x 2 inches", Some([25.4, 10.16, 5.08]))]
    #[case("30cm x 20cm x 5cm", Some([30.0, 20.0, 5.0]))]
    #[case("Pack of 2 x 500 g", None)]
    #[case("900 x 900 x 900 cm", None)]
    fn parses_triples(#[case] text: &str, #[case] expected: Option<[f64; 3]>) {
        let parsed = DimensionsExtractor::new().parse(text);
        match (parsed, expected) {
            (Some(got), Some(want)) => {
                for (g, w) in got.iter().zip(want) {
                    assert!((g - w).abs() < 1e-6, "{got:?} != {want:?}");
                }
            }
            (got, want) => assert_eq!(got, want),
        }
    }

    #[test]
    fn rows_before_title() {
        let mut page = ParsedPage {
            title: "Storage Box 40 x 30 x 20 cm".to_string(),
            ..Default::default()
        };
        page.spec_rows.push(SpecRow::new("Product Dimensions", "38 x 28 x 18 cm; 1.1 kg"));
        let found = DimensionsExtractor::new()
            .extract(&page, &ExtractionContext::general("https://x"))
            .unwrap();
        assert_eq!(found.value, [38.0, 28.0, 18.0]);
        assert_eq!(found.source, "spec_table:product_dimensions");
    }
}
