//! Packaging / product material extraction

use tracing::debug;

use super::context::ExtractionContext;
use super::page::ParsedPage;
use super::text::contains_word;
use super::{AttributeExtractor, Extracted};
use crate::domain::product::MaterialType;

/// Material → keywords, in tie-break order
const MATERIAL_KEYWORDS: &[(MaterialType, &[&str])] = &[
    (
        MaterialType::Plastic,
        &["plastic", "polypropylene", "polyethylene", "hdpe", "ldpe", "pet bottle", "bpa free", "bpa-free", "acrylic", "pvc", "silicone", "tritan"],
    ),
    (
        MaterialType::Metal,
        &["metal", "stainless steel", "steel", "aluminium", "aluminum", "iron", "cast iron", "copper", "brass", "titanium", "alloy", "tin"],
    ),
    (MaterialType::Glass, &["glass", "borosilicate", "crystal"]),
    (MaterialType::Paper, &["paper", "paperback", "hardcover", "hardback", "kraft"]),
    (MaterialType::Cardboard, &["cardboard", "carton", "corrugated"]),
    (
        MaterialType::Fabric,
        &["cotton", "polyester", "fabric", "wool", "linen", "silk", "nylon", "denim", "fleece", "textile", "leather"],
    ),
    (MaterialType::Wood, &["wood", "wooden", "bamboo", "oak", "pine", "walnut", "timber", "beech"]),
];

/// Product names that always ship in a plastic tub or bottle
const SUPPLEMENT_TERMS: &[&str] = &[
    "protein", "whey", "supplement", "vitamin", "vitamins", "multivitamin", "creatine", "capsules", "bcaa",
    "pre-workout", "collagen",
];

const MATERIAL_ROW_LABELS: &[&str] = &["material", "outer material", "material type", "material composition"];

pub struct MaterialExtractor;

impl MaterialExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Material used when no rule matched: the category default
    pub fn fallback(&self, context: &ExtractionContext) -> Extracted<MaterialType> {
        let material = context.rules.default_material;
        Extracted::new(material, "category_default")
            .with_warning(format!("Material not found; using {} default {material}", context.category()))
    }

    /// Keyword hit counts per material, in table order
    pub fn keyword_counts(&self, text: &str) -> Vec<(MaterialType, usize)> {
        let lower = text.to_lowercase();
        MATERIAL_KEYWORDS
            .iter()
            .map(|(material, keywords)| {
                (*material, keywords.iter().filter(|k| contains_word(&lower, k)).count())
            })
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    fn supplement_override(&self, page: &ParsedPage) -> Option<Extracted<MaterialType>> {
        let title = page.title.to_lowercase();
        SUPPLEMENT_TERMS
            .iter()
            .find(|term| contains_word(&title, term))
            .map(|term| Extracted::new(MaterialType::Plastic, format!("supplement_override:{term}")))
    }

    fn from_rows(&self, page: &ParsedPage) -> Option<Extracted<MaterialType>> {
        page.spec_rows
            .iter()
            .filter(|row| MATERIAL_ROW_LABELS.iter().any(|label| row.label == *label || row.label.ends_with(label)))
            .find_map(|row| {
                let material = self.best_of(&self.keyword_counts(&row.value))?;
                Some(Extracted::new(material, "spec_table:material"))
            })
    }

    fn from_keywords(&self, page: &ParsedPage) -> Option<Extracted<MaterialType>> {
        let text = format!("{} {} {}", page.title, page.bullets_text(), page.description);
        let counts = self.keyword_counts(&text);
        let material = self.best_of(&counts)?;
        Some(Extracted::new(material, format!("keywords:{}", material.as_str().to_lowercase())))
    }

    /// Highest count wins; a tie between materials means `Mixed`
    fn best_of(&self, counts: &[(MaterialType, usize)]) -> Option<MaterialType> {
        let top = counts.iter().map(|(_, c)| *c).max()?;
        let mut leaders = counts.iter().filter(|(_, c)| *c == top);
        let (first, _) = leaders.next()?;
        if leaders.next().is_some() {
            Some(MaterialType::Mixed)
        } else {
            Some(*first)
        }
    }
}

impl Default for MaterialExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeExtractor for MaterialExtractor {
    type Output = MaterialType;

    fn extract(&self, page: &ParsedPage, _context: &ExtractionContext) -> Option<Extracted<MaterialType>> {
        let found = self
            .supplement_override(page)
            .or_else(|| self.from_rows(page))
            .or_else(|| self.from_keywords(page))?;
        debug!("Material {} via {}", found.value, found.source);
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::category::{CategoryInfo, CategoryRules};
    use crate::infrastructure::parsing::page::SpecRow;

    fn extract(page: &ParsedPage) -> Option<Extracted<MaterialType>> {
        MaterialExtractor::new().extract(page, &ExtractionContext::general("https://x"))
    }

    #[test]
    fn supplements_are_plastic_whatever_the_keywords() {
        let page = ParsedPage {
            title: "Whey Protein in a Glass Jar with Steel Lid".to_string(),
            ..Default::default()
        };
        let found = extract(&page).unwrap();
        assert_eq!(found.value, MaterialType::Plastic);
        assert_eq!(found.source, "supplement_override:protein");
    }

    #[test]
    fn material_row_beats_free_text() {
        let mut page = ParsedPage {
            title: "Bottle with plastic cap".to_string(),
            ..Default::default()
        };
        page.spec_rows.push(SpecRow::new("Material", "Stainless Steel"));
        let found = extract(&page).unwrap();
        assert_eq!(found.value, MaterialType::Metal);
        assert_eq!(found.source, "spec_table:material");
    }

    #[test]
    fn keyword_majority_and_ties() {
        let page = ParsedPage {
            title: "Oak and walnut wooden tray".to_string(),
            bullets: vec!["Felt pads".to_string()],
            ..Default::default()
        };
        assert_eq!(extract(&page).unwrap().value, MaterialType::Wood);

        let page = ParsedPage {
            title: "Glass bottle with cotton sleeve".to_string(),
            ..Default::default()
        };
        let found = extract(&page).unwrap();
        assert_eq!(found.value, MaterialType::Mixed);
        assert_eq!(found.source, "keywords:mixed");
    }

    #[test]
    fn category_default_is_the_fallback() {
        let page = ParsedPage {
            title: "Mystery gadget".to_string(),
            ..Default::default()
        };
        assert_eq!(extract(&page), None);

        let rules = CategoryRules {
            default_material: MaterialType::Paper,
            ..Default::default()
        };
        let context = ExtractionContext::new("https://x", CategoryInfo::general(), rules);
        assert_eq!(MaterialExtractor::new().fallback(&context).value, MaterialType::Paper);
    }
}
