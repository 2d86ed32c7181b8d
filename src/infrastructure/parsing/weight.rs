//! Product weight extraction
//!
//! Sources are tried in a fixed order: details table rows, details section
//! text, feature bullets, then the title. Label text such as "25g protein" is
//! stripped from bullets and title before any quantity is read, and matches
//! outside the absolute plausibility bounds are skipped rather than accepted.

use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::context::ExtractionContext;
use super::page::ParsedPage;
use super::text::parse_decimal;
use super::units::WeightUnit;
use super::{AttributeExtractor, Extracted};
use crate::domain::category::ProductCategory;
use crate::domain::product::DEFAULT_WEIGHT_KG;
use crate::infrastructure::reference_data::ReferenceData;

const UNITS: &str = r"kilogrammes|kilograms|kilogramme|kilogram|kilos|kilo|kgs|kg|grammes|gramme|grams|gram|gr|g|pounds|pound|lbs|lb|ounces|ounce|oz";
const NUMBER: &str = r"\d+(?:[.,]\d+)*";

/// Details rows consulted first, in this order
const ROW_LABELS: &[&str] = &[
    "item weight",
    "net weight",
    "net quantity",
    "product weight",
    "weight",
    "product dimensions",
    "package dimensions",
    "item dimensions",
];

/// Label text that must never be read as package weight, whatever the category
const NUTRITIONAL_PATTERNS: &[&str] = &[
    r"(?i)\b\d+(?:[.,]\d+)?\s*(?:g|mg|grams?)\s*(?:of\s+)?(?:protein|carbs?|carbohydrates?|fats?|sugars?|fib(?:re|er)|salt|sodium|bcaas?|creatine|glutamine|leucine|caffeine)\b",
    r"(?i)\b(?:protein|carbs?|carbohydrates?|sugars?|fats?|fib(?:re|er))\s*[:\-]?\s*\d+(?:[.,]\d+)?\s*g\b",
    r"(?i)\b\d+(?:[.,]\d+)?\s*g\s*per\s+(?:serving|scoop|bar|portion|sachet)\b",
    r"(?i)\bper\s+\d+(?:[.,]\d+)?\s*g\b",
];

/// A named pattern with `value` and `unit` capture groups
struct WeightRule {
    name: &'static str,
    pattern: Regex,
}

impl WeightRule {
    fn new(name: &'static str, prefix: &str) -> Self {
        let pattern = format!(r"(?i){prefix}(?P<value>{NUMBER})\s*(?P<unit>{UNITS})\b");
        Self {
            name,
            pattern: Regex::new(&pattern).expect("static weight rule"),
        }
    }
}

pub struct WeightExtractor {
    labelled: Vec<WeightRule>,
    quantity: WeightRule,
    nutritional: Vec<Regex>,
    /// Category exclusion patterns compiled up front, keyed by source text
    category_exclusions: HashMap<String, Regex>,
}

impl WeightExtractor {
    pub fn new() -> Self {
        Self {
            labelled: vec![
                WeightRule::new("item_weight", r"item\s+weight\s*[:\-]?\s*"),
                WeightRule::new("net_weight", r"net\s+(?:weight|wt\.?|quantity|contents?)\s*[:\-]?\s*"),
                WeightRule::new("dimensions_weight", r"(?:cm|mm|inches|in)\s*;\s*"),
                WeightRule::new("weight", r"\bweight\s*[:\-]?\s*"),
            ],
            quantity: WeightRule::new("quantity", r"\b"),
            nutritional: NUTRITIONAL_PATTERNS
                .iter()
                .map(|p| Regex::new(p).expect("static nutritional pattern"))
                .collect(),
            category_exclusions: HashMap::new(),
        }
    }

    /// Precompile every category's nutritional exclusions from the reference tables
    pub fn with_reference_data(data: &ReferenceData) -> Self {
        let mut extractor = Self::new();
        for raw in data.categories.iter().flat_map(|t| &t.rules.nutritional_exclusions) {
            if extractor.category_exclusions.contains_key(raw) {
                continue;
            }
            match Regex::new(raw) {
                Ok(pattern) => {
                    extractor.category_exclusions.insert(raw.clone(), pattern);
                }
                Err(e) => warn!("Skipping invalid nutritional exclusion '{}': {}", raw, e),
            }
        }
        extractor
    }

    /// Weight used when no source yields a plausible value
    pub fn fallback(&self, context: &ExtractionContext) -> Extracted<f64> {
        if context.category() == ProductCategory::General {
            Extracted::new(DEFAULT_WEIGHT_KG, "default")
                .with_warning(format!("Weight not found; using default {DEFAULT_WEIGHT_KG} kg"))
        } else {
            let midpoint = context.rules.weight_midpoint();
            Extracted::new(midpoint, "category_default").with_warning(format!(
                "Weight not found; using {} range midpoint {midpoint:.3} kg",
                context.category()
            ))
        }
    }

    /// Remove nutritional label text (global and category-specific) before reading quantities
    pub fn strip_nutritional(&self, text: &str, context: &ExtractionContext) -> String {
        let mut cleaned = text.to_string();
        for pattern in &self.nutritional {
            cleaned = pattern.replace_all(&cleaned, " ").into_owned();
        }
        for raw in &context.rules.nutritional_exclusions {
            if let Some(pattern) = self.category_exclusions.get(raw) {
                cleaned = pattern.replace_all(&cleaned, " ").into_owned();
                continue;
            }
            // Rules not taken from the reference tables
            match Regex::new(raw) {
                Ok(pattern) => cleaned = pattern.replace_all(&cleaned, " ").into_owned(),
                Err(e) => debug!("Skipping invalid nutritional exclusion '{}': {}", raw, e),
            }
        }
        cleaned
    }

    fn from_rows(&self, page: &ParsedPage, context: &ExtractionContext) -> Option<Extracted<f64>> {
        ROW_LABELS.iter().find_map(|label| {
            page.spec_rows
                .iter()
                .filter(|row| row.label.contains(label))
                .find_map(|row| self.first_plausible(&self.quantity, &row.value, context))
                .map(|kg| Extracted::new(kg, format!("spec_table:{}", label.replace(' ', "_"))))
        })
    }

    fn from_text(&self, text: &str, origin: &str, context: &ExtractionContext) -> Option<Extracted<f64>> {
        self.labelled.iter().find_map(|rule| {
            self.first_plausible(rule, text, context)
                .map(|kg| Extracted::new(kg, format!("{origin}:{}", rule.name)))
        })
    }

    fn from_quantities(&self, text: &str, origin: &str, context: &ExtractionContext) -> Option<Extracted<f64>> {
        self.first_plausible(&self.quantity, text, context)
            .map(|kg| Extracted::new(kg, format!("{origin}:quantity")))
    }

    /// First match of `rule` whose kilogram value lies inside the absolute bounds
    fn first_plausible(&self, rule: &WeightRule, text: &str, context: &ExtractionContext) -> Option<f64> {
        let settings = &context.settings;
        rule.pattern.captures_iter(text).find_map(|caps| {
            let value = parse_decimal(caps.name("value")?.as_str())?;
            let unit = WeightUnit::parse(caps.name("unit")?.as_str())?;
            let kg = unit.to_kg(value);
            if kg >= settings.min_weight_kg && kg <= settings.max_weight_kg {
                Some(kg)
            } else {
                debug!("Discarding implausible weight {:.4} kg ({})", kg, rule.name);
                None
            }
        })
    }

    /// Flag values outside the category range; replace extreme outliers with the midpoint
    fn check_category(&self, found: Extracted<f64>, context: &ExtractionContext) -> Extracted<f64> {
        let rules = &context.rules;
        let (min, max) = rules.weight_range_kg;
        let category = context.category();
        let weight = found.value;

        if rules.is_weight_outlier(weight, context.settings.outlier_factor) {
            let midpoint = rules.weight_midpoint();
            return Extracted::new(midpoint, "category_midpoint").with_warning(format!(
                "Weight {weight:.3} kg from {} is an extreme outlier for {category} ({min}-{max} kg); replaced with {midpoint:.3} kg",
                found.source
            ));
        }
        if !rules.weight_in_range(weight) {
            return found.with_warning(format!(
                "Weight {weight:.3} kg is outside the expected {category} range ({min}-{max} kg)"
            ));
        }
        found
    }
}

impl Default for WeightExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeExtractor for WeightExtractor {
    type Output = f64;

    fn extract(&self, page: &ParsedPage, context: &ExtractionContext) -> Option<Extracted<f64>> {
        let bullets = self.strip_nutritional(&page.bullets_text(), context);
        let title = self.strip_nutritional(&page.title, context);

        let found = self
            .from_rows(page, context)
            .or_else(|| self.from_text(&page.spec_text, "spec_section", context))
            .or_else(|| self.from_text(&bullets, "bullets", context))
            .or_else(|| self.from_quantities(&bullets, "bullets", context))
            .or_else(|| self.from_quantities(&title, "title", context))?;

        debug!("Weight {:.3} kg via {}", found.value, found.source);
        Some(self.check_category(found, context))
    }
}
