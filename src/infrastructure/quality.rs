//! Data-quality scoring for extraction results
//!
//! A pure function over the populated record: points for a usable title, a
//! found and plausible weight, a brand, a specific material, a known origin and
//! a confident category. The total is 0-100 and maps onto `ConfidenceLevel`.

use crate::domain::category::CategoryRules;
use crate::domain::product::{ConfidenceLevel, MaterialType, ScrapingResult, UNKNOWN};

pub const TITLE_POINTS: u8 = 25;
pub const SHORT_TITLE_POINTS: u8 = 15;
pub const WEIGHT_POINTS: u8 = 25;
pub const IMPLAUSIBLE_WEIGHT_POINTS: u8 = 15;
pub const BRAND_POINTS: u8 = 15;
pub const MATERIAL_POINTS: u8 = 15;
pub const MIXED_MATERIAL_POINTS: u8 = 7;
pub const ORIGIN_POINTS: u8 = 10;
pub const CATEGORY_POINTS: f64 = 10.0;

/// Titles shorter than this earn reduced points
const MIN_TITLE_CHARS: usize = 10;

/// Weight provenance tags that mean the weight was not found on the page
const DEFAULT_WEIGHT_SOURCES: &[&str] = &["default", "category_default", "category_midpoint", "fallback"];

pub fn quality_score(result: &ScrapingResult, rules: &CategoryRules) -> u8 {
    let title = result.title.trim();
    let title_points = if title.is_empty() || title == UNKNOWN {
        0
    } else if title.chars().count() < MIN_TITLE_CHARS {
        SHORT_TITLE_POINTS
    } else {
        TITLE_POINTS
    };

    let weight_points = match result.source_of("weight") {
        Some(source) if !DEFAULT_WEIGHT_SOURCES.contains(&source) => {
            if rules.weight_in_range(result.weight_kg) {
                WEIGHT_POINTS
            } else {
                IMPLAUSIBLE_WEIGHT_POINTS
            }
        }
        _ => 0,
    };

    // Categories whose byline names an author cannot lose points for a missing brand
    let brand_points = if result.has_known_brand() || !rules.brand_detection {
        BRAND_POINTS
    } else {
        0
    };

    let material_points = match result.material_type {
        MaterialType::Mixed => MIXED_MATERIAL_POINTS,
        MaterialType::Unknown => 0,
        _ => MATERIAL_POINTS,
    };

    let origin_points = if result.has_known_origin() { ORIGIN_POINTS } else { 0 };

    let category_points = (result.category_confidence.clamp(0.0, 1.0) * CATEGORY_POINTS).round() as u8;

    (title_points + weight_points + brand_points + material_points + origin_points + category_points).min(100)
}

/// Score the result in place and set its confidence bucket
pub fn apply_quality(result: &mut ScrapingResult, rules: &CategoryRules) {
    result.quality_score = quality_score(result, rules);
    result.confidence_level = ConfidenceLevel::from_score(result.quality_score);
}
