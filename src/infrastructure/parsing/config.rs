//! Parsing configuration for product detail pages
//!
//! Centralized CSS selectors, each field an ordered list of fallbacks.

use anyhow::Result;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// CSS selectors for storefront product detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSelectors {
    pub title: Vec<String>,
    /// Byline / brand regions, most specific first
    pub byline: Vec<String>,
    /// Book author regions; text here is never a brand
    pub author: Vec<String>,
    /// Key/value rows of the technical details and product information tables
    pub spec_rows: Vec<String>,
    /// Bulleted "detail bullets" entries shaped like `Label : Value`
    pub detail_bullets: Vec<String>,
    /// Whole structured sections whose text is searched by the regex rules
    pub spec_sections: Vec<String>,
    pub feature_bullets: Vec<String>,
    pub description: Vec<String>,
    pub breadcrumbs: Vec<String>,
    /// Manufacturer / importer / packer contact blocks
    pub contact_blocks: Vec<String>,
    /// Regions never read by any extractor (reviews, sponsored widgets)
    pub excluded: Vec<String>,
}

impl Default for PageSelectors {
    fn default() -> Self {
        let v = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            title: v(&["#productTitle", "#title", "#btAsinTitle", "h1"]),
            byline: v(&[
                "#bylineInfo",
                "a#brand",
                "#brand",
                "tr.po-brand td.a-span9",
                ".po-brand .po-break-word",
                "#bylineInfo_feature_div a",
            ]),
            author: v(&[".author a", ".contributorNameID", "#bylineInfo .author"]),
            spec_rows: v(&[
                "#productDetails_techSpec_section_1 tr",
                "#productDetails_techSpec_section_2 tr",
                "#productDetails_detailBullets_sections1 tr",
                "#technicalSpecifications_section_1 tr",
                "#productOverview_feature_div tr",
                "#prodDetails tr",
                "table.a-keyvalue tr",
            ]),
            detail_bullets: v(&["#detailBullets_feature_div li", "#detailBulletsWrapper_feature_div li"]),
            spec_sections: v(&[
                "#prodDetails",
                "#productDetails_feature_div",
                "#detailBullets_feature_div",
                "#detailBulletsWrapper_feature_div",
                "#technicalSpecifications_feature_div",
                "#productOverview_feature_div",
            ]),
            feature_bullets: v(&["#feature-bullets li", "#featurebullets_feature_div li", "#feature-bullets-btf li"]),
            description: v(&["#productDescription", "#bookDescription_feature_div", "#aplus_feature_div", "#aplus"]),
            breadcrumbs: v(&[
                "#wayfinding-breadcrumbs_feature_div",
                "#wayfinding-breadcrumbs_container",
                ".a-breadcrumb",
            ]),
            contact_blocks: v(&[
                "#importantInformation_feature_div",
                "#manufacturerInfo_feature_div",
                "#productSafety_feature_div",
            ]),
            excluded: v(&[
                "#reviewsMedley",
                "#customerReviews",
                "#cm-cr-dp-review-list",
                "#sp_detail",
                "#sp_detail2",
                ".sponsored",
                "[data-component-type='sp-sponsored-result']",
                "script",
                "style",
                "noscript",
            ]),
        }
    }
}

/// `PageSelectors` compiled once and reused for every page
#[derive(Debug)]
pub struct CompiledSelectors {
    pub title: Vec<Selector>,
    pub byline: Vec<Selector>,
    pub author: Vec<Selector>,
    pub spec_rows: Vec<Selector>,
    pub detail_bullets: Vec<Selector>,
    pub spec_sections: Vec<Selector>,
    pub feature_bullets: Vec<Selector>,
    pub description: Vec<Selector>,
    pub breadcrumbs: Vec<Selector>,
    pub contact_blocks: Vec<Selector>,
    pub excluded: Vec<Selector>,
    pub og_title: Selector,
    pub document_title: Selector,
    pub row_label: Selector,
    pub row_value: Selector,
}

impl CompiledSelectors {
    pub fn compile(selectors: &PageSelectors) -> Result<Self> {
        Ok(Self {
            title: compile_selectors(&selectors.title)?,
            byline: compile_selectors(&selectors.byline)?,
            author: compile_selectors(&selectors.author)?,
            spec_rows: compile_selectors(&selectors.spec_rows)?,
            detail_bullets: compile_selectors(&selectors.detail_bullets)?,
            spec_sections: compile_selectors(&selectors.spec_sections)?,
            feature_bullets: compile_selectors(&selectors.feature_bullets)?,
            description: compile_selectors(&selectors.description)?,
            breadcrumbs: compile_selectors(&selectors.breadcrumbs)?,
            contact_blocks: compile_selectors(&selectors.contact_blocks)?,
            excluded: compile_selectors(&selectors.excluded)?,
            og_title: parse_one("meta[property='og:title']")?,
            document_title: parse_one("title")?,
            row_label: parse_one("th, td.a-span3, td:first-child")?,
            row_value: parse_one("td")?,
        })
    }
}

fn parse_one(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| anyhow::anyhow!("Invalid selector '{selector}': {e}"))
}

/// Compile selector strings, skipping invalid ones unless none survive
fn compile_selectors(selector_strings: &[String]) -> Result<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                errors.push(format!("'{selector_str}': {e}"));
            }
        }
    }

    if selectors.is_empty() && !selector_strings.is_empty() {
        return Err(anyhow::anyhow!(
            "No valid selectors compiled from {} attempts. Errors: {}",
            selector_strings.len(),
            errors.join(", ")
        ));
    }

    Ok(selectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selectors_compile() {
        let compiled = CompiledSelectors::compile(&PageSelectors::default()).unwrap();
        assert_eq!(compiled.title.len(), 4);
        assert!(!compiled.excluded.is_empty());
    }

    #[test]
    fn invalid_selectors_are_skipped_unless_all_fail() {
        let selectors = PageSelectors {
            title: vec!["###".to_string(), "#productTitle".to_string()],
            ..Default::default()
        };
        assert_eq!(CompiledSelectors::compile(&selectors).unwrap().title.len(), 1);

        let selectors = PageSelectors {
            title: vec!["###".to_string()],
            ..Default::default()
        };
        assert!(CompiledSelectors::compile(&selectors).is_err());
    }
}
