//! Structured view of a product detail page
//!
//! The HTML is walked once with `scraper`; every region listed in
//! `PageSelectors::excluded` (reviews, sponsored widgets, scripts) is skipped,
//! including when it is nested inside an otherwise relevant section.

use scraper::{ElementRef, Html, Selector};

use super::config::CompiledSelectors;
use super::text::normalize_whitespace;

/// One label/value row from a details table or detail-bullet list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRow {
    /// Lower-case label without trailing colon
    pub label: String,
    pub value: String,
}

impl SpecRow {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: normalize_label(label),
            value: normalize_whitespace(value),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Product title as found, before cleanup
    pub title: String,
    /// The `<title>` element, kept apart because storefronts decorate it
    pub document_title: String,
    pub byline: Vec<String>,
    pub authors: Vec<String>,
    pub spec_rows: Vec<SpecRow>,
    /// Full text of the structured details sections
    pub spec_text: String,
    pub bullets: Vec<String>,
    pub description: String,
    pub breadcrumbs: String,
    /// Manufacturer, importer and packer contact text
    pub contact_text: Vec<String>,
}

impl ParsedPage {
    pub fn parse(html: &str, selectors: &CompiledSelectors) -> Self {
        let document = Html::parse_document(html);
        let walker = Walker {
            excluded: &selectors.excluded,
        };

        let document_title = document
            .select(&selectors.document_title)
            .next()
            .map(|el| walker.text(el))
            .unwrap_or_default();

        let title = walker
            .first_text(&document, &selectors.title)
            .or_else(|| {
                document
                    .select(&selectors.og_title)
                    .next()
                    .and_then(|el| el.value().attr("content"))
                    .map(normalize_whitespace)
                    .filter(|t| !t.is_empty())
            })
            .unwrap_or_else(|| document_title.clone());

        let byline = selectors
            .byline
            .iter()
            .filter_map(|s| walker.first_text(&document, std::slice::from_ref(s)))
            .collect();
        let authors = walker.all_texts(&document, &selectors.author);

        let mut spec_rows = Vec::new();
        for row_selector in &selectors.spec_rows {
            for row in document.select(row_selector) {
                if walker.is_excluded(row) {
                    continue;
                }
                if let Some(spec) = walker.table_row(row, selectors) {
                    push_unique(&mut spec_rows, spec);
                }
            }
        }
        for bullet_selector in &selectors.detail_bullets {
            for item in document.select(bullet_selector) {
                if walker.is_excluded(item) {
                    continue;
                }
                let text = walker.text(item);
                if let Some((label, value)) = text.split_once(':') {
                    if !label.trim().is_empty() && !value.trim().is_empty() {
                        push_unique(&mut spec_rows, SpecRow::new(label, value));
                    }
                }
            }
        }

        let spec_text = walker.all_texts(&document, &selectors.spec_sections).join(" | ");
        let bullets = walker.all_texts(&document, &selectors.feature_bullets);
        let description = walker.all_texts(&document, &selectors.description).join(" ");
        let breadcrumbs = walker.all_texts(&document, &selectors.breadcrumbs).join(" ");

        let mut contact_text = walker.all_texts(&document, &selectors.contact_blocks);
        contact_text.extend(
            spec_rows
                .iter()
                .filter(|r| is_contact_label(&r.label))
                .map(|r| r.value.clone()),
        );

        Self {
            title,
            document_title,
            byline,
            authors,
            spec_rows,
            spec_text,
            bullets,
            description,
            breadcrumbs,
            contact_text,
        }
    }

    /// First row whose label contains `needle`
    pub fn spec_value(&self, needle: &str) -> Option<&SpecRow> {
        self.spec_rows.iter().find(|r| r.label.contains(needle))
    }

    pub fn bullets_text(&self) -> String {
        self.bullets.join(" | ")
    }

    /// Descriptive text used for category detection
    pub fn content_text(&self) -> String {
        format!("{} {}", self.breadcrumbs, self.description).trim().to_string()
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

struct Walker<'a> {
    excluded: &'a [Selector],
}

impl Walker<'_> {
    fn is_excluded(&self, element: ElementRef<'_>) -> bool {
        std::iter::once(element)
            .chain(element.ancestors().filter_map(ElementRef::wrap))
            .any(|el| self.excluded.iter().any(|s| s.matches(&el)))
    }

    fn text(&self, element: ElementRef<'_>) -> String {
        let mut out = String::new();
        self.collect(element, &mut out);
        normalize_whitespace(&out)
    }

    fn collect(&self, element: ElementRef<'_>, out: &mut String) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                out.push_str(text);
                out.push(' ');
            } else if let Some(child_element) = ElementRef::wrap(child) {
                if self.excluded.iter().any(|s| s.matches(&child_element)) {
                    continue;
                }
                self.collect(child_element, out);
            }
        }
    }

    fn first_text(&self, document: &Html, selectors: &[Selector]) -> Option<String> {
        selectors.iter().find_map(|selector| {
            document
                .select(selector)
                .filter(|el| !self.is_excluded(*el))
                .map(|el| self.text(el))
                .find(|t| !t.is_empty())
        })
    }

    fn all_texts(&self, document: &Html, selectors: &[Selector]) -> Vec<String> {
        let mut texts: Vec<String> = Vec::new();
        for selector in selectors {
            for element in document.select(selector) {
                if self.is_excluded(element) {
                    continue;
                }
                let text = self.text(element);
                if !text.is_empty() && !texts.iter().any(|t| t.contains(&text)) {
                    texts.push(text);
                }
            }
        }
        texts
    }

    fn table_row(&self, row: ElementRef<'_>, selectors: &CompiledSelectors) -> Option<SpecRow> {
        let label = row.select(&selectors.row_label).next()?;
        let value = row.select(&selectors.row_value).last()?;
        if label == value {
            return None;
        }
        let label = self.text(label);
        let value = self.text(value);
        (!label.is_empty() && !value.is_empty()).then(|| SpecRow::new(&label, &value))
    }
}

fn normalize_label(label: &str) -> String {
    normalize_whitespace(label)
        .trim_end_matches([':', ' '])
        .trim()
        .to_lowercase()
}

fn is_contact_label(label: &str) -> bool {
    ["manufacturer", "importer", "packer", "distributor", "contact"]
        .iter()
        .any(|k| label.contains(k))
}

fn push_unique(rows: &mut Vec<SpecRow>, row: SpecRow) {
    if !rows.contains(&row) {
        rows.push(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::parsing::config::PageSelectors;

    const PAGE: &str = r#"
        <html><head><title>Amazon.co.uk: Whey Protein 1kg : Health &amp; Personal Care</title></head>
        <body>
          <span id="productTitle">  Whey   Protein Powder 1kg </span>
          <a id="bylineInfo">Visit the Myprotein Store</a>
          <div id="feature-bullets"><ul><li>25g protein per serving</li><li>Made in the UK</li></ul></div>
          <div id="prodDetails">
            <table id="productDetails_techSpec_section_1">
              <tr><th>Item Weight</th><td>1 kg</td></tr>
              <tr><th>Manufacturer</th><td>The Hut Group, Manchester, M90 3DQ</td></tr>
            </table>
          </div>
          <div id="detailBullets_feature_div"><ul>
            <li><span>Country of origin &#x200f; : &#x200e;</span><span>United Kingdom</span></li>
          </ul></div>
          <div id="customerReviews">
            <table class="a-keyvalue"><tr><th>Item Weight</th><td>9 kg</td></tr></table>
            Made in China, said one reviewer
          </div>
          <div id="productDescription">Premium <script>var x = "captcha";</script> protein blend</div>
          <div id="wayfinding-breadcrumbs_feature_div">Health &amp; Personal Care › Sports Nutrition</div>
        </body></html>"#;

    fn parse(html: &str) -> ParsedPage {
        let selectors = CompiledSelectors::compile(&PageSelectors::default()).unwrap();
        ParsedPage::parse(html, &selectors)
    }

    #[test]
    fn reads_structured_regions() {
        let page = parse(PAGE);
        assert_eq!(page.title, "Whey Protein Powder 1kg");
        assert!(page.document_title.starts_with("Amazon.co.uk:"));
        assert_eq!(page.byline, vec!["Visit the Myprotein Store".to_string()]);
        assert_eq!(page.spec_value("item weight").map(|r| r.value.as_str()), Some("1 kg"));
        assert_eq!(
            page.spec_value("country of origin").map(|r| r.value.as_str()),
            Some("United Kingdom")
        );
        assert_eq!(page.bullets.len(), 2);
        assert!(page.content_text().contains("Sports Nutrition"));
        assert!(page.contact_text.iter().any(|t| t.contains("Manchester")));
    }

    #[test]
    fn skips_reviews_and_scripts() {
        let page = parse(PAGE);
        assert!(!page.spec_rows.iter().any(|r| r.value == "9 kg"));
        assert!(!page.spec_text.contains("China"));
        assert_eq!(page.description, "Premium protein blend");
    }

    #[test]
    fn falls_back_to_og_title_then_document_title() {
        let page = parse(r#"<html><head><title>Doc</title><meta property="og:title" content="OG Title"></head></html>"#);
        assert_eq!(page.title, "OG Title");

        let page = parse("<html><head><title>Doc</title></head><body></body></html>");
        assert_eq!(page.title, "Doc");
        assert!(page.has_title());

        assert!(!parse("<html><body><p>nothing</p></body></html>").has_title());
    }
}
