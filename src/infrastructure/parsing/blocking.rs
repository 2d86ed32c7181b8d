//! Anti-bot interstitial detection
//!
//! Every strategy consults the detector before extracting anything from a
//! fetched document. A positive verdict means the page carries no product data.

use regex::Regex;

/// Phrases that only appear on challenge / denial pages
pub const BLOCKING_PHRASES: &[&str] = &[
    "captcha",
    "unusual traffic",
    "verify you are human",
    "verify that you are human",
    "are you a robot",
    "robot check",
    "access denied",
    "request blocked",
    "enter the characters you see below",
    "type the characters you see in this image",
    "to discuss automated access",
    "sorry, we just need to make sure you're not a robot",
    "automated queries",
];

/// Documents shorter than this cannot be a product page
pub const MIN_DOCUMENT_BYTES: usize = 500;

/// How much of the document the abbreviated mobile check looks at
const QUICK_CHECK_BYTES: usize = 16 * 1024;

pub struct BlockingDetector {
    script: Regex,
    title: Regex,
    min_document_bytes: usize,
}

impl BlockingDetector {
    pub fn new() -> Self {
        Self {
            script: Regex::new(r"(?is)<script\b.*?</script>").expect("static regex"),
            title: Regex::new(r#"(?i)<title[\s>]|id\s*=\s*["']producttitle["']|property\s*=\s*["']og:title["']"#)
                .expect("static regex"),
            min_document_bytes: MIN_DOCUMENT_BYTES,
        }
    }

    /// Full check: blocking phrases in visible markup, implausibly short documents, missing titles.
    /// Returns the reason when the document is a block page.
    pub fn detect(&self, html: &str) -> Option<String> {
        if html.trim().len() < self.min_document_bytes {
            return Some(format!("document too short ({} bytes)", html.trim().len()));
        }
        if let Some(phrase) = self.find_phrase(&self.script.replace_all(html, " ")) {
            return Some(format!("blocking phrase '{phrase}'"));
        }
        if !self.title.is_match(html) {
            return Some("document has no title".to_string());
        }
        None
    }

    /// Abbreviated check used by lightweight strategies: phrases in the head of the document only
    pub fn quick_check(&self, html: &str) -> Option<String> {
        if html.trim().is_empty() {
            return Some("empty document".to_string());
        }
        let mut end = html.len().min(QUICK_CHECK_BYTES);
        while !html.is_char_boundary(end) {
            end -= 1;
        }
        self.find_phrase(&self.script.replace_all(&html[..end], " "))
            .map(|phrase| format!("blocking phrase '{phrase}'"))
    }

    fn find_phrase(&self, markup: &str) -> Option<&'static str> {
        let lower = markup.to_lowercase();
        BLOCKING_PHRASES.iter().copied().find(|p| lower.contains(p))
    }
}

impl Default for BlockingDetector {
    fn default() -> Self {
        Self::new()
    }
}
