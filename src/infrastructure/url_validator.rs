//! Product URL validation and normalization
//!
//! Validates that a URL points at a supported storefront product-detail page,
//! strips tracking parameters, derives the mobile form and search-fallback
//! terms, and orders the URL candidates the strategies try.

use regex::Regex;
use std::sync::Arc;
use url::Url;

use crate::domain::errors::ScrapeError;
use crate::domain::product_url::{ProductUrl, UrlCandidate, UrlType, UrlValidation, UrlVariant};
use crate::infrastructure::reference_data::ReferenceData;

const MAX_SEARCH_TERMS: usize = 5;
const MIN_TERM_LEN: usize = 3;

/// Path segments that carry routing rather than product words
const TECHNICAL_SEGMENTS: &[&str] = &[
    "dp", "gp", "product", "aw", "d", "s", "ref", "www", "html", "amp", "offer-listing", "stores", "b", "node",
];

pub struct UrlValidator {
    data: Arc<ReferenceData>,
    product_path: Regex,
    search_path: Regex,
    product_id: Regex,
}

impl UrlValidator {
    pub fn new(data: Arc<ReferenceData>) -> Self {
        Self {
            data,
            product_path: Regex::new(r"/(?:dp|gp/product|gp/aw/d|product)/([A-Za-z0-9]{10})(?:[/?#]|$)")
                .expect("static regex"),
            search_path: Regex::new(r"^/s(?:/|$)").expect("static regex"),
            product_id: Regex::new(r"^[A-Z0-9]{10}$").expect("static regex"),
        }
    }

    /// Structured validation; never fails
    pub fn validate(&self, url: &str) -> UrlValidation {
        let mut issues = Vec::new();
        let trimmed = url.trim();

        if trimmed.is_empty() {
            issues.push("URL is empty".to_string());
            return UrlValidation { is_valid: false, domain: None, url_type: UrlType::Other, issues };
        }

        let parsed = match Url::parse(trimmed) {
            Ok(parsed) => parsed,
            Err(e) => {
                issues.push(format!("URL could not be parsed: {e}"));
                return UrlValidation { is_valid: false, domain: None, url_type: UrlType::Other, issues };
            }
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            issues.push(format!("Unsupported scheme: {}", parsed.scheme()));
        }

        let domain = parsed.host_str().map(strip_www);
        let supported = domain.as_deref().is_some_and(|d| self.is_supported_domain(d));
        if !supported {
            issues.push(format!("Unsupported domain: {}", domain.as_deref().unwrap_or("<none>")));
        }

        let url_type = if self.product_path.is_match(parsed.path()) {
            UrlType::ProductDetail
        } else if self.search_path.is_match(parsed.path()) {
            UrlType::Search
        } else {
            UrlType::Other
        };
        if url_type != UrlType::ProductDetail {
            issues.push("No product-detail path segment (/dp/, /gp/product/, /product/, /gp/aw/d/)".to_string());
        }

        UrlValidation {
            is_valid: issues.is_empty(),
            domain,
            url_type,
            issues,
        }
    }

    /// Parse into a `ProductUrl`, or `InvalidInput` when validation fails
    pub fn parse(&self, url: &str) -> Result<ProductUrl, ScrapeError> {
        let validation = self.validate(url);
        if !validation.is_valid {
            return Err(ScrapeError::invalid_input(url, validation.issues.join("; ")));
        }
        let parsed = Url::parse(url.trim()).map_err(|e| ScrapeError::invalid_input(url, e.to_string()))?;
        let captures = self
            .product_path
            .captures(parsed.path())
            .ok_or_else(|| ScrapeError::invalid_input(url, "no product identifier"))?;
        let whole = captures.get(0).map_or("", |m| m.as_str());
        let product_id = captures.get(1).map_or("", |m| m.as_str()).to_uppercase();

        Ok(ProductUrl {
            raw: url.trim().to_string(),
            domain: validation.domain.unwrap_or_default(),
            path_segment: whole.trim_end_matches(['/', '?', '#']).to_string(),
            product_id,
        })
    }

    /// True when the URL is at least an absolute http(s) URL
    pub fn is_well_formed(&self, url: &str) -> bool {
        Url::parse(url.trim()).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
    }

    pub fn is_supported_domain(&self, host: &str) -> bool {
        let host = strip_www(&host.to_lowercase());
        self.data
            .url_rules
            .supported_domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }

    /// Strip tracking query parameters; path and other parameters are kept.
    /// Idempotent: `clean(clean(u)) == clean(u)`.
    pub fn clean(&self, url: &str) -> String {
        let Ok(mut parsed) = Url::parse(url.trim()) else {
            return url.trim().to_string();
        };

        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| !self.is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(kept.iter());
        }
        parsed.to_string()
    }

    fn is_tracking_param(&self, key: &str) -> bool {
        let key = key.to_lowercase();
        self.data.url_rules.tracking_params.iter().any(|p| {
            let p = p.to_lowercase();
            match p.strip_suffix('*') {
                Some(prefix) => key.starts_with(prefix),
                None => key == p,
            }
        })
    }

    /// Product identifier from any supported product path
    pub fn extract_product_id(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url.trim()).ok()?;
        let id = self.product_path.captures(parsed.path())?.get(1)?.as_str().to_uppercase();
        self.product_id.is_match(&id).then_some(id)
    }

    /// Rewrite a desktop product URL into the mobile `/gp/aw/d/{ID}` form.
    /// Returns the input unchanged when no identifier is present.
    pub fn to_mobile(&self, url: &str) -> String {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return url.to_string();
        };
        let (Some(id), Some(host)) = (self.extract_product_id(url), parsed.host_str()) else {
            return url.to_string();
        };
        format!("{}://{}/gp/aw/d/{}", parsed.scheme(), host, id)
    }

    /// Up to five lower-cased product words from the path slug and `keywords` parameter
    pub fn extract_search_terms(&self, url: &str) -> Vec<String> {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return Vec::new();
        };
        let product_id = self.extract_product_id(url).map(|id| id.to_lowercase());

        let mut raw_terms: Vec<String> = Vec::new();
        for segment in parsed.path_segments().into_iter().flatten() {
            let segment = segment.to_lowercase();
            if segment.is_empty()
                || segment.contains('=')
                || TECHNICAL_SEGMENTS.contains(&segment.as_str())
                || product_id.as_deref() == Some(segment.as_str())
            {
                continue;
            }
            let decoded = urlencoding_decode(&segment);
            raw_terms.extend(decoded.split(['-', '_', '+', ' ', '.']).map(str::to_string));
        }
        for (key, value) in parsed.query_pairs() {
            if key == "keywords" || key == "k" {
                raw_terms.extend(value.split([' ', '+', '-']).map(str::to_lowercase));
            }
        }

        let mut terms: Vec<String> = Vec::new();
        for term in raw_terms {
            let term = term.trim().to_lowercase();
            if term.chars().count() < MIN_TERM_LEN || term.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            if !terms.contains(&term) {
                terms.push(term);
            }
            if terms.len() == MAX_SEARCH_TERMS {
                break;
            }
        }
        terms
    }

    /// Candidate URLs in fixed priority order, skipping duplicates
    pub fn candidates(&self, url: &str) -> Vec<UrlCandidate> {
        let direct = url.trim().to_string();
        let cleaned = self.clean(&direct);
        let mobile = self.to_mobile(&cleaned);
        let search = self.search_url(&direct);

        let mut out: Vec<UrlCandidate> = Vec::new();
        let ordered = [
            (UrlVariant::Direct, Some(direct)),
            (UrlVariant::Cleaned, Some(cleaned)),
            (UrlVariant::Mobile, Some(mobile)),
            (UrlVariant::SearchFallback, search),
        ];
        for (priority, (variant, candidate)) in ordered.into_iter().enumerate() {
            let Some(candidate) = candidate else { continue };
            if out.iter().any(|c| c.url == candidate) {
                continue;
            }
            out.push(UrlCandidate {
                variant,
                url: candidate,
                priority: priority as u8 + 1,
            });
        }
        out
    }

    /// Storefront search URL built from the extracted terms
    pub fn search_url(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url.trim()).ok()?;
        let host = parsed.host_str()?;
        let terms = self.extract_search_terms(url);
        if terms.is_empty() {
            return None;
        }
        let mut search = Url::parse(&format!("{}://{}/s", parsed.scheme(), host)).ok()?;
        search.query_pairs_mut().append_pair("k", &terms.join(" "));
        Some(search.to_string())
    }
}

fn strip_www(host: &str) -> String {
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

fn urlencoding_decode(segment: &str) -> String {
    url::form_urlencoded::parse(format!("x={segment}").as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| segment.to_string())
}
