use crate::model::{Framework, Issue, Severity};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of the canonical-tag check for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    /// Canonical points at the page itself
    Ok,
    /// No canonical tag
    Missing,
    /// Canonical points at a different URL
    Other,
    /// Canonical tag present but unusable (empty href)
    Error,
}

/// One heading element in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// One `<link hreflang>` alternate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HreflangTag {
    pub lang: String,
    pub href: String,
}

/// Complete analysis of one normalized URL
///
/// Built by the page pipeline during the crawl, then enriched once by the
/// site analyzer with cross-page issues and graph metrics.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub url: String,
    pub status_code: u16,
    /// Seconds until response headers arrived
    pub ttfb: f64,
    pub content_type: String,
    pub content_length: usize,

    pub title: String,
    pub title_length: usize,
    pub description: String,
    pub description_length: usize,
    pub h1_list: Vec<String>,
    pub h1_count: usize,
    pub headings: Vec<Heading>,
    pub word_count: usize,
    pub text_html_ratio: f64,
    pub content_hash: String,

    pub canonical: String,
    pub canonical_absolute: String,
    /// `None` only when the page never reached the analyzer
    pub canonical_status: Option<CanonicalStatus>,
    pub canonical_target_status: u16,

    pub meta_robots: String,
    pub x_robots_tag: String,
    pub is_indexable: bool,

    pub internal_links: usize,
    pub external_links: usize,
    pub internal_link_urls: Vec<String>,
    pub external_link_urls: Vec<String>,
    pub empty_href_links: usize,
    pub internal_links_nofollow: usize,
    pub broken_links_on_page: Vec<String>,
    pub broken_internal_links: usize,
    pub broken_external_links: usize,
    pub inlink_count: usize,
    pub is_dead_end: bool,
    pub internal_pagerank: f64,

    pub images_total: usize,
    pub images_missing_alt: usize,
    pub images_empty_alt: usize,
    pub images_missing_dimensions: usize,
    pub images_broken: usize,
    pub images_large: usize,

    pub has_schema: bool,
    pub schema_types: Vec<String>,
    pub has_microdata: bool,
    pub has_og: bool,
    pub og_tags: BTreeMap<String, String>,
    pub has_twitter_card: bool,

    pub has_viewport: bool,
    pub has_charset: bool,
    pub charset_value: String,
    pub has_mixed_content: bool,
    pub has_lang: bool,
    pub lang_value: String,
    pub has_hreflang: bool,
    pub hreflang_tags: Vec<HreflangTag>,

    pub redirect_chain: Vec<String>,
    pub redirect_type: u16,
    pub response_headers: BTreeMap<String, String>,
    pub has_hsts: bool,
    pub tls_fallback: bool,
    pub crawl_depth: u32,

    pub detected_framework: Option<Framework>,
    pub js_render_warning: bool,
    pub error_message: String,
    pub issues: Vec<Issue>,

    /// Whitespace-collapsed visible text, capped, for similarity checks
    #[serde(skip)]
    pub content_text: String,
    /// Parsed JSON-LD blocks; `None` marks a block that failed to parse
    #[serde(skip)]
    pub json_ld: Vec<Option<serde_json::Value>>,
}

impl PageResult {
    /// Creates an empty result for a URL about to be fetched
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            crawl_depth: depth,
            is_indexable: true,
            ..Self::default()
        }
    }

    pub fn push_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn has_critical(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    pub fn has_issue(&self, code: crate::model::IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}
