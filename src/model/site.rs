use crate::model::{Category, Framework, PageResult, Severity};
use crate::report::{Recommendation, ScoreCategory, ScoreExplanation};
use crate::robots::{RobotsRule, SitemapEntry};
use serde::Serialize;
use std::collections::BTreeMap;

/// Whether the site answers consistently on its www and bare host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WwwConsistency {
    /// The alternate host redirects to the www host
    Www,
    /// The alternate host redirects to the bare host
    NonWww,
    /// Both hosts serve content without redirecting to one another
    Inconsistent,
    /// The alternate host could not be checked
    #[default]
    Unknown,
}

/// URLs sharing one exact value (title, description or content)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeepPage {
    pub url: String,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectEntry {
    pub chain: Vec<String>,
    pub hops: usize,
    #[serde(rename = "type")]
    pub redirect_type: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenLink {
    pub source: String,
    pub broken_url: String,
    pub status_code: u16,
}

/// Raw spellings of links that normalize to the same URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlVariants {
    pub normalized: String,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThinCluster {
    pub directory: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapComparison {
    pub only_in_sitemap: Vec<String>,
    pub only_in_crawl: Vec<String>,
    pub sitemap_total: usize,
    pub crawled_total: usize,
    pub overlap: usize,
}

/// A canonical pointer followed across more than one hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalChain {
    pub chain: Vec<String>,
    pub length: usize,
    /// The walk ended on a node it had already visited
    pub cycle: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalConflict {
    pub url: String,
    pub canonical: String,
    pub canonical_norm: String,
}

/// Missing required structured-data fields on one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaFinding {
    pub url: String,
    #[serde(rename = "type")]
    pub schema_type: String,
    pub missing: Vec<String>,
}

/// The crawl-wide audit aggregate
///
/// Fully populated only after both the site analyzer and the scorer ran.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAuditResult {
    pub base_url: String,
    pub domain: String,
    pub pages: BTreeMap<String, PageResult>,
    /// Seconds spent crawling and analyzing
    pub duration: f64,
    pub total_scanned: usize,

    pub sitemap_entries: Vec<SitemapEntry>,
    pub sitemap_raw: String,
    pub robots_txt_content: String,
    pub robots_rules: Vec<RobotsRule>,
    pub robots_sitemaps: Vec<String>,
    pub robots_host: Option<String>,
    pub robots_has_clean_param: bool,
    pub robots_linked_blocked: Vec<String>,

    pub ssl_valid: bool,
    pub ssl_error: String,
    pub http_to_https: bool,
    pub www_consistency: WwwConsistency,
    pub homepage_status_code: u16,
    pub homepage_ttfb: f64,
    pub homepage_headers: BTreeMap<String, String>,
    pub has_llms_txt: bool,
    pub llms_txt_content: String,
    pub detected_frameworks: Vec<Framework>,

    pub duplicate_titles: Vec<DuplicateGroup>,
    pub duplicate_descriptions: Vec<DuplicateGroup>,
    pub duplicate_content: Vec<DuplicateGroup>,
    pub orphan_pages: Vec<String>,
    pub deep_pages: Vec<DeepPage>,
    pub zero_inlink_pages: Vec<String>,
    pub noindex_linked_pages: Vec<String>,
    pub redirect_map: Vec<RedirectEntry>,
    pub broken_link_map: Vec<BrokenLink>,
    pub url_pattern_duplicates: Vec<UrlVariants>,
    pub thin_content_clusters: Vec<ThinCluster>,
    pub sitemap_vs_crawled: SitemapComparison,
    pub no_structured_data: bool,
    pub dead_end_pages: Vec<String>,

    pub avg_inlinks: f64,
    pub max_inlinks: usize,
    pub median_inlinks: f64,
    pub pages_low_inlinks: Vec<String>,
    pub canonical_chains: Vec<CanonicalChain>,
    pub canonical_sitemap_conflicts: Vec<CanonicalConflict>,
    pub schema_validation_issues: Vec<SchemaFinding>,

    pub status_codes: BTreeMap<u16, usize>,
    pub issues_by_severity: BTreeMap<Severity, usize>,
    pub issues_by_category: BTreeMap<Category, BTreeMap<Severity, usize>>,

    pub health_score: u32,
    pub category_scores: BTreeMap<ScoreCategory, u32>,
    pub score_explanation: Option<ScoreExplanation>,
    pub recommendations: Vec<Recommendation>,
}

impl SiteAuditResult {
    pub fn new(base_url: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            domain: domain.into(),
            ssl_valid: true,
            ..Self::default()
        }
    }

    /// Total number of issues across all pages
    pub fn issue_count(&self) -> usize {
        self.pages.values().map(|p| p.issues.len()).sum()
    }
}
