use serde::Deserialize;

/// Main configuration structure for an audit run
///
/// Every section and key is optional; missing values fall back to the
/// defaults documented on each field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub crawler: CrawlerConfig,
    pub limits: LimitsConfig,
    pub timeouts: TimeoutsConfig,
    pub thresholds: ThresholdsConfig,
}

impl AuditConfig {
    /// Preset for resource-constrained deployments (small containers,
    /// free-tier hosts): fewer workers and tighter caps everywhere.
    pub fn constrained() -> Self {
        Self {
            crawler: CrawlerConfig {
                workers: 3,
                ..CrawlerConfig::default()
            },
            limits: LimitsConfig {
                max_html_bytes: 2 * 1024 * 1024,
                max_image_checks_per_page: 3,
                max_total_resource_checks: 60,
                max_similarity_pairs: 2500,
                max_external_checks: 200,
                max_uncrawled_status_checks: 250,
                ..LimitsConfig::default()
            },
            timeouts: TimeoutsConfig {
                resource_secs: 4,
                ..TimeoutsConfig::default()
            },
            thresholds: ThresholdsConfig::default(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of pages committed to the result (default 50)
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Maximum link depth from the seed URL (default 5)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Politeness delay after every batch, in milliseconds (default 300)
    #[serde(rename = "crawl-delay-ms")]
    pub crawl_delay_ms: u64,

    /// Skip links disallowed for the wildcard agent (default true)
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,

    /// Resolve the status of external link targets (default false)
    #[serde(rename = "check-external")]
    pub check_external: bool,

    /// Pages fetched concurrently per batch (default 5)
    pub workers: usize,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Retries on 5xx responses for GET/HEAD (default 2)
    #[serde(rename = "max-retries")]
    pub max_retries: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_depth: 5,
            crawl_delay_ms: 300,
            respect_robots: true,
            check_external: false,
            workers: 5,
            user_agent: concat!(
                "Mozilla/5.0 (compatible; site-audit/",
                env!("CARGO_PKG_VERSION"),
                ")"
            )
            .to_string(),
            max_retries: 2,
        }
    }
}

/// Size and budget limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Bytes of HTML read per page before the body is cut off
    #[serde(rename = "max-html-bytes")]
    pub max_html_bytes: usize,

    /// Characters of extracted text kept per page for similarity checks
    #[serde(rename = "max-content-text-chars")]
    pub max_content_text_chars: usize,

    /// Image resources probed per page
    #[serde(rename = "max-image-checks-per-page")]
    pub max_image_checks_per_page: usize,

    /// Distinct resources probed across the whole crawl
    #[serde(rename = "max-total-resource-checks")]
    pub max_total_resource_checks: usize,

    /// Text comparisons allowed in near-duplicate detection
    #[serde(rename = "max-similarity-pairs")]
    pub max_similarity_pairs: usize,

    /// External link targets resolved when external checks are on
    #[serde(rename = "max-external-checks")]
    pub max_external_checks: usize,

    /// Internal link targets outside the crawl whose status is resolved
    #[serde(rename = "max-uncrawled-status-checks")]
    pub max_uncrawled_status_checks: usize,

    /// Sitemap files fetched, including those listed by sitemap indexes
    #[serde(rename = "max-sitemap-files")]
    pub max_sitemap_files: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_html_bytes: 5 * 1024 * 1024,
            max_content_text_chars: 12_000,
            max_image_checks_per_page: 8,
            max_total_resource_checks: 200,
            max_similarity_pairs: 7_000,
            max_external_checks: 400,
            max_uncrawled_status_checks: 500,
            max_sitemap_files: 50,
        }
    }
}

/// Request timeouts, in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Full page fetch (default 15)
    #[serde(rename = "page-secs")]
    pub page_secs: u64,

    /// Status-only checks and pre-checks (default 8)
    #[serde(rename = "status-secs")]
    pub status_secs: u64,

    /// Image resource probes (default 6)
    #[serde(rename = "resource-secs")]
    pub resource_secs: u64,

    /// TCP/TLS connect (default 10)
    #[serde(rename = "connect-secs")]
    pub connect_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            page_secs: 15,
            status_secs: 8,
            resource_secs: 6,
            connect_secs: 10,
        }
    }
}

/// Tunable thresholds for per-page checks
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    #[serde(rename = "title-min")]
    pub title_min: usize,

    #[serde(rename = "title-max")]
    pub title_max: usize,

    #[serde(rename = "description-min")]
    pub description_min: usize,

    #[serde(rename = "description-max")]
    pub description_max: usize,

    /// Seconds to first byte before a warning
    #[serde(rename = "ttfb-warning")]
    pub ttfb_warning: f64,

    /// Seconds to first byte before a critical issue
    #[serde(rename = "ttfb-critical")]
    pub ttfb_critical: f64,

    /// Word count under which a page is thin
    #[serde(rename = "thin-words")]
    pub thin_words: usize,

    /// Word count under which a page is very thin
    #[serde(rename = "very-thin-words")]
    pub very_thin_words: usize,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            title_min: 20,
            title_max: 70,
            description_min: 70,
            description_max: 160,
            ttfb_warning: 1.5,
            ttfb_critical: 3.0,
            thin_words: 300,
            very_thin_words: 100,
        }
    }
}
