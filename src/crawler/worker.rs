//! Fetch-and-analyze pipeline for a single page
//!
//! A worker never fails: fetch faults are recorded as issues on a degraded
//! page result and the crawl moves on.

use crate::analyzer::{analyze_page, apply_image_probes};
use crate::config::AuditConfig;
use crate::crawler::fetcher::{fetch_page, truncate, FetchError, FetchedPage, HttpClients};
use crate::crawler::resources::ResourceCache;
use crate::model::{Category, Issue, IssueCode, PageResult, Severity};
use crate::url::{normalize_parsed, SiteScope};
use std::sync::Arc;

/// Leading characters of a body searched for a challenge page
const CHALLENGE_SNIFF_CHARS: usize = 2500;

/// A processed page and the links it contributes to the crawl
#[derive(Debug, Clone)]
pub struct PageOutcome {
    pub result: PageResult,
    /// Absolute internal targets as found on the page
    pub internal_links: Vec<String>,
    pub external_links: Vec<String>,
}

impl PageOutcome {
    fn without_links(result: PageResult) -> Self {
        Self {
            result,
            internal_links: Vec::new(),
            external_links: Vec::new(),
        }
    }
}

/// Everything a worker task needs, cheap to clone into `tokio::spawn`
#[derive(Debug, Clone)]
pub struct PageWorker {
    pub clients: HttpClients,
    pub scope: SiteScope,
    pub config: Arc<AuditConfig>,
    pub resources: Arc<ResourceCache>,
}

impl PageWorker {
    /// Fetches one URL and runs every per-page check on it
    ///
    /// # Arguments
    ///
    /// * `url` - The URL as it was queued
    /// * `depth` - Link depth from the seed
    pub async fn process(&self, url: String, depth: u32) -> PageOutcome {
        let mut result = PageResult::new(url.clone(), depth);

        let page = match fetch_page(&self.clients, &url, self.config.limits.max_html_bytes).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Fetch failed for {}: {}", url, e);
                record_fetch_error(&mut result, e, self.config.timeouts.page_secs);
                return PageOutcome::without_links(result);
            }
        };

        record_response(&mut result, &page);
        tracing::debug!(
            "Fetched {} -> {} ({}, {:.2}s)",
            url,
            result.status_code,
            result.content_type,
            result.ttfb
        );

        if !page.is_html() {
            let current = if result.content_type.is_empty() {
                "unknown".to_string()
            } else {
                result.content_type.clone()
            };
            result.push_issue(
                Issue::new(
                    Severity::Warning,
                    Category::Technical,
                    IssueCode::NonHtmlContent,
                    "Response is not text/html",
                )
                .with_values(current, "text/html"),
            );
            return PageOutcome::without_links(result);
        }

        result.content_length = page.content_length;
        if page.content_length == 0 && page.body.is_empty() {
            result.push_issue(
                Issue::new(
                    Severity::Critical,
                    Category::Technical,
                    IssueCode::EmptyResponse,
                    "The server returned an empty response",
                )
                .with_values("0 bytes", ">0 bytes"),
            );
            return PageOutcome::without_links(result);
        }

        if page.truncated {
            let kb = page.content_length / 1024;
            result.push_issue(
                Issue::new(
                    Severity::Warning,
                    Category::Technical,
                    IssueCode::LargePage,
                    format!("HTML page is too large: {}KB", kb),
                )
                .with_values(
                    format!("{}KB", kb),
                    format!("<{}KB", self.config.limits.max_html_bytes / 1024),
                ),
            );
        }

        check_access_barriers(&mut result, &page.body);
        check_x_robots(&mut result);

        let analysis = analyze_page(
            &mut result,
            &page.body,
            &page.final_url,
            &self.scope,
            &self.config,
        );

        let mut probes = Vec::with_capacity(analysis.image_probes.len());
        for src in &analysis.image_probes {
            match self.resources.probe(&self.clients, src).await {
                Some(info) => probes.push(info),
                None => break,
            }
        }
        apply_image_probes(&mut result, &probes);

        PageOutcome {
            result,
            internal_links: analysis.internal_links,
            external_links: analysis.external_links,
        }
    }
}

/// Copies the response facts onto the result
fn record_response(result: &mut PageResult, page: &FetchedPage) {
    result.url = normalize_parsed(page.final_url.clone());
    result.status_code = page.status_code;
    result.ttfb = page.ttfb;
    result.content_type = page.content_type.clone();
    result.content_length = page.content_length;
    result.response_headers = page.headers.clone();
    result.redirect_chain = page.redirect_chain.clone();
    result.redirect_type = page.redirect_type;
    result.tls_fallback = page.tls_fallback;
    result.has_hsts = page.headers.contains_key("strict-transport-security");
    if let Some(x_robots) = page.headers.get("x-robots-tag") {
        result.x_robots_tag = x_robots.clone();
    }
}

/// Turns a fetch fault into the page's issue and error message
fn record_fetch_error(result: &mut PageResult, error: FetchError, page_secs: u64) {
    let issue = match &error {
        FetchError::Tls(reason) => {
            result.error_message = truncate(reason, 200);
            Issue::new(
                Severity::Critical,
                Category::Security,
                IssueCode::SslError,
                "SSL certificate error",
            )
            .with_values(truncate(reason, 100), "valid certificate")
        }
        FetchError::Timeout => {
            result.error_message = "Timeout".to_string();
            Issue::new(
                Severity::Critical,
                Category::Technical,
                IssueCode::Timeout,
                format!("Timeout: no response within {} seconds", page_secs),
            )
        }
        FetchError::Connect(reason) => {
            result.error_message = truncate(reason, 100);
            Issue::new(
                Severity::Critical,
                Category::Technical,
                IssueCode::ConnectionError,
                "Connection error",
            )
        }
        FetchError::InvalidUrl(reason) => {
            result.error_message = truncate(reason, 150);
            Issue::new(
                Severity::Critical,
                Category::Technical,
                IssueCode::InvalidUrl,
                "Invalid URL",
            )
            .with_values(truncate(reason, 100), "valid URL")
        }
        FetchError::Redirect(_) => {
            result.error_message = "Too many redirects".to_string();
            Issue::new(
                Severity::Critical,
                Category::Technical,
                IssueCode::RedirectLoop,
                "Redirect loop",
            )
            .with_values(">5 hops", "1-2 hops")
        }
        FetchError::Other(reason) => {
            result.error_message = truncate(reason, 200);
            Issue::new(
                Severity::Critical,
                Category::Technical,
                IssueCode::ConnectionError,
                "Request failed",
            )
            .with_values(truncate(reason, 100), "200")
        }
    };
    result.push_issue(issue);
}

/// Server-side blocking and bot challenges
fn check_access_barriers(result: &mut PageResult, body: &str) {
    if matches!(result.status_code, 403 | 429) {
        let status = result.status_code.to_string();
        result.push_issue(
            Issue::new(
                Severity::Warning,
                Category::Technical,
                IssueCode::BlockedByServer,
                "The site limits crawling (403/429); raise the delay and check access",
            )
            .with_values(status, "200"),
        );
    }

    let preview = truncate(body, CHALLENGE_SNIFF_CHARS).to_lowercase();
    if preview.contains("cloudflare")
        && (preview.contains("attention required") || preview.contains("cf-challenge"))
    {
        result.push_issue(Issue::new(
            Severity::Warning,
            Category::Technical,
            IssueCode::CloudflareProtection,
            "Cloudflare protection detected; some pages may be unreachable",
        ));
    }
}

fn check_x_robots(result: &mut PageResult) {
    let directives = result.x_robots_tag.to_lowercase();
    if directives.contains("noindex") {
        result.is_indexable = false;
        result.push_issue(Issue::new(
            Severity::Info,
            Category::Technical,
            IssueCode::XrobotsNoindex,
            "X-Robots-Tag contains noindex",
        ));
    }
    if directives.contains("nofollow") {
        result.push_issue(Issue::new(
            Severity::Info,
            Category::Technical,
            IssueCode::XrobotsNofollow,
            "X-Robots-Tag contains nofollow",
        ));
    }
}

/// Result for a worker that died before producing one
pub fn crawl_error_result(url: &str, depth: u32, error: &str) -> PageResult {
    let mut result = PageResult::new(url, depth);
    result.error_message = truncate(error, 200);
    result.push_issue(Issue::new(
        Severity::Critical,
        Category::Technical,
        IssueCode::CrawlError,
        format!("Crawl error: {}", truncate(error, 100)),
    ));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_errors_map_to_issues() {
        let cases = [
            (FetchError::Timeout, IssueCode::Timeout, Category::Technical),
            (
                FetchError::Tls("bad cert".to_string()),
                IssueCode::SslError,
                Category::Security,
            ),
            (
                FetchError::Connect("refused".to_string()),
                IssueCode::ConnectionError,
                Category::Technical,
            ),
            (
                FetchError::InvalidUrl("nope".to_string()),
                IssueCode::InvalidUrl,
                Category::Technical,
            ),
            (
                FetchError::Redirect("loop".to_string()),
                IssueCode::RedirectLoop,
                Category::Technical,
            ),
            (
                FetchError::Other("body read failed".to_string()),
                IssueCode::ConnectionError,
                Category::Technical,
            ),
        ];

        for (error, code, category) in cases {
            let mut result = PageResult::new("https://example.com/", 0);
            record_fetch_error(&mut result, error, 15);
            assert!(!result.error_message.is_empty());
            assert_eq!(result.issues.len(), 1);
            assert_eq!(result.issues[0].code, code);
            assert_eq!(result.issues[0].category, category);
            assert_eq!(result.issues[0].severity, Severity::Critical);
        }
    }

    #[test]
    fn test_redirect_loop_values() {
        let mut result = PageResult::new("https://example.com/", 0);
        record_fetch_error(&mut result, FetchError::Redirect("x".to_string()), 15);
        assert_eq!(result.error_message, "Too many redirects");
        assert_eq!(result.issues[0].current_value.as_deref(), Some(">5 hops"));
    }

    #[test]
    fn test_access_barriers() {
        let mut result = PageResult::new("https://example.com/", 0);
        result.status_code = 429;
        check_access_barriers(
            &mut result,
            "<html><title>Attention Required! | Cloudflare</title></html>",
        );
        assert!(result.has_issue(IssueCode::BlockedByServer));
        assert!(result.has_issue(IssueCode::CloudflareProtection));

        let mut result = PageResult::new("https://example.com/", 0);
        result.status_code = 200;
        check_access_barriers(&mut result, "<p>Served via cloudflare CDN</p>");
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_x_robots_tag() {
        let mut result = PageResult::new("https://example.com/", 0);
        result.x_robots_tag = "NoIndex, NoFollow".to_string();
        check_x_robots(&mut result);
        assert!(!result.is_indexable);
        assert!(result.has_issue(IssueCode::XrobotsNoindex));
        assert!(result.has_issue(IssueCode::XrobotsNofollow));
    }

    #[test]
    fn test_crawl_error_result() {
        let result = crawl_error_result("https://example.com/x", 2, "task panicked");
        assert_eq!(result.crawl_depth, 2);
        assert!(result.has_critical());
        assert!(result.has_issue(IssueCode::CrawlError));
        assert_eq!(result.error_message, "task panicked");
    }

    #[test]
    fn test_unclassified_fetch_failure_counts_as_error() {
        let mut result = PageResult::new("https://example.com/", 0);
        record_fetch_error(&mut result, FetchError::Other("decode error".to_string()), 15);
        assert!(result.has_critical());
        assert!(result.has_issue(IssueCode::ConnectionError));
        assert_eq!(result.error_message, "decode error");
    }
}
