//! Per-page analysis
//!
//! Parses a fetched HTML document once and runs every page-level check
//! against it, filling in the [`PageResult`] and collecting its issues.
//!
//! Parsing and all checks are synchronous: the parsed [`Html`] is not
//! `Send` and must never be held across an await. Image probing is the only
//! check that needs the network, so the analyzer returns the image URLs to
//! probe and [`apply_image_probes`] finishes that check afterwards.

mod canonical;
mod content;
mod headings;
mod images;
mod links;
mod meta;
mod response;
mod schema;

pub use images::apply_image_probes;
pub(crate) use schema::{schema_items, schema_type};

use crate::config::AuditConfig;
use crate::model::{Category, Issue, IssueCode, PageResult, Severity};
use crate::url::SiteScope;
use scraper::{ElementRef, Html};
use url::Url;

/// Cap on link URLs stored on a page result
pub const MAX_STORED_LINKS: usize = 300;

/// What the crawler needs from an analyzed page
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageAnalysis {
    /// Absolute internal link targets, de-duplicated in document order
    pub internal_links: Vec<String>,
    /// Absolute external link targets, de-duplicated in document order
    pub external_links: Vec<String>,
    /// Image URLs to probe for status and size
    pub image_probes: Vec<String>,
}

/// Runs every per-page check on a decoded HTML document
///
/// `result` must already carry the response facts (status, TTFB, content
/// type and length, redirect chain); the checks read them.
///
/// # Arguments
///
/// * `result` - The page result to fill in
/// * `html` - Decoded document
/// * `page_url` - Final URL of the page, used to resolve relative links
/// * `scope` - The audited site, used to split internal and external links
/// * `config` - Thresholds and limits
pub fn analyze_page(
    result: &mut PageResult,
    html: &str,
    page_url: &Url,
    scope: &SiteScope,
    config: &AuditConfig,
) -> PageAnalysis {
    let document = Html::parse_document(html);
    let thresholds = &config.thresholds;

    response::check_url_structure(result, page_url);
    response::check_status(result);
    response::check_ttfb(result, thresholds);
    response::check_redirects(result);

    meta::check_title(result, &document, thresholds);
    meta::check_description(result, &document, thresholds);
    meta::check_meta_robots(result, &document);
    headings::check_headings(result, &document);
    content::check_content(result, &document, page_url, config);
    canonical::check_canonical(result, &document, page_url);
    let image_probes = images::check_images(
        result,
        &document,
        page_url,
        config.limits.max_image_checks_per_page,
    );
    schema::check_schema(result, &document);
    meta::check_open_graph(result, &document);
    meta::check_twitter(result, &document);
    meta::check_viewport(result, &document);
    meta::check_charset(result, &document);
    links::check_mixed_content(result, &document, page_url);
    meta::check_lang(result, &document);
    meta::check_hreflang(result, &document, page_url);
    content::detect_framework(result, html);
    content::detect_js_rendering_risk(result, &document);

    let (internal_links, external_links) = links::extract_links(result, &document, page_url, scope);

    PageAnalysis {
        internal_links,
        external_links,
        image_probes,
    }
}

/// Text of an element with runs of whitespace collapsed to one space
pub(crate) fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn add_issue(
    result: &mut PageResult,
    severity: Severity,
    category: Category,
    code: IssueCode,
    message: impl Into<String>,
) {
    result.push_issue(Issue::new(severity, category, code, message));
}

pub(crate) fn add_issue_with_values(
    result: &mut PageResult,
    severity: Severity,
    category: Category,
    code: IssueCode,
    message: impl Into<String>,
    current: impl Into<String>,
    expected: impl Into<String>,
) {
    result.push_issue(Issue::new(severity, category, code, message).with_values(current, expected));
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Analyzes inline HTML as a 200 page at `url`
    pub fn analyze(url: &str, html: &str) -> (PageResult, PageAnalysis) {
        analyze_with(url, html, |_| {})
    }

    /// Same as [`analyze`] with a hook to adjust the response facts first
    pub fn analyze_with(
        url: &str,
        html: &str,
        prepare: impl FnOnce(&mut PageResult),
    ) -> (PageResult, PageAnalysis) {
        let page_url = Url::parse(url).unwrap();
        let scope = SiteScope::from_seed(&page_url).unwrap();
        let mut result = PageResult::new(url, 0);
        result.status_code = 200;
        result.content_type = "text/html; charset=utf-8".to_string();
        result.content_length = html.len();
        prepare(&mut result);
        let analysis = analyze_page(
            &mut result,
            html,
            &page_url,
            &scope,
            &AuditConfig::default(),
        );
        (result, analysis)
    }

    pub fn codes(result: &PageResult) -> Vec<IssueCode> {
        result.issues.iter().map(|i| i.code).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    const GOOD_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>A perfectly reasonable page title</title>
  <meta name="description" content="A description that is long enough to pass the minimum length check for descriptions.">
  <link rel="canonical" href="https://example.com/good">
  <meta property="og:title" content="Good">
  <meta property="og:description" content="Good page">
  <meta property="og:image" content="https://example.com/og.png">
  <meta name="twitter:card" content="summary">
</head>
<body>
  <h1>Main heading</h1>
  <h2>Section</h2>
  <p>Some text.</p>
  <a href="/about">About</a>
  <a href="https://other.org/">Elsewhere</a>
</body>
</html>"#;

    #[test]
    fn test_good_page_has_only_content_issues() {
        let (result, analysis) = analyze("https://example.com/good", GOOD_PAGE);
        let codes = codes(&result);
        assert!(!codes.contains(&IssueCode::MissingTitle));
        assert!(!codes.contains(&IssueCode::MissingViewport));
        assert!(!codes.contains(&IssueCode::MissingCanonical));
        assert!(!codes.contains(&IssueCode::MissingOgTitle));
        assert!(!codes.contains(&IssueCode::MissingLang));
        assert!(codes.contains(&IssueCode::VeryThinContent));
        assert_eq!(analysis.internal_links, vec!["https://example.com/about"]);
        assert_eq!(analysis.external_links, vec!["https://other.org/"]);
        assert_eq!(result.internal_link_urls, vec!["https://example.com/about"]);
    }

    #[test]
    fn test_empty_document_flags_basics() {
        let (result, analysis) = analyze("https://example.com/x", "<html><body></body></html>");
        let codes = codes(&result);
        for expected in [
            IssueCode::MissingTitle,
            IssueCode::MissingDescription,
            IssueCode::MissingH1,
            IssueCode::MissingCanonical,
            IssueCode::MissingViewport,
            IssueCode::MissingCharset,
            IssueCode::MissingLang,
        ] {
            assert!(codes.contains(&expected), "expected {:?}", expected);
        }
        assert!(analysis.internal_links.is_empty());
    }
}
