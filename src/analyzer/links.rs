use super::{add_issue, add_issue_with_values, MAX_STORED_LINKS};
use crate::model::{Category, IssueCode, PageResult, Severity};
use crate::url::{normalize_parsed, resolve_url, SiteScope};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("anchor selector should be valid"));

/// Elements whose URL attribute loads a subresource
const SUBRESOURCES: &[(&str, &str)] = &[
    ("img", "src"),
    ("script", "src"),
    ("link", "href"),
    ("iframe", "src"),
    ("source", "src"),
    ("video", "src"),
    ("audio", "src"),
];

static SUBRESOURCE_SELECTORS: Lazy<Vec<(Selector, &'static str)>> = Lazy::new(|| {
    SUBRESOURCES
        .iter()
        .map(|(tag, attr)| {
            let selector = Selector::parse(&format!("{}[{}]", tag, attr))
                .expect("subresource selector should be valid");
            (selector, *attr)
        })
        .collect()
});

/// Keeps the first occurrence of every entry
fn dedup_in_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Collects the page's outgoing links and counts link problems
///
/// # Returns
///
/// `(internal, external)` absolute targets as resolved, de-duplicated in
/// document order. Counts on the result are per anchor, not per target.
pub(super) fn extract_links(
    result: &mut PageResult,
    document: &Html,
    page_url: &Url,
    scope: &SiteScope,
) -> (Vec<String>, Vec<String>) {
    let mut internal = Vec::new();
    let mut external = Vec::new();
    let mut empty_href = 0;
    let mut nofollow_internal = 0;

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let href = anchor.value().attr("href").unwrap_or_default().trim();
        if href.is_empty() || href == "#" {
            empty_href += 1;
            continue;
        }
        let lower = href.to_lowercase();
        if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("tel:")
        {
            continue;
        }
        let Some(target) = resolve_url(page_url, href) else {
            continue;
        };

        if scope.contains(&target) {
            let nofollow = anchor.value().attr("rel").is_some_and(|rel| {
                rel.split_whitespace()
                    .any(|r| r.eq_ignore_ascii_case("nofollow"))
            });
            if nofollow {
                nofollow_internal += 1;
            }
            internal.push(target.to_string());
        } else {
            external.push(target.to_string());
        }
    }

    result.internal_links = internal.len();
    result.external_links = external.len();
    result.empty_href_links = empty_href;
    result.internal_links_nofollow = nofollow_internal;

    if nofollow_internal > 0 {
        add_issue_with_values(
            result,
            Severity::Warning,
            Category::Links,
            IssueCode::NofollowInternal,
            format!("{} internal links with nofollow", nofollow_internal),
            nofollow_internal.to_string(),
            "0",
        );
    }
    if empty_href > 0 {
        add_issue_with_values(
            result,
            Severity::Info,
            Category::Links,
            IssueCode::EmptyHrefLinks,
            format!("{} links with an empty or # href", empty_href),
            empty_href.to_string(),
            "0",
        );
    }

    let internal = dedup_in_order(internal);
    let external = dedup_in_order(external);

    let normalized = internal
        .iter()
        .filter_map(|u| Url::parse(u).ok())
        .map(normalize_parsed)
        .collect();
    result.internal_link_urls = dedup_in_order(normalized)
        .into_iter()
        .take(MAX_STORED_LINKS)
        .collect();
    result.external_link_urls = external.iter().take(MAX_STORED_LINKS).cloned().collect();

    (internal, external)
}

/// Flags HTTPS pages that load subresources over plain HTTP
pub(super) fn check_mixed_content(result: &mut PageResult, document: &Html, page_url: &Url) {
    if page_url.scheme() != "https" {
        return;
    }

    let mixed = SUBRESOURCE_SELECTORS.iter().any(|(selector, attr)| {
        document.select(selector).any(|el| {
            el.value().attr(attr).is_some_and(|value| {
                value.starts_with("http://") && !value.starts_with("http://localhost")
            })
        })
    });

    if mixed {
        result.has_mixed_content = true;
        add_issue(
            result,
            Severity::Warning,
            Category::Security,
            IssueCode::MixedContent,
            "Mixed content: HTTPS page loads HTTP resources",
        );
    }
}
