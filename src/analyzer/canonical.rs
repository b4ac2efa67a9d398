use super::{add_issue, add_issue_with_values};
use crate::model::{CanonicalStatus, Category, IssueCode, PageResult, Severity};
use crate::url::{canonical_compare_key, normalize_parsed};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static LINK_REL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("link[rel]").expect("link selector should be valid"));

fn is_canonical(link: &ElementRef) -> bool {
    link.value()
        .attr("rel")
        .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("canonical")))
}

/// Validates the canonical tag and records where it points
///
/// `canonical_absolute` holds the normalized target so the crawler and the
/// site analyzer can match it against crawled URLs.
pub(super) fn check_canonical(result: &mut PageResult, document: &Html, page_url: &Url) {
    let tags: Vec<ElementRef> = document
        .select(&LINK_REL_SELECTOR)
        .filter(is_canonical)
        .collect();

    let Some(first) = tags.first() else {
        result.canonical_status = Some(CanonicalStatus::Missing);
        add_issue(
            result,
            Severity::Warning,
            Category::Technical,
            IssueCode::MissingCanonical,
            "Missing canonical tag",
        );
        return;
    };

    if tags.len() > 1 {
        add_issue_with_values(
            result,
            Severity::Critical,
            Category::Technical,
            IssueCode::MultipleCanonical,
            format!("Found {} canonical tags", tags.len()),
            tags.len().to_string(),
            "1",
        );
    }

    let href = first.value().attr("href").unwrap_or_default().trim().to_string();
    result.canonical = href.clone();
    if href.is_empty() {
        result.canonical_status = Some(CanonicalStatus::Error);
        add_issue(
            result,
            Severity::Warning,
            Category::Technical,
            IssueCode::EmptyCanonical,
            "Empty canonical tag",
        );
        return;
    }

    if !href.starts_with("http") {
        add_issue_with_values(
            result,
            Severity::Warning,
            Category::Technical,
            IssueCode::RelativeCanonical,
            "Canonical uses a relative URL",
            href.clone(),
            "https://...",
        );
    }

    let Ok(target) = page_url.join(&href) else {
        result.canonical_status = Some(CanonicalStatus::Error);
        return;
    };
    result.canonical_absolute = normalize_parsed(target.clone());

    if page_url.scheme() == "https" && target.scheme() == "http" {
        let expected = format!(
            "https://{}{}",
            target.host_str().unwrap_or_default(),
            target.path()
        );
        add_issue_with_values(
            result,
            Severity::Critical,
            Category::Technical,
            IssueCode::CanonicalHttp,
            "Canonical points to HTTP on an HTTPS page",
            href.clone(),
            expected,
        );
    }

    if canonical_compare_key(target.as_str()) == canonical_compare_key(page_url.as_str()) {
        result.canonical_status = Some(CanonicalStatus::Ok);
    } else {
        result.canonical_status = Some(CanonicalStatus::Other);
        add_issue_with_values(
            result,
            Severity::Info,
            Category::Technical,
            IssueCode::CanonicalNotSelf,
            "Canonical points to a different URL (check that this is intended)",
            href,
            result.url.clone(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn with_canonical(tags: &str) -> String {
        format!("<html><head>{}</head><body></body></html>", tags)
    }

    #[test]
    fn test_self_canonical_ignores_www_and_slash() {
        let (result, _) = analyze(
            "https://example.com/page",
            &with_canonical(r#"<link rel="canonical" href="https://www.example.com/page/">"#),
        );
        assert_eq!(result.canonical_status, Some(CanonicalStatus::Ok));
        assert_eq!(result.canonical_absolute, "https://www.example.com/page");
        assert!(!codes(&result).contains(&IssueCode::CanonicalNotSelf));
    }

    #[test]
    fn test_relative_canonical_is_resolved() {
        let (result, _) = analyze(
            "https://example.com/a/b",
            &with_canonical(r#"<link rel="canonical" href="/a/c">"#),
        );
        let codes = codes(&result);
        assert!(codes.contains(&IssueCode::RelativeCanonical));
        assert!(codes.contains(&IssueCode::CanonicalNotSelf));
        assert_eq!(result.canonical, "/a/c");
        assert_eq!(result.canonical_absolute, "https://example.com/a/c");
        assert_eq!(result.canonical_status, Some(CanonicalStatus::Other));
    }

    #[test]
    fn test_http_canonical_on_https_page() {
        let (result, _) = analyze(
            "https://example.com/p",
            &with_canonical(r#"<link rel="canonical" href="http://example.com/p">"#),
        );
        let issue = result
            .issues
            .iter()
            .find(|i| i.code == IssueCode::CanonicalHttp)
            .unwrap();
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.expected_value.as_deref(), Some("https://example.com/p"));
    }

    #[test]
    fn test_multiple_and_empty_canonical() {
        let (result, _) = analyze(
            "https://example.com/p",
            &with_canonical(
                r#"<link rel="canonical" href=""><link rel="canonical" href="https://example.com/p">"#,
            ),
        );
        let codes = codes(&result);
        assert!(codes.contains(&IssueCode::MultipleCanonical));
        assert!(codes.contains(&IssueCode::EmptyCanonical));
        assert_eq!(result.canonical_status, Some(CanonicalStatus::Error));
    }

    #[test]
    fn test_missing_canonical() {
        let (result, _) = analyze("https://example.com/p", &with_canonical(""));
        assert_eq!(result.canonical_status, Some(CanonicalStatus::Missing));
    }
}
