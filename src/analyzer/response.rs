//! Checks on the URL and response facts that need no markup

use super::add_issue_with_values;
use crate::config::ThresholdsConfig;
use crate::crawler::fetcher::MAX_REDIRECTS;
use crate::model::{Category, IssueCode, PageResult, Severity};
use std::collections::HashSet;
use url::Url;

const MAX_URL_LENGTH: usize = 1024;
const MAX_QUERY_PARAMS: usize = 6;

pub(super) fn check_url_structure(result: &mut PageResult, page_url: &Url) {
    let length = result.url.chars().count();
    if length > MAX_URL_LENGTH {
        add_issue_with_values(
            result,
            Severity::Warning,
            Category::Technical,
            IssueCode::LongUrl,
            "URL is too long and may hurt indexing",
            length.to_string(),
            format!("<={}", MAX_URL_LENGTH),
        );
    }

    let keys: HashSet<_> = page_url.query_pairs().map(|(k, _)| k).collect();
    if keys.len() > MAX_QUERY_PARAMS {
        add_issue_with_values(
            result,
            Severity::Info,
            Category::Technical,
            IssueCode::TooManyQueryParams,
            "Too many query parameters (duplicate URL risk)",
            keys.len().to_string(),
            format!("<={}", MAX_QUERY_PARAMS),
        );
    }
}

pub(super) fn check_status(result: &mut PageResult) {
    let code = result.status_code;
    let (severity, issue, message) = match code {
        500.. => (Severity::Critical, IssueCode::ServerError, "Server error"),
        400..=499 => (Severity::Critical, IssueCode::ClientError, "Page not found"),
        300..=399 => (Severity::Warning, IssueCode::Redirect, "Redirect"),
        _ => return,
    };
    add_issue_with_values(
        result,
        severity,
        Category::Technical,
        issue,
        format!("{}: {}", message, code),
        code.to_string(),
        "200",
    );
}

pub(super) fn check_ttfb(result: &mut PageResult, thresholds: &ThresholdsConfig) {
    let ttfb = result.ttfb;
    let (severity, message) = if ttfb > thresholds.ttfb_critical {
        (Severity::Critical, "Very slow server response")
    } else if ttfb > thresholds.ttfb_warning {
        (Severity::Warning, "Slow server response")
    } else {
        return;
    };
    add_issue_with_values(
        result,
        severity,
        Category::Technical,
        IssueCode::SlowTtfb,
        format!("{}: {:.2}s", message, ttfb),
        format!("{:.2}s", ttfb),
        format!("<{}s", thresholds.ttfb_warning),
    );
}

pub(super) fn check_redirects(result: &mut PageResult) {
    let hops = result.redirect_chain.len();
    if hops > 2 {
        let severity = if hops > 3 {
            Severity::Critical
        } else {
            Severity::Warning
        };
        add_issue_with_values(
            result,
            severity,
            Category::Technical,
            IssueCode::RedirectChain,
            format!("Redirect chain of {} hops", hops),
            format!("{} hops", hops),
            "1-2 hops",
        );
    }
    if hops > MAX_REDIRECTS {
        add_issue_with_values(
            result,
            Severity::Critical,
            Category::Technical,
            IssueCode::RedirectLoop,
            "Looks like a redirect loop",
            format!("{} hops", hops),
            "1-2 hops",
        );
    }
}
