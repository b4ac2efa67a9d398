//! Document head checks: title, description, robots, social tags and the
//! language and encoding declarations

use super::{add_issue, add_issue_with_values, element_text};
use crate::config::ThresholdsConfig;
use crate::model::{Category, HreflangTag, IssueCode, PageResult, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use url::Url;

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("title selector should be valid"));
static META_NAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name]").expect("meta name selector should be valid"));
static OG_TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:title"]"#).expect("og:title selector should be valid")
});
static OG_DESCRIPTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:description"]"#)
        .expect("og:description selector should be valid")
});
static OG_IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"]"#).expect("og:image selector should be valid")
});
static TWITTER_CARD_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="twitter:card"]"#).expect("twitter selector should be valid")
});
static VIEWPORT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="viewport"]"#).expect("viewport selector should be valid")
});
static META_CHARSET_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[charset]").expect("charset selector should be valid"));
static HTTP_EQUIV_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[http-equiv]").expect("http-equiv selector should be valid")
});
static HTML_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("html").expect("html selector should be valid"));
static HREFLANG_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("link[hreflang]").expect("hreflang selector should be valid")
});
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector should be valid"));

static LANG_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/([a-z]{2})(?:/|$)").expect("language prefix regex should be valid"));

/// ISO 639-1 codes accepted as language path prefixes
const LANGUAGE_CODES: &[&str] = &[
    "ru", "en", "de", "fr", "es", "it", "pt", "tr", "pl", "uk", "zh", "ja", "ar", "ko", "nl", "sv",
    "no", "da", "fi", "cs", "ro", "hu",
];

/// Anchors scanned for language prefixes
const HREFLANG_LINK_SCAN: usize = 50;

/// First `<meta name=...>` whose name matches case-insensitively
fn meta_by_name<'a>(document: &'a Html, name: &str) -> Option<ElementRef<'a>> {
    document.select(&META_NAME_SELECTOR).find(|el| {
        el.value()
            .attr("name")
            .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
    })
}

fn content_of(element: &ElementRef) -> String {
    element.value().attr("content").unwrap_or_default().trim().to_string()
}

pub(super) fn check_title(result: &mut PageResult, document: &Html, thresholds: &ThresholdsConfig) {
    let Some(title) = document.select(&TITLE_SELECTOR).next() else {
        add_issue(
            result,
            Severity::Critical,
            Category::Content,
            IssueCode::MissingTitle,
            "Missing <title> tag",
        );
        return;
    };

    let text = element_text(&title);
    let length = text.chars().count();
    result.title = text;
    result.title_length = length;

    if length == 0 {
        add_issue_with_values(
            result,
            Severity::Critical,
            Category::Content,
            IssueCode::EmptyTitle,
            "Empty <title> tag",
            "empty",
            format!("{}-{} chars", thresholds.title_min, thresholds.title_max),
        );
    } else if length < thresholds.title_min {
        add_issue_with_values(
            result,
            Severity::Warning,
            Category::Content,
            IssueCode::ShortTitle,
            format!("Title is too short: {} chars", length),
            format!("{} chars", length),
            format!(">{} chars", thresholds.title_min),
        );
    } else if length > thresholds.title_max {
        add_issue_with_values(
            result,
            Severity::Warning,
            Category::Content,
            IssueCode::LongTitle,
            format!("Title is too long: {} chars", length),
            format!("{} chars", length),
            format!("<{} chars", thresholds.title_max),
        );
    }
}

pub(super) fn check_description(
    result: &mut PageResult,
    document: &Html,
    thresholds: &ThresholdsConfig,
) {
    let Some(tag) = meta_by_name(document, "description") else {
        add_issue(
            result,
            Severity::Warning,
            Category::Content,
            IssueCode::MissingDescription,
            "Missing meta description",
        );
        return;
    };

    let text = content_of(&tag);
    let length = text.chars().count();
    result.description = text;
    result.description_length = length;

    if length == 0 {
        add_issue_with_values(
            result,
            Severity::Warning,
            Category::Content,
            IssueCode::EmptyDescription,
            "Empty meta description",
            "empty",
            format!(
                "{}-{} chars",
                thresholds.description_min, thresholds.description_max
            ),
        );
    } else if length < thresholds.description_min {
        add_issue_with_values(
            result,
            Severity::Info,
            Category::Content,
            IssueCode::ShortDescription,
            format!("Description is short: {} chars", length),
            format!("{} chars", length),
            format!(">{} chars", thresholds.description_min),
        );
    } else if length > thresholds.description_max {
        add_issue_with_values(
            result,
            Severity::Warning,
            Category::Content,
            IssueCode::LongDescription,
            format!("Description is long: {} chars", length),
            format!("{} chars", length),
            format!("<{} chars", thresholds.description_max),
        );
    }
}

pub(super) fn check_meta_robots(result: &mut PageResult, document: &Html) {
    let Some(tag) = meta_by_name(document, "robots") else {
        return;
    };
    let content = content_of(&tag).to_lowercase();
    result.meta_robots = content.clone();

    if content.contains("noindex") {
        result.is_indexable = false;
        add_issue(
            result,
            Severity::Info,
            Category::Technical,
            IssueCode::Noindex,
            "Page is excluded from indexing (meta robots noindex)",
        );
    }
    if content.contains("nofollow") {
        add_issue(
            result,
            Severity::Info,
            Category::Technical,
            IssueCode::Nofollow,
            "Links on the page pass no weight (meta robots nofollow)",
        );
    }
    for (directive, code) in [
        ("noarchive", IssueCode::MetaNoarchive),
        ("nosnippet", IssueCode::MetaNosnippet),
    ] {
        if content.contains(directive) {
            add_issue(
                result,
                Severity::Info,
                Category::Technical,
                code,
                format!("Robots directive found: {}", directive),
            );
        }
    }
}

pub(super) fn check_open_graph(result: &mut PageResult, document: &Html) {
    let tags = [
        ("title", &OG_TITLE_SELECTOR, IssueCode::MissingOgTitle),
        ("description", &OG_DESCRIPTION_SELECTOR, IssueCode::MissingOgDesc),
        ("image", &OG_IMAGE_SELECTOR, IssueCode::MissingOgImage),
    ];

    for (key, selector, missing) in tags {
        match document.select(selector).next() {
            Some(tag) => {
                if key == "title" {
                    result.has_og = true;
                }
                result.og_tags.insert(key.to_string(), content_of(&tag));
            }
            None => add_issue(
                result,
                Severity::Info,
                Category::StructuredData,
                missing,
                format!("No og:{}", key),
            ),
        }
    }
}

pub(super) fn check_twitter(result: &mut PageResult, document: &Html) {
    if document.select(&TWITTER_CARD_SELECTOR).next().is_some() {
        result.has_twitter_card = true;
    } else {
        add_issue(
            result,
            Severity::Info,
            Category::StructuredData,
            IssueCode::MissingTwitter,
            "No Twitter Card meta tag",
        );
    }
}

pub(super) fn check_viewport(result: &mut PageResult, document: &Html) {
    if document.select(&VIEWPORT_SELECTOR).next().is_some() {
        result.has_viewport = true;
    } else {
        add_issue(
            result,
            Severity::Critical,
            Category::Technical,
            IssueCode::MissingViewport,
            "No viewport meta tag (page is not mobile friendly)",
        );
    }
}

/// Looks for an encoding declaration in markup, then in the Content-Type
/// header, then in a `http-equiv` content-type tag
pub(super) fn check_charset(result: &mut PageResult, document: &Html) {
    if let Some(tag) = document.select(&META_CHARSET_SELECTOR).next() {
        let value = tag.value().attr("charset").unwrap_or_default().trim().to_string();
        result.has_charset = true;
        result.charset_value = value.clone();
        if !matches!(value.to_lowercase().as_str(), "utf-8" | "utf8") {
            add_issue_with_values(
                result,
                Severity::Warning,
                Category::Technical,
                IssueCode::WrongCharset,
                format!("Encoding is not UTF-8: {}", value),
                value,
                "UTF-8",
            );
        }
        return;
    }

    let header_declares = result.content_type.to_lowercase().contains("charset");
    let http_equiv_declares = document.select(&HTTP_EQUIV_SELECTOR).any(|el| {
        el.value()
            .attr("http-equiv")
            .is_some_and(|v| v.to_lowercase().contains("content-type"))
    });

    if header_declares || http_equiv_declares {
        result.has_charset = true;
    } else {
        add_issue(
            result,
            Severity::Warning,
            Category::Technical,
            IssueCode::MissingCharset,
            "Page encoding is not declared",
        );
    }
}

pub(super) fn check_lang(result: &mut PageResult, document: &Html) {
    let lang = document
        .select(&HTML_SELECTOR)
        .next()
        .and_then(|html| html.value().attr("lang"))
        .map(str::trim)
        .unwrap_or_default();

    if lang.is_empty() {
        add_issue(
            result,
            Severity::Info,
            Category::Technical,
            IssueCode::MissingLang,
            "No lang attribute on <html>",
        );
    } else {
        result.has_lang = true;
        result.lang_value = lang.to_string();
    }
}

/// Records hreflang alternates, or flags pages that look multilingual
/// without declaring any
///
/// A site looks multilingual when the page path and its first anchors use
/// at least two distinct ISO language codes as leading path segments.
pub(super) fn check_hreflang(result: &mut PageResult, document: &Html, page_url: &Url) {
    let tags: Vec<HreflangTag> = document
        .select(&HREFLANG_SELECTOR)
        .map(|el| HreflangTag {
            lang: el.value().attr("hreflang").unwrap_or_default().to_string(),
            href: el.value().attr("href").unwrap_or_default().to_string(),
        })
        .collect();
    if !tags.is_empty() {
        result.has_hreflang = true;
        result.hreflang_tags = tags;
        return;
    }

    let mut candidates = BTreeSet::new();
    let mut collect = |path: &str| {
        if let Some(caps) = LANG_PREFIX_RE.captures(&path.to_lowercase()) {
            candidates.insert(caps[1].to_string());
        }
    };
    collect(page_url.path());

    for anchor in document.select(&ANCHOR_SELECTOR).take(HREFLANG_LINK_SCAN) {
        let href = anchor.value().attr("href").unwrap_or_default().trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }
        if let Some(path) = href_path(page_url, href) {
            collect(&path);
        }
    }

    let languages = candidates
        .iter()
        .filter(|c| LANGUAGE_CODES.contains(&c.as_str()))
        .count();
    if languages >= 2 {
        add_issue(
            result,
            Severity::Info,
            Category::Technical,
            IssueCode::MissingHreflang,
            "Site looks multilingual but declares no hreflang",
        );
    }
}

/// Path of an href resolved against the page, `None` when it cannot resolve
fn href_path(page_url: &Url, href: &str) -> Option<String> {
    page_url.join(href).ok().map(|url| url.path().to_string())
}
