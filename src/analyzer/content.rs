//! Visible text metrics and platform fingerprinting

use super::{add_issue, add_issue_with_values};
use crate::config::AuditConfig;
use crate::model::{Category, Framework, IssueCode, PageResult, Severity};
use once_cell::sync::Lazy;
use scraper::{Html, Node, Selector};
use sha2::{Digest, Sha256};
use strum::IntoEnumIterator;
use url::Url;

/// Text/HTML ratio in percent below which a page is flagged
const TEXT_HTML_RATIO_LOW: f64 = 10.0;

/// Path fragments of pages that are short by nature
const NON_CONTENT_PATHS: &[&str] = &[
    "/contact", "/login", "/register", "/signup", "/auth", "/cart", "/checkout", "/account",
    "/search", "/404", "/privacy", "/terms", "/legal", "/cookie", "/gdpr", "/tag/", "/category/",
    "/feed", "/rss",
];

/// Leading characters of markup searched for platform markers
const FINGERPRINT_CHARS: usize = 5000;

const JS_RISK_MIN_SCRIPTS: usize = 15;
const JS_RISK_MAX_WORDS: usize = 80;

static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("script selector should be valid"));

/// Text nodes outside `script`, `style` and `noscript`, each trimmed,
/// joined with single spaces
pub(crate) fn visible_text(document: &Html) -> String {
    let mut pieces = Vec::new();
    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| matches!(el.name(), "script" | "style" | "noscript"))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed);
        }
    }
    pieces.join(" ")
}

/// Hex SHA-256 of lower-cased, whitespace-collapsed text
pub(crate) fn content_fingerprint(collapsed: &str) -> String {
    hex::encode(Sha256::digest(collapsed.to_lowercase().as_bytes()))
}

pub(super) fn check_content(
    result: &mut PageResult,
    document: &Html,
    page_url: &Url,
    config: &AuditConfig,
) {
    let text = visible_text(document);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    result.word_count = collapsed.split(' ').filter(|w| !w.is_empty()).count();
    result.content_text = collapsed
        .chars()
        .take(config.limits.max_content_text_chars)
        .collect();
    result.content_hash = content_fingerprint(&collapsed);
    result.text_html_ratio = text.len() as f64 / result.content_length.max(1) as f64 * 100.0;

    let path = page_url.path().to_lowercase();
    let non_content = NON_CONTENT_PATHS.iter().any(|p| path.contains(p));
    let blog_like = path.contains("/blog") || path.contains("/news");
    let error_page = result.status_code >= 400;
    let thresholds = &config.thresholds;
    let words = result.word_count;

    if !non_content && !error_page {
        if words < thresholds.very_thin_words {
            add_issue_with_values(
                result,
                Severity::Warning,
                Category::Content,
                IssueCode::VeryThinContent,
                format!("Very little content: {} words", words),
                format!("{} words", words),
                format!(">{} words", thresholds.thin_words),
            );
        } else if words < thresholds.thin_words && !blog_like {
            add_issue_with_values(
                result,
                Severity::Warning,
                Category::Content,
                IssueCode::ThinContent,
                format!("Thin content: {} words", words),
                format!("{} words", words),
                format!(">{} words", thresholds.thin_words),
            );
        }
    }

    let ratio = result.text_html_ratio;
    if ratio < TEXT_HTML_RATIO_LOW {
        add_issue_with_values(
            result,
            Severity::Info,
            Category::Content,
            IssueCode::LowTextRatio,
            format!("Low text to HTML ratio: {:.1}%", ratio),
            format!("{:.1}%", ratio),
            format!(">{}%", TEXT_HTML_RATIO_LOW),
        );
    }
}

/// First platform, in declaration order, with a marker near the top of the
/// markup
pub(super) fn detect_framework(result: &mut PageResult, html: &str) {
    let head: String = html.chars().take(FINGERPRINT_CHARS).collect::<String>().to_lowercase();
    result.detected_framework = Framework::iter()
        .find(|framework| framework.markers().iter().any(|m| head.contains(m)));
}

/// Many scripts and almost no text suggests client-side rendering
pub(super) fn detect_js_rendering_risk(result: &mut PageResult, document: &Html) {
    let scripts = document.select(&SCRIPT_SELECTOR).count();
    if scripts > JS_RISK_MIN_SCRIPTS && result.word_count < JS_RISK_MAX_WORDS {
        result.js_render_warning = true;
        add_issue(
            result,
            Severity::Info,
            Category::Technical,
            IssueCode::JsRenderingRisk,
            "Content appears to be rendered by JavaScript; a plain crawler may miss part of it",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn body_with_words(n: usize) -> String {
        format!("<html><body><p>{}</p></body></html>", "word ".repeat(n))
    }

    #[test]
    fn test_visible_text_skips_scripts_and_styles() {
        let doc = Html::parse_document(
            "<html><head><style>p{}</style><script>var x = 1;</script></head>\
             <body><p>Hello <b>world</b></p><noscript>enable js</noscript></body></html>",
        );
        assert_eq!(visible_text(&doc), "Hello world");
    }

    #[test]
    fn test_word_count_and_hash() {
        let (a, _) = analyze(
            "https://example.com/a",
            "<html><body><p>One  Two\n\nThree</p></body></html>",
        );
        let (b, _) = analyze(
            "https://example.com/b",
            "<html><body><div>one two three</div></body></html>",
        );
        assert_eq!(a.word_count, 3);
        assert_eq!(a.content_text, "One Two Three");
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.content_hash.len(), 64);
    }

    #[test]
    fn test_thin_content_tiers() {
        let (result, _) = analyze("https://example.com/page", &body_with_words(50));
        assert!(codes(&result).contains(&IssueCode::VeryThinContent));

        let (result, _) = analyze("https://example.com/page", &body_with_words(150));
        let codes_found = codes(&result);
        assert!(codes_found.contains(&IssueCode::ThinContent));
        assert!(!codes_found.contains(&IssueCode::VeryThinContent));

        // Blog posts are exempt from the softer tier only
        let (result, _) = analyze("https://example.com/blog/post", &body_with_words(150));
        assert!(!codes(&result).contains(&IssueCode::ThinContent));

        let (result, _) = analyze("https://example.com/page", &body_with_words(400));
        assert!(!codes(&result).contains(&IssueCode::ThinContent));
    }

    #[test]
    fn test_non_content_and_error_pages_are_exempt() {
        let (result, _) = analyze("https://example.com/contact", &body_with_words(5));
        assert!(!codes(&result).contains(&IssueCode::VeryThinContent));

        let (result, _) = analyze_with("https://example.com/gone", &body_with_words(5), |r| {
            r.status_code = 404
        });
        assert!(!codes(&result).contains(&IssueCode::VeryThinContent));
    }

    #[test]
    fn test_text_ratio_uses_content_length() {
        let (result, _) = analyze_with("https://example.com/", &body_with_words(10), |r| {
            r.content_length = 10_000
        });
        // "word" x10 joined by spaces is 49 bytes
        assert!((result.text_html_ratio - 0.49).abs() < 1e-9);
        assert!(codes(&result).contains(&IssueCode::LowTextRatio));
    }

    #[test]
    fn test_framework_detection() {
        let (result, _) = analyze(
            "https://example.com/",
            r#"<html><head><link href="/wp-content/themes/x.css"></head><body></body></html>"#,
        );
        assert_eq!(result.detected_framework, Some(Framework::WordPress));

        let (result, _) = analyze("https://example.com/", "<html><body>plain</body></html>");
        assert_eq!(result.detected_framework, None);
    }

    #[test]
    fn test_js_rendering_risk() {
        let scripts = "<script></script>".repeat(16);
        let (result, _) = analyze(
            "https://example.com/",
            &format!("<html><head>{}</head><body><div id=app></div></body></html>", scripts),
        );
        assert!(result.js_render_warning);
        assert!(codes(&result).contains(&IssueCode::JsRenderingRisk));
    }
}
