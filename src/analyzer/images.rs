use super::add_issue_with_values;
use crate::model::{Category, IssueCode, PageResult, Severity};
use crate::url::resolve_url;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

/// Bytes above which an image counts as large
pub const LARGE_IMAGE_BYTES: u64 = 500 * 1024;

/// `src` fragments of images that may carry an empty alt
const DECORATIVE_MARKERS: &[&str] = &["icon", "logo", "sprite", "spacer"];

static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("img selector should be valid"));

/// Counts alt and dimension problems and picks the images to probe
///
/// # Returns
///
/// Absolute http(s) image URLs, at most `max_probes`, in document order
pub(super) fn check_images(
    result: &mut PageResult,
    document: &Html,
    page_url: &Url,
    max_probes: usize,
) -> Vec<String> {
    let mut missing_alt = 0;
    let mut empty_alt = 0;
    let mut missing_dimensions = 0;
    let mut probes = Vec::new();
    let mut total = 0;

    for img in document.select(&IMG_SELECTOR) {
        total += 1;
        let attrs = img.value();
        let src = attrs.attr("src").unwrap_or_default().trim();

        match attrs.attr("alt") {
            None => missing_alt += 1,
            Some(alt) if alt.trim().is_empty() => {
                let src_lower = src.to_lowercase();
                if !DECORATIVE_MARKERS.iter().any(|m| src_lower.contains(m)) {
                    empty_alt += 1;
                }
            }
            Some(_) => {}
        }

        let has_attr = |name: &str| attrs.attr(name).is_some_and(|v| !v.is_empty());
        if !has_attr("width") && !has_attr("height") {
            let style = attrs.attr("style").unwrap_or_default();
            if !style.contains("width") && !style.contains("height") {
                missing_dimensions += 1;
            }
        }

        if src.is_empty()
            || probes.len() >= max_probes
            || src.starts_with("data:")
            || src.starts_with("blob:")
            || src.starts_with("javascript:")
        {
            continue;
        }
        if let Some(absolute) = resolve_url(page_url, src) {
            probes.push(absolute.to_string());
        }
    }

    result.images_total = total;
    result.images_missing_alt = missing_alt;
    result.images_empty_alt = empty_alt;
    result.images_missing_dimensions = missing_dimensions;

    if missing_alt > 0 {
        add_issue_with_values(
            result,
            Severity::Warning,
            Category::Images,
            IssueCode::MissingAlt,
            format!("{} images without an alt attribute", missing_alt),
            missing_alt.to_string(),
            "0",
        );
    }
    if empty_alt > 0 {
        add_issue_with_values(
            result,
            Severity::Info,
            Category::Images,
            IssueCode::EmptyAltNonDecorative,
            format!("{} images with an empty alt", empty_alt),
            empty_alt.to_string(),
            "descriptive alt",
        );
    }
    if missing_dimensions > 0 {
        add_issue_with_values(
            result,
            Severity::Warning,
            Category::Images,
            IssueCode::MissingDimensions,
            format!("{} images without width/height (layout shift)", missing_dimensions),
            missing_dimensions.to_string(),
            "0",
        );
    }

    probes
}

/// Finishes the image check with probe outcomes
///
/// Each entry is the `(status, content_length)` of one probed image.
/// Failed probes report status 0 and count as neither broken nor large.
pub fn apply_image_probes(result: &mut PageResult, probes: &[(u16, u64)]) {
    let broken = probes.iter().filter(|(status, _)| *status >= 400).count();
    let large = probes
        .iter()
        .filter(|(_, size)| *size > LARGE_IMAGE_BYTES)
        .count();
    result.images_broken = broken;
    result.images_large = large;

    if broken > 0 {
        add_issue_with_values(
            result,
            Severity::Warning,
            Category::Images,
            IssueCode::BrokenImages,
            format!("{} broken images (4xx/5xx)", broken),
            broken.to_string(),
            "0",
        );
    }
    if large > 0 {
        add_issue_with_values(
            result,
            Severity::Info,
            Category::Images,
            IssueCode::LargeImages,
            format!("{} heavy images (>500KB)", large),
            large.to_string(),
            "0",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_alt_and_dimension_counts() {
        let html = r#"<html><body>
            <img src="/a.png">
            <img src="/b.png" alt="">
            <img src="/logo.png" alt="">
            <img src="/c.png" alt="Chart" width="10">
            <img src="/d.png" alt="Photo" style="height: 20px">
        </body></html>"#;
        let (result, analysis) = analyze("https://example.com/", html);
        assert_eq!(result.images_total, 5);
        assert_eq!(result.images_missing_alt, 1);
        assert_eq!(result.images_empty_alt, 1);
        assert_eq!(result.images_missing_dimensions, 3);
        assert_eq!(analysis.image_probes.len(), 5);
        assert_eq!(analysis.image_probes[0], "https://example.com/a.png");
    }

    #[test]
    fn test_probe_list_skips_inline_sources_and_is_capped() {
        let mut html = String::from(r#"<html><body><img src="data:image/png;base64,AAA">"#);
        for i in 0..20 {
            html.push_str(&format!(r#"<img src="/img{}.png" alt="x">"#, i));
        }
        html.push_str("</body></html>");
        let (_, analysis) = analyze("https://example.com/", &html);
        assert_eq!(analysis.image_probes.len(), 8);
        assert!(analysis.image_probes.iter().all(|u| u.starts_with("https://")));
    }

    #[test]
    fn test_apply_image_probes() {
        let mut result = PageResult::new("https://example.com/", 0);
        apply_image_probes(
            &mut result,
            &[(200, 10), (404, 0), (0, 0), (200, LARGE_IMAGE_BYTES + 1)],
        );
        assert_eq!(result.images_broken, 1);
        assert_eq!(result.images_large, 1);
        assert!(result.has_issue(IssueCode::BrokenImages));
        assert!(result.has_issue(IssueCode::LargeImages));

        let mut clean = PageResult::new("https://example.com/", 0);
        apply_image_probes(&mut clean, &[]);
        assert!(clean.issues.is_empty());
    }
}
