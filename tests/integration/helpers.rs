//! Shared fixtures for the integration tests

use site_audit::AuditConfig;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast configuration suitable for a local mock site
pub fn create_test_config(max_pages: usize) -> AuditConfig {
    let mut config = AuditConfig::default();
    config.crawler.max_pages = max_pages;
    config.crawler.crawl_delay_ms = 0;
    config.crawler.workers = 2;
    config.crawler.max_retries = 0;
    config.timeouts.page_secs = 5;
    config.timeouts.status_secs = 2;
    config.timeouts.resource_secs = 2;
    config.timeouts.connect_secs = 2;
    config
}

/// Builds a small but complete HTML page
pub fn html_page(title: &str, canonical: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<meta name="description" content="{title} is a page of the mock site used to exercise the audit from the pre-checks to the scored report.">
<link rel="canonical" href="{canonical}">
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>"#
    )
}

/// Mounts an HTML response for GET and HEAD on `route`
pub async fn mount_html(server: &MockServer, route: &str, html: String) {
    Mock::given(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(html, "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

/// Mounts a plain-text response on `route`
pub async fn mount_text(server: &MockServer, route: &str, body: String) {
    Mock::given(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body, "text/plain"),
        )
        .mount(server)
        .await;
}

/// Mounts a site with a robots-blocked section, an orphan sitemap entry,
/// a broken link and a canonical pointing at a missing page
///
/// Layout:
/// - `/` links to `/about`, `/blog`, `/missing` and `/private/secret`
/// - `/about` and `/blog` link back home
/// - `/blog` declares `/gone` (404) as its canonical
/// - the sitemap lists `/`, `/about` and the unlinked `/orphan`
pub async fn mount_mock_site(server: &MockServer) {
    let base = server.uri();

    mount_text(
        server,
        "/robots.txt",
        format!("User-agent: *\nDisallow: /private\nSitemap: {}/sitemap.xml\n", base),
    )
    .await;

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
<url><loc>{base}/</loc></url>
<url><loc>{base}/about</loc></url>
<url><loc>{base}/orphan</loc></url>
</urlset>"#
    );
    Mock::given(path("/sitemap.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sitemap, "application/xml"),
        )
        .mount(server)
        .await;

    mount_html(
        server,
        "/",
        html_page(
            "Home of the mock site",
            &format!("{}/", base),
            &format!(
                r#"<p>Welcome.</p>
<a href="{base}/about">About us</a>
<a href="/blog">Blog</a>
<a href="/missing">Missing page</a>
<a href="/private/secret">Private area</a>"#
            ),
        ),
    )
    .await;

    mount_html(
        server,
        "/about",
        html_page(
            "About the mock site team",
            &format!("{}/about", base),
            r#"<p>About.</p><a href="/">Home</a>"#,
        ),
    )
    .await;

    mount_html(
        server,
        "/blog",
        html_page(
            "Blog of the mock site team",
            &format!("{}/gone", base),
            r#"<p>Posts.</p><a href="/">Home</a><a href="/about">About</a>"#,
        ),
    )
    .await;

    mount_html(
        server,
        "/orphan",
        html_page(
            "Orphan page of the mock site",
            &format!("{}/orphan", base),
            "<p>Nobody links here.</p>",
        ),
    )
    .await;
}
