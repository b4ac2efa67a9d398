//! XML sitemap loading
//!
//! Follows sitemap indexes breadth-first, fetching every sitemap file at
//! most once. Fetch and parse failures are logged and skipped.

use crate::url::normalize_url;
use reqwest::Client;
use serde::Serialize;
use sitemap::reader::{SiteMapEntity, SiteMapReader};
use std::collections::{HashSet, VecDeque};
use std::io::Cursor;
use std::time::Duration;
use url::Url;

/// Characters of the first sitemap kept for the report
const RAW_PREVIEW_CHARS: usize = 5000;

/// One `<url>` entry of a sitemap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitemapEntry {
    /// Normalized location
    pub url: String,
    /// `<lastmod>` as RFC 3339, empty when absent or unparseable
    pub lastmod: String,
}

/// Contents of one parsed sitemap file
#[derive(Debug, Default)]
pub struct SitemapDocument {
    pub entries: Vec<SitemapEntry>,
    /// Child sitemaps listed by a sitemap index
    pub children: Vec<String>,
}

/// Everything loaded from the site's sitemaps
#[derive(Debug, Default)]
pub struct SitemapSet {
    /// Entries de-duplicated by URL, first-seen metadata wins
    pub entries: Vec<SitemapEntry>,
    /// Preview of the first sitemap fetched successfully
    pub raw: String,
    pub files_fetched: usize,
}

impl SitemapSet {
    /// Normalized URLs of all entries
    pub fn urls(&self) -> HashSet<String> {
        self.entries.iter().map(|e| e.url.clone()).collect()
    }
}

/// Parses one sitemap or sitemap index
pub fn parse_sitemap(xml: &[u8]) -> SitemapDocument {
    let mut doc = SitemapDocument::default();

    for entity in SiteMapReader::new(Cursor::new(xml)) {
        match entity {
            SiteMapEntity::Url(entry) => {
                if let Some(loc) = entry.loc.get_url() {
                    doc.entries.push(SitemapEntry {
                        url: normalize_url(loc.as_str()),
                        lastmod: entry
                            .lastmod
                            .get_time()
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_default(),
                    });
                }
            }
            SiteMapEntity::SiteMap(entry) => {
                if let Some(loc) = entry.loc.get_url() {
                    doc.children.push(loc.to_string());
                }
            }
            _ => {}
        }
    }

    doc
}

/// Loads `/sitemap.xml` plus every sitemap declared in robots.txt
///
/// # Arguments
///
/// * `client` - HTTP client used for the fetches
/// * `origin` - Scheme and host of the audited site
/// * `declared` - Sitemap URLs listed in robots.txt
/// * `max_files` - Upper bound on sitemap files fetched, indexes included
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// The merged entries; empty when nothing could be fetched or parsed.
pub async fn load_sitemaps(
    client: &Client,
    origin: &Url,
    declared: &[String],
    max_files: usize,
    timeout: Duration,
) -> SitemapSet {
    let mut set = SitemapSet::default();
    let mut queue: VecDeque<String> = VecDeque::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut seen_entries: HashSet<String> = HashSet::new();

    if let Ok(default_url) = origin.join("/sitemap.xml") {
        queue.push_back(default_url.to_string());
    }
    queue.extend(declared.iter().cloned());

    while let Some(sitemap_url) = queue.pop_front() {
        if !seen.insert(sitemap_url.clone()) {
            continue;
        }
        if set.files_fetched >= max_files {
            tracing::debug!("Sitemap file budget reached, skipping {}", sitemap_url);
            break;
        }
        set.files_fetched += 1;

        let body = match fetch_sitemap(client, &sitemap_url, timeout).await {
            Some(body) => body,
            None => continue,
        };

        if set.raw.is_empty() {
            set.raw = String::from_utf8_lossy(&body)
                .chars()
                .take(RAW_PREVIEW_CHARS)
                .collect();
        }

        let doc = parse_sitemap(&body);
        tracing::debug!(
            "Parsed sitemap {}: {} urls, {} child sitemaps",
            sitemap_url,
            doc.entries.len(),
            doc.children.len()
        );

        for child in doc.children {
            if !seen.contains(&child) {
                queue.push_back(child);
            }
        }
        for entry in doc.entries {
            if seen_entries.insert(entry.url.clone()) {
                set.entries.push(entry);
            }
        }
    }

    set
}

async fn fetch_sitemap(client: &Client, url: &str, timeout: Duration) -> Option<Vec<u8>> {
    let response = match client.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to fetch sitemap {}: {}", url, e);
            return None;
        }
    };
    if response.status().as_u16() != 200 {
        return None;
    }
    match response.bytes().await {
        Ok(bytes) => Some(bytes.to_vec()),
        Err(e) => {
            tracing::warn!("Failed to read sitemap {}: {}", url, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlset() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/</loc><lastmod>2024-01-15T10:00:00+00:00</lastmod></url>
  <url><loc>https://example.com/about/</loc></url>
</urlset>"#;
        let doc = parse_sitemap(xml);
        assert!(doc.children.is_empty());
        assert_eq!(doc.entries.len(), 2);
        assert_eq!(doc.entries[0].url, "https://example.com/");
        assert!(doc.entries[0].lastmod.starts_with("2024-01-15"));
        assert_eq!(doc.entries[1].url, "https://example.com/about");
        assert_eq!(doc.entries[1].lastmod, "");
    }

    #[test]
    fn test_parse_sitemap_index() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://example.com/sitemap-pages.xml</loc></sitemap>
  <sitemap><loc>https://example.com/sitemap-posts.xml</loc></sitemap>
</sitemapindex>"#;
        let doc = parse_sitemap(xml);
        assert!(doc.entries.is_empty());
        assert_eq!(
            doc.children,
            vec![
                "https://example.com/sitemap-pages.xml".to_string(),
                "https://example.com/sitemap-posts.xml".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_garbage_is_empty() {
        let doc = parse_sitemap(b"<html><body>not a sitemap</body></html>");
        assert!(doc.entries.is_empty());
        assert!(doc.children.is_empty());
    }
}
