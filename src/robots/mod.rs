//! Robots.txt and sitemap handling module
//!
//! This module fetches and parses robots.txt for the audited site and loads
//! its XML sitemaps. Both are best effort: a missing or broken file degrades
//! to "allow everything" and "no sitemap entries".

mod parser;
mod sitemaps;

pub use parser::{RobotsDirectives, RobotsRule};
pub use sitemaps::{load_sitemaps, parse_sitemap, SitemapDocument, SitemapEntry, SitemapSet};

use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches robots.txt for the audited origin
///
/// # Arguments
///
/// * `client` - HTTP client used for the fetch
/// * `origin` - Scheme and host of the audited site
/// * `timeout` - Request timeout
///
/// # Returns
///
/// * `Some(RobotsDirectives)` - robots.txt answered 200 and was parsed
/// * `None` - Any other status or a network failure
pub async fn fetch_robots(
    client: &Client,
    origin: &Url,
    timeout: Duration,
) -> Option<RobotsDirectives> {
    let robots_url = origin.join("/robots.txt").ok()?;

    let response = match client.get(robots_url.clone()).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to fetch robots.txt from {}: {}", robots_url, e);
            return None;
        }
    };

    if response.status().as_u16() != 200 {
        tracing::debug!(
            "robots.txt at {} returned {}",
            robots_url,
            response.status()
        );
        return None;
    }

    match response.text().await {
        Ok(content) => Some(RobotsDirectives::parse(&content)),
        Err(e) => {
            tracing::warn!("Failed to read robots.txt from {}: {}", robots_url, e);
            None
        }
    }
}
