//! Status probes for resources and link targets
//!
//! Image probes go through a crawl-wide cache with a hard cap on distinct
//! URLs. Status checks for link and canonical targets are uncached; their
//! callers bound how many they issue.

use crate::crawler::fetcher::{is_tls_error, send_with_retry, HttpClients};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Method, Response};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, (u16, u64)>,
    /// Distinct URLs probed or being probed
    reserved: usize,
}

/// Crawl-wide cache of `(status, content_length)` per resource URL
#[derive(Debug)]
pub struct ResourceCache {
    state: Mutex<CacheState>,
    max_total: usize,
}

impl ResourceCache {
    /// Creates a cache that probes at most `max_total` distinct URLs
    pub fn new(max_total: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_total,
        }
    }

    /// Returns `(status, content_length)` for a resource
    ///
    /// # Returns
    ///
    /// * `Some((status, size))` - Cached or freshly probed; network failures
    ///   are `(0, 0)`
    /// * `None` - The URL is not cached and the probe budget is spent
    pub async fn probe(&self, clients: &HttpClients, url: &str) -> Option<(u16, u64)> {
        let key = url.split('#').next().unwrap_or(url).to_string();

        {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(cached) = state.entries.get(&key) {
                return Some(*cached);
            }
            if state.reserved >= self.max_total {
                return None;
            }
            state.reserved += 1;
        }

        let info = probe_resource(clients, &key).await;

        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.entries.insert(key, info);
        Some(info)
    }

    /// Number of distinct URLs probed so far
    pub fn probed(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .reserved
    }
}

fn declared_length(response: &Response) -> u64 {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// HEAD a resource, falling back to GET on 405 and to an unverified GET on
/// TLS failure
async fn probe_resource(clients: &HttpClients, url: &str) -> (u16, u64) {
    let Ok(parsed) = Url::parse(url) else {
        return (0, 0);
    };
    let timeout = clients.resource_timeout;

    match send_with_retry(&clients.probe, Method::HEAD, &parsed, timeout, clients.max_retries)
        .await
    {
        Ok(head) if head.status().as_u16() == 405 => {
            match send_with_retry(&clients.probe, Method::GET, &parsed, timeout, clients.max_retries)
                .await
            {
                Ok(get) => (get.status().as_u16(), declared_length(&get)),
                Err(_) => (0, 0),
            }
        }
        Ok(head) => (head.status().as_u16(), declared_length(&head)),
        Err(e) if is_tls_error(&e) => {
            match send_with_retry(
                &clients.probe_insecure,
                Method::GET,
                &parsed,
                timeout,
                clients.max_retries,
            )
            .await
            {
                Ok(get) => (get.status().as_u16(), declared_length(&get)),
                Err(_) => (0, 0),
            }
        }
        Err(e) => {
            tracing::debug!("Resource probe failed for {}: {}", url, e);
            (0, 0)
        }
    }
}

/// Resolves the HTTP status of a URL the crawl did not fetch
///
/// HEAD first; a HEAD answer of 405 or any error status is confirmed with
/// GET. TLS failures retry unverified. Any other failure yields 0.
pub async fn fetch_url_status(clients: &HttpClients, url: &str, timeout: Duration) -> u16 {
    let Ok(parsed) = Url::parse(url) else {
        return 0;
    };

    let get = |insecure: bool| {
        let client = if insecure {
            &clients.probe_insecure
        } else {
            &clients.probe
        };
        send_with_retry(client, Method::GET, &parsed, timeout, clients.max_retries)
    };

    match send_with_retry(&clients.probe, Method::HEAD, &parsed, timeout, clients.max_retries)
        .await
    {
        Ok(head) => {
            let status = head.status().as_u16();
            if status >= 400 {
                match get(false).await {
                    Ok(response) => response.status().as_u16(),
                    Err(e) if is_tls_error(&e) => get(true)
                        .await
                        .map(|r| r.status().as_u16())
                        .unwrap_or(0),
                    Err(_) => 0,
                }
            } else {
                status
            }
        }
        Err(e) if is_tls_error(&e) => get(true)
            .await
            .map(|r| r.status().as_u16())
            .unwrap_or(0),
        Err(e) => {
            tracing::debug!("Status check failed for {}: {}", url, e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::crawler::fetcher::build_http_clients;

    #[tokio::test]
    async fn test_budget_exhausted_returns_none() {
        let clients = build_http_clients(&AuditConfig::default()).unwrap();
        let cache = ResourceCache::new(0);
        assert_eq!(cache.probe(&clients, "https://example.com/a.png").await, None);
        assert_eq!(cache.probed(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_url_probes_as_zero() {
        let clients = build_http_clients(&AuditConfig::default()).unwrap();
        let cache = ResourceCache::new(5);
        assert_eq!(cache.probe(&clients, "not a url").await, Some((0, 0)));
        // Served from cache the second time, budget untouched
        assert_eq!(cache.probe(&clients, "not a url#frag").await, Some((0, 0)));
        assert_eq!(cache.probed(), 1);
    }

    #[tokio::test]
    async fn test_status_of_unparseable_url_is_zero() {
        let clients = build_http_clients(&AuditConfig::default()).unwrap();
        assert_eq!(
            fetch_url_status(&clients, "::bad::", Duration::from_secs(1)).await,
            0
        );
    }
}
