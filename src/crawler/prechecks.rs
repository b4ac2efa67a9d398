//! Site-level checks run once before the crawl starts
//!
//! Every check is best effort. A failure is logged and leaves its facts at
//! their defaults; it never aborts the audit.

use crate::config::AuditConfig;
use crate::crawler::events::{CrawlEvent, EventSink};
use crate::crawler::fetcher::{is_tls_error, truncate, HttpClients};
use crate::model::WwwConsistency;
use crate::robots::{fetch_robots, load_sitemaps, RobotsDirectives, SitemapSet};
use crate::url::{strip_www, SiteScope};
use std::collections::BTreeMap;
use std::time::Instant;
use url::Url;

/// Characters of `/llms.txt` kept for the report
const LLMS_TXT_PREVIEW_CHARS: usize = 2000;

/// Facts gathered by the pre-checks
#[derive(Debug, Default)]
pub struct PreCheckReport {
    /// `None` when robots.txt is missing or unreadable
    pub robots: Option<RobotsDirectives>,
    pub sitemaps: SitemapSet,
    pub ssl_valid: bool,
    pub ssl_error: String,
    pub http_to_https: bool,
    pub www_consistency: WwwConsistency,
    pub llms_txt: Option<String>,
    pub homepage_status_code: u16,
    pub homepage_ttfb: f64,
    pub homepage_headers: BTreeMap<String, String>,
}

impl PreCheckReport {
    /// Directives to crawl with; allows everything when robots.txt is missing
    pub fn robots_or_allow_all(&self) -> RobotsDirectives {
        self.robots.clone().unwrap_or_else(RobotsDirectives::allow_all)
    }
}

/// Runs all pre-checks in order, announcing each one
///
/// # Arguments
///
/// * `clients` - Shared HTTP clients
/// * `seed` - Normalized seed URL
/// * `scope` - The audited site
/// * `config` - Audit configuration
/// * `events` - Progress channel
pub async fn run_prechecks(
    clients: &HttpClients,
    seed: &Url,
    scope: &SiteScope,
    config: &AuditConfig,
    events: &EventSink,
) -> PreCheckReport {
    let mut report = PreCheckReport {
        ssl_valid: true,
        ..PreCheckReport::default()
    };
    let origin = origin_of(seed);
    let announce = |message: &str| {
        tracing::info!("{}", message);
        events.emit(CrawlEvent::PreCheck {
            message: message.to_string(),
        });
    };

    announce("Checking robots.txt...");
    report.robots = fetch_robots(&clients.probe, &origin, clients.status_timeout).await;

    announce("Loading sitemap.xml...");
    let declared = report
        .robots
        .as_ref()
        .map(|r| r.sitemaps.clone())
        .unwrap_or_default();
    report.sitemaps = load_sitemaps(
        &clients.probe,
        &origin,
        &declared,
        config.limits.max_sitemap_files,
        clients.status_timeout,
    )
    .await;
    tracing::info!(
        "Sitemaps: {} entries from {} files",
        report.sitemaps.entries.len(),
        report.sitemaps.files_fetched
    );

    announce("Checking SSL...");
    check_ssl(clients, &origin, &mut report).await;

    announce("Checking HTTP -> HTTPS...");
    report.http_to_https = check_http_redirect(clients, &origin).await;

    announce("Checking www consistency...");
    report.www_consistency = check_www_consistency(clients, &origin, scope).await;

    announce("Checking llms.txt...");
    report.llms_txt = check_llms_txt(clients, &origin).await;

    announce("Checking homepage...");
    check_homepage(clients, seed, &mut report).await;

    report
}

/// Scheme, host and port of a URL with the root path
fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

async fn check_ssl(clients: &HttpClients, origin: &Url, report: &mut PreCheckReport) {
    let mut https = origin.clone();
    if https.set_scheme("https").is_err() {
        return;
    }
    match clients
        .probe
        .get(https)
        .timeout(clients.status_timeout)
        .send()
        .await
    {
        Ok(_) => report.ssl_valid = true,
        Err(e) if is_tls_error(&e) => {
            tracing::warn!("SSL check failed: {}", e);
            report.ssl_valid = false;
            report.ssl_error = truncate(&e.to_string(), 200);
        }
        Err(e) => tracing::warn!("SSL check inconclusive: {}", e),
    }
}

async fn check_http_redirect(clients: &HttpClients, origin: &Url) -> bool {
    let mut http = origin.clone();
    if http.set_scheme("http").is_err() {
        return false;
    }
    match clients
        .probe_insecure
        .get(http)
        .timeout(clients.status_timeout)
        .send()
        .await
    {
        Ok(response) => response.url().scheme() == "https",
        Err(e) => {
            tracing::warn!("HTTP -> HTTPS check failed: {}", e);
            false
        }
    }
}

/// Requests the alternate host (with or without `www.`) and looks at where
/// it lands
async fn check_www_consistency(
    clients: &HttpClients,
    origin: &Url,
    scope: &SiteScope,
) -> WwwConsistency {
    if scope.is_ip() {
        return WwwConsistency::Unknown;
    }
    let host = scope.host();
    let alt_host = if host.starts_with("www.") {
        strip_www(host).to_string()
    } else {
        format!("www.{}", host)
    };

    let mut alt = origin.clone();
    if alt.set_host(Some(&alt_host)).is_err() {
        return WwwConsistency::Unknown;
    }

    match clients
        .probe_insecure
        .get(alt)
        .timeout(clients.status_timeout)
        .send()
        .await
    {
        Ok(response) => {
            let landed = response.url().host_str().unwrap_or_default().to_lowercase();
            if landed == host {
                if host.starts_with("www.") {
                    WwwConsistency::Www
                } else {
                    WwwConsistency::NonWww
                }
            } else {
                WwwConsistency::Inconsistent
            }
        }
        Err(e) => {
            tracing::warn!("www consistency check failed for {}: {}", alt_host, e);
            WwwConsistency::Unknown
        }
    }
}

async fn check_llms_txt(clients: &HttpClients, origin: &Url) -> Option<String> {
    let url = origin.join("/llms.txt").ok()?;
    let response = clients
        .probe
        .get(url)
        .timeout(clients.status_timeout)
        .send()
        .await
        .ok()?;
    if response.status().as_u16() != 200 {
        return None;
    }
    let text = response.text().await.ok()?;
    if text.is_empty() {
        return None;
    }
    Some(truncate(&text, LLMS_TXT_PREVIEW_CHARS))
}

async fn check_homepage(clients: &HttpClients, seed: &Url, report: &mut PreCheckReport) {
    let started = Instant::now();
    match clients
        .probe
        .get(seed.clone())
        .timeout(clients.page_timeout)
        .send()
        .await
    {
        Ok(response) => {
            report.homepage_ttfb = started.elapsed().as_secs_f64();
            report.homepage_status_code = response.status().as_u16();
            report.homepage_headers = response
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        String::from_utf8_lossy(v.as_bytes()).to_string(),
                    )
                })
                .collect();
        }
        Err(e) => tracing::warn!("Homepage check failed: {}", e),
    }
}
