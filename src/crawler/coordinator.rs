//! Audit coordinator - main crawl orchestration logic
//!
//! This module drives one audit from start to finish:
//! - Running the pre-checks (robots.txt, sitemaps, TLS, redirects)
//! - The batched breadth-first crawl loop
//! - Committing page results and growing the link graph
//! - Resolving statuses of link and canonical targets the crawl skipped
//! - Handing the frozen results to the site analyzer and the scorer

use crate::config::{validate, AuditConfig};
use crate::crawler::events::{CrawlEvent, EventSink};
use crate::crawler::fetcher::{build_http_clients, HttpClients};
use crate::crawler::prechecks::{run_prechecks, PreCheckReport};
use crate::crawler::resources::{fetch_url_status, ResourceCache};
use crate::crawler::scheduler::{Admission, CrawlFrontier, QueuedUrl};
use crate::crawler::worker::{crawl_error_result, PageOutcome, PageWorker};
use crate::crawler::StopHandle;
use crate::graph::LinkGraph;
use crate::lease::AuditLease;
use crate::model::{CanonicalStatus, Category, Issue, IssueCode, Severity, SiteAuditResult};
use crate::robots::RobotsDirectives;
use crate::site::{analyze_site, SiteContext};
use crate::url::{normalize_parsed, normalize_url, SiteScope};
use crate::{report, AuditError};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

/// Parses a user-supplied seed, defaulting to https when no scheme is given
///
/// # Errors
///
/// `AuditError::InvalidSeed` when the result is not an http(s) URL with a host
pub fn parse_seed(raw: &str) -> Result<Url, AuditError> {
    let trimmed = raw.trim();
    let invalid = |reason: String| AuditError::InvalidSeed {
        url: raw.to_string(),
        reason,
    };
    if trimmed.is_empty() {
        return Err(invalid("empty URL".to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };
    let url = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
    SiteScope::from_seed(&url).map_err(|e| invalid(e.to_string()))?;
    Ok(url)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lease kept alive while the crawl runs
#[derive(Debug, Clone)]
struct LeaseGuard {
    lease: Arc<AuditLease>,
    id: String,
}

/// Mutable crawl state shared by the loop steps
struct CrawlState {
    frontier: CrawlFrontier,
    graph: LinkGraph,
    robots_blocked: BTreeSet<String>,
    errors_count: usize,
}

/// Main audit coordinator structure
pub struct Coordinator {
    seed: Url,
    scope: SiteScope,
    config: Arc<AuditConfig>,
    clients: HttpClients,
    events: EventSink,
    stop: StopHandle,
    lease: Option<LeaseGuard>,
}

impl Coordinator {
    /// Creates a coordinator for one audit
    ///
    /// # Arguments
    ///
    /// * `seed` - Site to audit; `https://` is assumed when no scheme is given
    /// * `config` - The audit configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(AuditError)` - Invalid seed or configuration, or the HTTP
    ///   clients could not be built
    pub fn new(seed: &str, config: AuditConfig) -> Result<Self, AuditError> {
        validate(&config)?;
        let seed = parse_seed(seed)?;
        let scope = SiteScope::from_seed(&seed)?;
        let clients = build_http_clients(&config)?;

        Ok(Self {
            seed,
            scope,
            config: Arc::new(config),
            clients,
            events: EventSink::default(),
            stop: StopHandle::new(),
            lease: None,
        })
    }

    /// Sends progress events to `sender`
    pub fn with_events(mut self, sender: UnboundedSender<CrawlEvent>) -> Self {
        self.events = EventSink::new(Some(sender));
        self
    }

    /// Renews `lease` for `id` after every batch
    pub fn with_lease(mut self, lease: Arc<AuditLease>, id: impl Into<String>) -> Self {
        self.lease = Some(LeaseGuard {
            lease,
            id: id.into(),
        });
        self
    }

    /// Handle that stops the crawl before the next batch
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Runs the whole audit
    ///
    /// Never fails once constructed: network faults end up as issues on
    /// pages and an interrupted crawl still gets analyzed and scored.
    pub async fn run(self) -> SiteAuditResult {
        let started = Instant::now();
        let base_url = normalize_parsed(self.seed.clone());
        let mut result = SiteAuditResult::new(base_url.clone(), self.scope.host());
        tracing::info!("Starting audit of {}", base_url);

        let prechecks = run_prechecks(
            &self.clients,
            &self.seed,
            &self.scope,
            &self.config,
            &self.events,
        )
        .await;
        let robots = prechecks.robots_or_allow_all();
        apply_prechecks(&mut result, prechecks);

        let mut state = CrawlState {
            frontier: CrawlFrontier::new(
                self.seed.as_str(),
                self.config.crawler.max_depth,
                self.config.crawler.respect_robots,
            ),
            graph: LinkGraph::new(),
            robots_blocked: BTreeSet::new(),
            errors_count: 0,
        };
        self.crawl(&mut result, &mut state, &robots).await;

        result.robots_linked_blocked = std::mem::take(&mut state.robots_blocked)
            .into_iter()
            .collect();

        let uncrawled_status = self.resolve_uncrawled(&result, &state.graph).await;
        self.resolve_canonical_targets(&mut result, &uncrawled_status).await;
        let external_status = if self.config.crawler.check_external {
            self.check_external_links(&state.graph).await
        } else {
            HashMap::new()
        };

        let context = SiteContext {
            graph: &state.graph,
            uncrawled_status: &uncrawled_status,
            external_status: &external_status,
            config: self.config.as_ref(),
        };
        analyze_site(&mut result, &context);
        report::finalize(&mut result);

        result.duration = round2(started.elapsed().as_secs_f64());
        tracing::info!(
            "Audit of {} completed: {} pages in {:.2}s, health {}",
            base_url,
            result.pages.len(),
            result.duration,
            result.health_score
        );
        self.events.emit(CrawlEvent::Done {
            pages_scanned: result.pages.len(),
            health_score: result.health_score,
        });
        result
    }

    /// The batched crawl loop
    async fn crawl(
        &self,
        result: &mut SiteAuditResult,
        state: &mut CrawlState,
        robots: &RobotsDirectives,
    ) {
        let max_pages = self.config.crawler.max_pages;
        let workers = self.config.crawler.workers.max(1);
        let delay = Duration::from_millis(self.config.crawler.crawl_delay_ms);
        let worker = PageWorker {
            clients: self.clients.clone(),
            scope: self.scope.clone(),
            config: Arc::clone(&self.config),
            resources: Arc::new(ResourceCache::new(
                self.config.limits.max_total_resource_checks,
            )),
        };

        while !state.frontier.is_empty() && result.pages.len() < max_pages {
            if self.stop.is_stopped() {
                tracing::info!("Stop requested, ending crawl early");
                break;
            }

            let batch = state
                .frontier
                .next_batch(workers, max_pages - result.pages.len());
            let mut outcomes: Vec<(usize, QueuedUrl, Option<PageOutcome>)> =
                stream::iter(batch.into_iter().enumerate())
                    .map(|(index, item)| {
                        let worker = worker.clone();
                        async move {
                            let url = item.url.clone();
                            let depth = item.depth;
                            let handle =
                                tokio::spawn(async move { worker.process(url, depth).await });
                            match handle.await {
                                Ok(outcome) => (index, item, Some(outcome)),
                                Err(e) => {
                                    tracing::warn!("Worker for {} failed: {}", item.url, e);
                                    (index, item, None)
                                }
                            }
                        }
                    })
                    .buffer_unordered(workers)
                    .collect()
                    .await;
            outcomes.sort_by_key(|(index, _, _)| *index);

            for (_, item, outcome) in outcomes {
                match outcome {
                    Some(outcome) => self.commit(result, state, outcome, item.depth, robots),
                    None => self.commit_failure(result, state, &item, "worker task failed"),
                }
            }

            if let Some(guard) = &self.lease {
                if !guard.lease.renew(&guard.id) {
                    tracing::warn!("Audit lease for {} was lost", guard.id);
                }
            }

            if !delay.is_zero() && !state.frontier.is_empty() {
                tokio::time::sleep(delay).await;
            }
        }

        tracing::info!(
            "Crawl finished: {} pages, {} URLs discovered, {} still queued",
            result.pages.len(),
            state.frontier.discovered(),
            state.frontier.queue_len()
        );
    }

    /// Stores one page result and feeds its links to the graph and frontier
    fn commit(
        &self,
        result: &mut SiteAuditResult,
        state: &mut CrawlState,
        outcome: PageOutcome,
        depth: u32,
        robots: &RobotsDirectives,
    ) {
        let PageOutcome {
            result: mut page,
            internal_links,
            external_links,
        } = outcome;
        // Failed fetches still carry the URL as queued
        page.url = normalize_url(&page.url);
        let url = page.url.clone();
        if result.pages.contains_key(&url) {
            tracing::debug!("{} already committed under its final URL", url);
            return;
        }

        if page.has_critical() {
            state.errors_count += 1;
        }
        state.graph.add_page(&url);

        for link in &internal_links {
            let normalized = normalize_url(link);
            state.graph.record_internal(&url, link, &normalized);
            let admission =
                state
                    .frontier
                    .admit(link, &normalized, depth, &self.scope, robots);
            if let Admission::RobotsBlocked { .. } = admission {
                state.graph.record_blocked(&url, &normalized);
                state.robots_blocked.insert(normalized);
            }
        }
        for link in &external_links {
            state.graph.record_external(&url, link);
        }

        let status_code = page.status_code;
        let ttfb = round2(page.ttfb);
        result.pages.insert(url.clone(), page);

        self.events.emit(CrawlEvent::PageDone {
            url,
            status_code,
            ttfb,
            pages_scanned: result.pages.len(),
            urls_discovered: state.frontier.discovered(),
            queue_size: state.frontier.queue_len(),
            errors_count: state.errors_count,
        });
    }

    /// Stores a `crawl_error` page for a worker that died
    fn commit_failure(
        &self,
        result: &mut SiteAuditResult,
        state: &mut CrawlState,
        item: &QueuedUrl,
        error: &str,
    ) {
        let url = normalize_url(&item.url);
        if result.pages.contains_key(&url) {
            return;
        }
        state.errors_count += 1;
        state.graph.add_page(&url);
        result
            .pages
            .insert(url.clone(), crawl_error_result(&url, item.depth, error));
        self.events.emit(CrawlEvent::PageError {
            url,
            error: error.to_string(),
        });
    }

    /// Checks a list of URLs concurrently with the status timeout
    async fn statuses(&self, urls: Vec<String>) -> HashMap<String, u16> {
        let workers = self.config.crawler.workers.max(1);
        stream::iter(urls)
            .map(|url| {
                let clients = self.clients.clone();
                async move {
                    let status = fetch_url_status(&clients, &url, clients.status_timeout).await;
                    (url, status)
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await
    }

    /// Statuses of linked internal targets the crawl never fetched
    async fn resolve_uncrawled(
        &self,
        result: &SiteAuditResult,
        graph: &LinkGraph,
    ) -> HashMap<String, u16> {
        let targets: Vec<String> = graph
            .uncrawled_targets(|url| result.pages.contains_key(url))
            .into_iter()
            .take(self.config.limits.max_uncrawled_status_checks)
            .collect();
        if targets.is_empty() {
            return HashMap::new();
        }
        tracing::info!("Checking status of {} uncrawled link targets", targets.len());
        self.statuses(targets).await
    }

    /// Records the status of every canonical target outside the page itself
    async fn resolve_canonical_targets(
        &self,
        result: &mut SiteAuditResult,
        known: &HashMap<String, u16>,
    ) {
        let targets: BTreeSet<String> = result
            .pages
            .values()
            .filter(|page| page.canonical_status == Some(CanonicalStatus::Other))
            .map(|page| page.canonical_absolute.clone())
            .filter(|target| !target.is_empty())
            .collect();
        let unknown: Vec<String> = targets
            .iter()
            .filter(|t| !result.pages.contains_key(*t) && !known.contains_key(*t))
            .cloned()
            .collect();
        let fetched = self.statuses(unknown).await;

        let status_of: HashMap<String, u16> = targets
            .into_iter()
            .map(|target| {
                let status = result
                    .pages
                    .get(&target)
                    .map(|page| page.status_code)
                    .or_else(|| known.get(&target).copied())
                    .or_else(|| fetched.get(&target).copied())
                    .unwrap_or(0);
                (target, status)
            })
            .collect();

        for page in result.pages.values_mut() {
            if page.canonical_status != Some(CanonicalStatus::Other) {
                continue;
            }
            let Some(&status) = status_of.get(&page.canonical_absolute) else {
                continue;
            };
            page.canonical_target_status = status;
            if status >= 400 {
                page.push_issue(
                    Issue::new(
                        Severity::Critical,
                        Category::Technical,
                        IssueCode::CanonicalTargetError,
                        format!("Canonical points to a page answering {}", status),
                    )
                    .with_values(status.to_string(), "200"),
                );
            }
        }
    }

    async fn check_external_links(&self, graph: &LinkGraph) -> HashMap<String, u16> {
        let urls: Vec<String> = graph
            .external_urls()
            .iter()
            .take(self.config.limits.max_external_checks)
            .cloned()
            .collect();
        let message = "Checking external links...";
        tracing::info!("{} ({} URLs)", message, urls.len());
        self.events.emit(CrawlEvent::PreCheck {
            message: message.to_string(),
        });
        self.statuses(urls).await
    }
}

/// Copies the pre-check findings onto the result
fn apply_prechecks(result: &mut SiteAuditResult, report: PreCheckReport) {
    if let Some(robots) = report.robots {
        result.robots_txt_content = robots.content().to_string();
        result.robots_rules = robots.rules;
        result.robots_sitemaps = robots.sitemaps;
        result.robots_host = robots.host;
        result.robots_has_clean_param = robots.has_clean_param;
    }
    result.sitemap_entries = report.sitemaps.entries;
    result.sitemap_raw = report.sitemaps.raw;
    result.ssl_valid = report.ssl_valid;
    result.ssl_error = report.ssl_error;
    result.http_to_https = report.http_to_https;
    result.www_consistency = report.www_consistency;
    result.has_llms_txt = report.llms_txt.is_some();
    result.llms_txt_content = report.llms_txt.unwrap_or_default();
    result.homepage_status_code = report.homepage_status_code;
    result.homepage_ttfb = report.homepage_ttfb;
    result.homepage_headers = report.homepage_headers;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_adds_https() {
        let url = parse_seed("  example.com/start ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/start");

        let url = parse_seed("http://example.com").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn test_parse_seed_rejects_garbage() {
        for raw in ["", "   ", "ftp://example.com/", "https://", "http://exa mple.com"] {
            match parse_seed(raw) {
                Err(AuditError::InvalidSeed { url, .. }) => assert_eq!(url, raw),
                other => panic!("{:?} should be rejected, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_coordinator_rejects_invalid_config() {
        let mut config = AuditConfig::default();
        config.crawler.workers = 0;
        assert!(matches!(
            Coordinator::new("https://example.com/", config),
            Err(AuditError::Config(_))
        ));
    }

    #[test]
    fn test_apply_prechecks() {
        let mut result = SiteAuditResult::new("https://example.com/", "example.com");
        let report = PreCheckReport {
            robots: Some(RobotsDirectives::parse(
                "User-agent: *\nDisallow: /admin\nClean-param: utm_source\nSitemap: https://example.com/s.xml",
            )),
            ssl_valid: false,
            ssl_error: "expired".to_string(),
            llms_txt: Some("# Example".to_string()),
            ..PreCheckReport::default()
        };

        apply_prechecks(&mut result, report);

        assert!(result.robots_has_clean_param);
        assert_eq!(result.robots_sitemaps, ["https://example.com/s.xml"]);
        assert!(result.robots_txt_content.contains("Disallow"));
        assert!(!result.ssl_valid);
        assert!(result.has_llms_txt);
    }
}
