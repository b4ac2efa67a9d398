//! Crawler module for page fetching and audit orchestration
//!
//! This module contains the core crawling logic, including:
//! - Shared HTTP clients with retry and SSL fallback
//! - Site pre-checks (robots.txt, sitemaps, redirects)
//! - Frontier scheduling and per-page workers
//! - Overall audit coordination

mod coordinator;
mod events;
pub mod fetcher;
mod prechecks;
mod resources;
mod scheduler;
mod worker;

pub use coordinator::{parse_seed, Coordinator};
pub use events::{CrawlEvent, EventSink};
pub use fetcher::{build_http_clients, fetch_page, FetchError, FetchedPage, HttpClients};
pub use prechecks::{run_prechecks, PreCheckReport};
pub use resources::{fetch_url_status, ResourceCache};
pub use scheduler::{Admission, CrawlFrontier, QueuedUrl};
pub use worker::{crawl_error_result, PageOutcome, PageWorker};

use crate::config::AuditConfig;
use crate::lease::{lease_ttl_for, AuditLease};
use crate::model::SiteAuditResult;
use crate::AuditError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Cooperative cancellation flag, checked before every batch
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the crawl to finish after the current batch
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs a complete audit
///
/// This is the main entry point for auditing a site. It will:
/// 1. Validate the seed URL and configuration
/// 2. Run the site pre-checks
/// 3. Crawl pages breadth-first and analyze each one
/// 4. Correlate findings across the site
/// 5. Score the site and build recommendations
///
/// # Arguments
///
/// * `seed` - Site to audit
/// * `config` - The audit configuration
/// * `events` - Optional channel receiving progress events
///
/// # Returns
///
/// * `Ok(SiteAuditResult)` - Audit completed
/// * `Err(AuditError)` - The seed or configuration was rejected
pub async fn run_audit(
    seed: &str,
    config: AuditConfig,
    events: Option<UnboundedSender<CrawlEvent>>,
) -> Result<SiteAuditResult, AuditError> {
    let mut coordinator = Coordinator::new(seed, config)?;
    if let Some(sender) = events {
        coordinator = coordinator.with_events(sender);
    }
    Ok(coordinator.run().await)
}

/// Runs an audit while holding `lease`, refusing when another run holds it
///
/// The lease is renewed after every batch and released when the audit ends.
///
/// # Returns
///
/// * `Err(AuditError::Busy)` - Another live audit holds the lease
pub async fn run_exclusive(
    lease: Arc<AuditLease>,
    id: &str,
    seed: &str,
    config: AuditConfig,
    events: Option<UnboundedSender<CrawlEvent>>,
) -> Result<SiteAuditResult, AuditError> {
    let ttl = lease_ttl_for(config.crawler.max_pages);
    let mut coordinator = Coordinator::new(seed, config)?;
    lease.try_acquire(id, ttl)?;
    tracing::info!("Audit lease acquired by {}", id);

    coordinator = coordinator.with_lease(Arc::clone(&lease), id);
    if let Some(sender) = events {
        coordinator = coordinator.with_events(sender);
    }
    let result = coordinator.run().await;

    lease.release(id);
    tracing::info!("Audit lease released by {}", id);
    Ok(result)
}
