//! Breadth-first crawl frontier
//!
//! This module handles:
//! - The FIFO queue of URLs waiting to be fetched
//! - The visited set, keyed by normalized URL
//! - The link-ingestion gates deciding which discovered links get queued
//! - Crawl-trap bookkeeping

use crate::robots::RobotsDirectives;
use crate::url::{is_crawlable_url, normalize_url, SiteScope, TrapDetector};
use std::collections::{HashSet, VecDeque};

/// A URL queued for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// The URL as discovered (not normalized)
    pub url: String,

    /// Link depth from the seed
    pub depth: u32,
}

/// What the frontier did with a discovered link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Marked visited and queued one level deeper
    Enqueued,
    /// The source page is already at the depth limit
    TooDeep,
    AlreadyVisited,
    External,
    /// Excluded by file extension or scheme
    NotCrawlable,
    Trap,
    /// Disallowed by robots.txt; `enqueued` is false when robots are respected
    RobotsBlocked { enqueued: bool },
}

/// Crawl frontier: FIFO queue plus visited set
#[derive(Debug)]
pub struct CrawlFrontier {
    queue: VecDeque<QueuedUrl>,
    visited: HashSet<String>,
    traps: TrapDetector,
    max_depth: u32,
    respect_robots: bool,
}

impl CrawlFrontier {
    /// Creates a frontier holding only the seed at depth 0
    ///
    /// # Arguments
    ///
    /// * `seed` - The seed URL
    /// * `max_depth` - Links found at this depth are not followed
    /// * `respect_robots` - Whether robots-disallowed links are skipped
    pub fn new(seed: &str, max_depth: u32, respect_robots: bool) -> Self {
        let mut visited = HashSet::new();
        visited.insert(normalize_url(seed));
        Self {
            queue: VecDeque::from([QueuedUrl {
                url: seed.to_string(),
                depth: 0,
            }]),
            visited,
            traps: TrapDetector::new(),
            max_depth,
            respect_robots,
        }
    }

    /// Pops the next batch
    ///
    /// # Arguments
    ///
    /// * `workers` - Maximum batch size
    /// * `remaining` - Pages still allowed by the page budget
    pub fn next_batch(&mut self, workers: usize, remaining: usize) -> Vec<QueuedUrl> {
        let size = workers.min(remaining).min(self.queue.len());
        self.queue.drain(..size).collect()
    }

    /// Applies the ingestion gates to one internal link found on a page
    ///
    /// Gates run in order: depth budget, visited, scope, crawlable
    /// extension, trap detection, robots. Only a link that passes all of
    /// them (or is robots-blocked while robots are ignored) is queued.
    ///
    /// # Arguments
    ///
    /// * `link` - Absolute link as found on the page
    /// * `normalized` - Its normalized form
    /// * `source_depth` - Depth of the page the link was found on
    /// * `scope` - The audited site
    /// * `robots` - Directives for the wildcard agent
    pub fn admit(
        &mut self,
        link: &str,
        normalized: &str,
        source_depth: u32,
        scope: &SiteScope,
        robots: &RobotsDirectives,
    ) -> Admission {
        if source_depth >= self.max_depth {
            return Admission::TooDeep;
        }
        if self.visited.contains(normalized) {
            return Admission::AlreadyVisited;
        }
        if !scope.is_internal(link) {
            return Admission::External;
        }
        if !is_crawlable_url(link) {
            return Admission::NotCrawlable;
        }
        if self.traps.is_trap(link) {
            return Admission::Trap;
        }

        let blocked = !robots.is_allowed(link);
        if blocked && self.respect_robots {
            return Admission::RobotsBlocked { enqueued: false };
        }

        self.visited.insert(normalized.to_string());
        self.queue.push_back(QueuedUrl {
            url: link.to_string(),
            depth: source_depth + 1,
        });
        if blocked {
            Admission::RobotsBlocked { enqueued: true }
        } else {
            Admission::Enqueued
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Number of distinct URLs ever admitted, seed included
    pub fn discovered(&self) -> usize {
        self.visited.len()
    }
}
