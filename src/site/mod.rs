//! Site-level analysis
//!
//! Runs once after the crawl, over the committed pages and the frozen link
//! graph. Adds cross-page issues to the affected pages and fills the
//! site-wide findings on [`SiteAuditResult`].

mod aggregate;
mod canonical;
mod duplicates;
mod linking;
mod schema;
pub mod similarity;
mod structure;

use crate::config::AuditConfig;
use crate::graph::LinkGraph;
use crate::model::{Category, Issue, IssueCode, PageResult, Severity, SiteAuditResult};
use crate::url::normalize_url;
use std::collections::HashMap;

/// Inputs resolved after the crawl that the site analyzer needs
#[derive(Debug, Clone, Copy)]
pub struct SiteContext<'a> {
    pub graph: &'a LinkGraph,
    /// Status of linked internal targets that were never crawled
    pub uncrawled_status: &'a HashMap<String, u16>,
    /// Status of checked external targets; empty when external checks are off
    pub external_status: &'a HashMap<String, u16>,
    pub config: &'a AuditConfig,
}

/// Runs every site-level check
///
/// Expects `result.pages` and `result.sitemap_entries` to be populated.
pub fn analyze_site(result: &mut SiteAuditResult, ctx: &SiteContext<'_>) {
    let seed = normalize_url(&result.base_url);
    tracing::info!("Analyzing {} pages site-wide", result.pages.len());

    duplicates::find_duplicates(result, ctx.config.limits.max_similarity_pairs);
    linking::find_orphans(result, ctx.graph, &seed);
    linking::find_deep_pages(result);
    linking::find_zero_inlinks(result, ctx.graph, &seed);
    linking::find_noindex_linked(result, ctx.graph);
    structure::build_redirect_map(result);
    structure::build_broken_link_map(result, ctx);
    structure::find_url_pattern_duplicates(result, ctx.graph);
    structure::find_thin_clusters(result, ctx.config.thresholds.thin_words);
    aggregate::check_structured_data(result);
    structure::compare_sitemap(result);
    linking::analyze_interlinking(result, ctx.graph, &seed);
    linking::compute_pagerank(result, ctx.graph);
    canonical::find_canonical_chains(result);
    canonical::find_sitemap_conflicts(result);
    schema::validate_schemas(result);
    aggregate::aggregate(result);
}

/// Appends an issue to one page, if it was crawled
fn push_issue(result: &mut SiteAuditResult, url: &str, issue: Issue) {
    if let Some(page) = result.pages.get_mut(url) {
        page.push_issue(issue);
    }
}

fn warning(category: Category, code: IssueCode, message: impl Into<String>) -> Issue {
    Issue::new(Severity::Warning, category, code, message)
}

/// First path segment of a page, `/` for the root
fn first_segment(page: &PageResult) -> String {
    ::url::Url::parse(&page.url)
        .ok()
        .and_then(|u| {
            u.path()
                .trim_matches('/')
                .split('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "/".to_string())
}
