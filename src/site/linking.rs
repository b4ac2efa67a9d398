//! Link-structure findings: reachability, inlinks and link equity

use super::{push_issue, warning};
use crate::graph::LinkGraph;
use crate::model::{Category, DeepPage, Issue, IssueCode, Severity, SiteAuditResult};
use std::collections::{BTreeSet, HashMap};

/// Pages deeper than this are reported as deep
const MAX_HEALTHY_DEPTH: u32 = 3;
/// Pages with fewer inbound links than this count as weakly linked
const LOW_INLINKS: usize = 2;
const DAMPING: f64 = 0.85;
const PAGERANK_ITERATIONS: usize = 20;

/// Sitemap URLs no crawled page links to
pub(super) fn find_orphans(result: &mut SiteAuditResult, graph: &LinkGraph, seed: &str) {
    let orphans: BTreeSet<&String> = result
        .sitemap_entries
        .iter()
        .map(|entry| &entry.url)
        .filter(|url| url.as_str() != seed && !graph.is_linked(url))
        .collect();
    result.orphan_pages = orphans.into_iter().cloned().collect();
}

pub(super) fn find_deep_pages(result: &mut SiteAuditResult) {
    result.deep_pages = result
        .pages
        .values()
        .filter(|page| page.crawl_depth > MAX_HEALTHY_DEPTH)
        .map(|page| DeepPage {
            url: page.url.clone(),
            depth: page.crawl_depth,
        })
        .collect();
}

/// Crawled pages, other than the seed, that nothing links to
pub(super) fn find_zero_inlinks(result: &mut SiteAuditResult, graph: &LinkGraph, seed: &str) {
    let unlinked: Vec<String> = result
        .pages
        .keys()
        .filter(|url| url.as_str() != seed && !graph.is_linked(url))
        .cloned()
        .collect();
    for url in &unlinked {
        push_issue(
            result,
            url,
            warning(
                Category::Links,
                IssueCode::ZeroInlinks,
                "No internal links point to this page",
            ),
        );
    }
    result.zero_inlink_pages = unlinked;
}

/// Non-indexable pages that still receive internal links
pub(super) fn find_noindex_linked(result: &mut SiteAuditResult, graph: &LinkGraph) {
    result.noindex_linked_pages = result
        .pages
        .values()
        .filter(|page| !page.is_indexable && graph.is_linked(&page.url))
        .map(|page| page.url.clone())
        .collect();
}

/// Inlink counts, dead ends and inlink statistics
pub(super) fn analyze_interlinking(result: &mut SiteAuditResult, graph: &LinkGraph, seed: &str) {
    let mut counts = Vec::new();
    let mut dead_ends = Vec::new();
    let mut low = Vec::new();

    for (url, page) in result.pages.iter_mut() {
        page.inlink_count = graph.inbound_count(url);
        if url == seed {
            continue;
        }

        if graph.internal_targets(url).next().is_none() {
            page.is_dead_end = true;
            page.push_issue(
                warning(
                    Category::Links,
                    IssueCode::DeadEndPage,
                    "Dead-end page: no outgoing internal links",
                )
                .with_values("0 links", ">0 links"),
            );
            dead_ends.push(url.clone());
        }

        counts.push(page.inlink_count);
        if page.inlink_count < LOW_INLINKS {
            low.push(url.clone());
            if page.inlink_count == 1 {
                page.push_issue(
                    Issue::new(
                        Severity::Info,
                        Category::Links,
                        IssueCode::LowInlinks,
                        "Only one internal link points to this page",
                    )
                    .with_values("1", format!(">={}", LOW_INLINKS)),
                );
            }
        }
    }

    result.dead_end_pages = dead_ends;
    result.pages_low_inlinks = low;

    if counts.is_empty() {
        return;
    }
    counts.sort_unstable();
    let total: usize = counts.iter().sum();
    result.avg_inlinks = round1(total as f64 / counts.len() as f64);
    result.max_inlinks = counts[counts.len() - 1];
    let mid = counts.len() / 2;
    result.median_inlinks = (counts[mid] + counts[counts.len() - 1 - mid]) as f64 / 2.0;
}

/// Internal link equity per page, scaled so the strongest page scores 100
///
/// # Arguments
///
/// * `result` - Site result whose pages receive `internal_pagerank`
/// * `graph` - Link graph; edges to uncrawled targets are ignored
pub(super) fn compute_pagerank(result: &mut SiteAuditResult, graph: &LinkGraph) {
    let urls: Vec<String> = result.pages.keys().cloned().collect();
    let n = urls.len();
    if n < 2 {
        return;
    }
    let index: HashMap<&str, usize> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| (url.as_str(), i))
        .collect();
    let out: Vec<Vec<usize>> = urls
        .iter()
        .map(|url| {
            graph
                .internal_targets(url)
                .filter_map(|target| index.get(target.as_str()).copied())
                .collect()
        })
        .collect();

    let base = (1.0 - DAMPING) / n as f64;
    let mut scores = vec![1.0 / n as f64; n];
    for _ in 0..PAGERANK_ITERATIONS {
        let mut next = vec![base; n];
        for (i, targets) in out.iter().enumerate() {
            if targets.is_empty() {
                let share = DAMPING * scores[i] / n as f64;
                next.iter_mut().for_each(|score| *score += share);
            } else {
                let share = DAMPING * scores[i] / targets.len() as f64;
                for &t in targets {
                    next[t] += share;
                }
            }
        }
        scores = next;
    }

    let max = scores.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return;
    }
    for (url, score) in urls.iter().zip(scores) {
        if let Some(page) = result.pages.get_mut(url) {
            page.internal_pagerank = round1(score / max * 100.0);
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::robots::SitemapEntry;

    const SEED: &str = "https://example.com/";

    fn entry(url: &str) -> SitemapEntry {
        SitemapEntry {
            url: url.to_string(),
            lastmod: String::new(),
        }
    }

    #[test]
    fn test_sitemap_url_without_links_is_orphan() {
        let mut result = site(vec![page(SEED)]);
        result.sitemap_entries = vec![entry(SEED), entry("https://example.com/about")];
        let graph = LinkGraph::new();

        find_orphans(&mut result, &graph, SEED);

        assert_eq!(result.orphan_pages, ["https://example.com/about"]);
    }

    #[test]
    fn test_linked_sitemap_url_is_not_orphan() {
        let mut result = site(vec![page(SEED)]);
        result.sitemap_entries = vec![entry("https://example.com/about")];
        let mut graph = LinkGraph::new();
        link(&mut graph, SEED, "https://example.com/about");

        find_orphans(&mut result, &graph, SEED);

        assert!(result.orphan_pages.is_empty());
    }

    #[test]
    fn test_deep_pages() {
        let mut deep = page("https://example.com/a/b/c/d");
        deep.crawl_depth = 4;
        let mut edge = page("https://example.com/a/b/c");
        edge.crawl_depth = 3;
        let mut result = site(vec![deep, edge]);
        find_deep_pages(&mut result);
        assert_eq!(result.deep_pages.len(), 1);
        assert_eq!(result.deep_pages[0].depth, 4);
    }

    #[test]
    fn test_zero_inlinks_excludes_seed() {
        let mut result = site(vec![page(SEED), page("https://example.com/lonely")]);
        let graph = LinkGraph::new();
        find_zero_inlinks(&mut result, &graph, SEED);
        assert_eq!(result.zero_inlink_pages, ["https://example.com/lonely"]);
        assert!(result.pages["https://example.com/lonely"].has_issue(IssueCode::ZeroInlinks));
        assert!(!result.pages[SEED].has_issue(IssueCode::ZeroInlinks));
    }

    #[test]
    fn test_noindex_linked() {
        let mut hidden = page("https://example.com/hidden");
        hidden.is_indexable = false;
        let mut unlinked = page("https://example.com/unlinked");
        unlinked.is_indexable = false;
        let mut result = site(vec![page(SEED), hidden, unlinked]);
        let mut graph = LinkGraph::new();
        link(&mut graph, SEED, "https://example.com/hidden");

        find_noindex_linked(&mut result, &graph);

        assert_eq!(result.noindex_linked_pages, ["https://example.com/hidden"]);
    }

    #[test]
    fn test_interlinking_stats_and_dead_ends() {
        let a = "https://example.com/a";
        let b = "https://example.com/b";
        let c = "https://example.com/c";
        let mut result = site(vec![page(SEED), page(a), page(b), page(c)]);
        let mut graph = LinkGraph::new();
        link(&mut graph, SEED, a);
        link(&mut graph, SEED, b);
        link(&mut graph, SEED, c);
        link(&mut graph, a, b);
        link(&mut graph, b, a);
        link(&mut graph, c, b);

        analyze_interlinking(&mut result, &graph, SEED);

        // a: 2 inlinks, b: 3, c: 1
        assert_eq!(result.pages[b].inlink_count, 3);
        assert_eq!(result.max_inlinks, 3);
        assert_eq!(result.avg_inlinks, 2.0);
        assert_eq!(result.median_inlinks, 2.0);
        assert_eq!(result.pages_low_inlinks, [c]);
        assert!(result.pages[c].has_issue(IssueCode::LowInlinks));
        assert!(result.dead_end_pages.is_empty());
    }

    #[test]
    fn test_dead_end_page() {
        let a = "https://example.com/a";
        let mut result = site(vec![page(SEED), page(a)]);
        let mut graph = LinkGraph::new();
        link(&mut graph, SEED, a);

        analyze_interlinking(&mut result, &graph, SEED);

        assert_eq!(result.dead_end_pages, [a]);
        assert!(result.pages[a].is_dead_end);
        assert!(result.pages[a].has_issue(IssueCode::DeadEndPage));
        assert!(!result.pages[SEED].is_dead_end);
    }

    #[test]
    fn test_even_median() {
        let urls = ["https://example.com/a", "https://example.com/b"];
        let mut result = site(vec![page(SEED), page(urls[0]), page(urls[1])]);
        let mut graph = LinkGraph::new();
        link(&mut graph, SEED, urls[0]);
        link(&mut graph, SEED, urls[1]);
        link(&mut graph, urls[0], urls[1]);
        link(&mut graph, urls[1], SEED);

        analyze_interlinking(&mut result, &graph, SEED);

        assert_eq!(result.median_inlinks, 1.5);
    }

    #[test]
    fn test_pagerank_hub_scores_highest() {
        let hub = "https://example.com/hub";
        let leaves = ["https://example.com/x", "https://example.com/y", "https://example.com/z"];
        let mut pages = vec![page(hub)];
        pages.extend(leaves.iter().map(|u| page(u)));
        let mut result = site(pages);
        let mut graph = LinkGraph::new();
        for leaf in leaves {
            link(&mut graph, leaf, hub);
            link(&mut graph, hub, leaf);
        }
        link(&mut graph, hub, "https://example.com/uncrawled");

        compute_pagerank(&mut result, &graph);

        assert_eq!(result.pages[hub].internal_pagerank, 100.0);
        let leaf = result.pages[leaves[0]].internal_pagerank;
        assert!(leaf > 0.0 && leaf < 100.0);
        assert_eq!(leaf, result.pages[leaves[2]].internal_pagerank);
    }

    #[test]
    fn test_pagerank_needs_two_pages() {
        let mut result = site(vec![page(SEED)]);
        compute_pagerank(&mut result, &LinkGraph::new());
        assert_eq!(result.pages[SEED].internal_pagerank, 0.0);
    }
}
