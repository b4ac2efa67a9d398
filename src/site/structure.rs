use super::{first_segment, push_issue, SiteContext};
use crate::graph::LinkGraph;
use crate::model::{
    BrokenLink, Category, Issue, IssueCode, RedirectEntry, Severity, SiteAuditResult,
    SitemapComparison, ThinCluster, UrlVariants,
};
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// Entries kept in each sitemap comparison list
const COMPARISON_LIST_CAP: usize = 50;
/// Raw spellings kept per URL-pattern duplicate
const MAX_VARIANTS: usize = 10;

pub(super) fn build_redirect_map(result: &mut SiteAuditResult) {
    result.redirect_map = result
        .pages
        .values()
        .filter(|page| page.redirect_chain.len() > 1)
        .map(|page| RedirectEntry {
            chain: page.redirect_chain.clone(),
            hops: page.redirect_chain.len() - 1,
            redirect_type: page.redirect_type,
        })
        .collect();
}

/// Resolves every link target's status and flags pages linking to errors
///
/// Internal targets take their status from the crawled page, else from the
/// post-crawl status checks (0 when never checked). External targets only
/// count when external checks ran.
pub(super) fn build_broken_link_map(result: &mut SiteAuditResult, ctx: &SiteContext<'_>) {
    let mut broken_map = Vec::new();

    for (source, links) in ctx.graph.pages() {
        let mut broken_urls = Vec::new();
        let mut broken_internal = 0;
        for target in &links.internal {
            let status = result
                .pages
                .get(target)
                .map(|page| page.status_code)
                .or_else(|| ctx.uncrawled_status.get(target).copied())
                .unwrap_or(0);
            if status >= 400 {
                broken_internal += 1;
                broken_urls.push(target.clone());
                broken_map.push(BrokenLink {
                    source: source.clone(),
                    broken_url: target.clone(),
                    status_code: status,
                });
            }
        }

        let mut broken_external = 0;
        if !ctx.external_status.is_empty() {
            for target in &links.external {
                let status = ctx.external_status.get(target).copied().unwrap_or(200);
                if status >= 400 {
                    broken_external += 1;
                    broken_urls.push(target.clone());
                }
            }
        }

        let Some(page) = result.pages.get_mut(source) else {
            continue;
        };
        page.broken_internal_links = broken_internal;
        page.broken_external_links = broken_external;
        page.broken_links_on_page = broken_urls;
        if broken_internal > 0 {
            page.push_issue(
                Issue::new(
                    Severity::Critical,
                    Category::Links,
                    IssueCode::BrokenInternalLinks,
                    format!("{} broken internal links", broken_internal),
                )
                .with_values(broken_internal.to_string(), "0"),
            );
        }
        if broken_external > 0 {
            page.push_issue(
                Issue::new(
                    Severity::Warning,
                    Category::Links,
                    IssueCode::BrokenExternalLinks,
                    format!("{} broken external links", broken_external),
                )
                .with_values(broken_external.to_string(), "0"),
            );
        }
    }

    result.broken_link_map = broken_map;
}

/// Normalized targets that were linked under several spellings
pub(super) fn find_url_pattern_duplicates(result: &mut SiteAuditResult, graph: &LinkGraph) {
    result.url_pattern_duplicates = graph
        .raw_variants()
        .iter()
        .filter_map(|(normalized, raw)| {
            let variants: BTreeSet<&str> = raw.iter().map(|v| v.trim_end_matches('/')).collect();
            (variants.len() > 1).then(|| UrlVariants {
                normalized: normalized.clone(),
                variants: variants
                    .into_iter()
                    .take(MAX_VARIANTS)
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect();
}

/// Groups thin pages by their first path segment
pub(super) fn find_thin_clusters(result: &mut SiteAuditResult, thin_words: usize) {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for page in result.pages.values() {
        if page.word_count < thin_words {
            groups
                .entry(first_segment(page))
                .or_default()
                .push(page.url.clone());
        }
    }
    result.thin_content_clusters = groups
        .into_iter()
        .filter(|(_, urls)| urls.len() >= 2)
        .map(|(directory, urls)| ThinCluster { directory, urls })
        .collect();
}

/// Scheme, host and path without trailing slash; query and fragment dropped
fn comparison_key(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let path = url.path().trim_end_matches('/');
            let path = if path.is_empty() { "/" } else { path };
            let host = match url.port() {
                Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
                None => url.host_str().unwrap_or_default().to_string(),
            };
            format!("{}://{}{}", url.scheme(), host, path)
        }
        Err(_) => raw.to_string(),
    }
}

pub(super) fn compare_sitemap(result: &mut SiteAuditResult) {
    let in_sitemap: BTreeSet<String> = result
        .sitemap_entries
        .iter()
        .map(|entry| comparison_key(&entry.url))
        .collect();
    let crawled: BTreeSet<String> = result.pages.keys().map(|url| comparison_key(url)).collect();

    result.sitemap_vs_crawled = SitemapComparison {
        only_in_sitemap: in_sitemap
            .difference(&crawled)
            .take(COMPARISON_LIST_CAP)
            .cloned()
            .collect(),
        only_in_crawl: crawled
            .difference(&in_sitemap)
            .take(COMPARISON_LIST_CAP)
            .cloned()
            .collect(),
        sitemap_total: result.sitemap_entries.len(),
        crawled_total: result.pages.len(),
        overlap: in_sitemap.intersection(&crawled).count(),
    };
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::AuditConfig;
    use crate::robots::SitemapEntry;
    use std::collections::HashMap;

    fn context<'a>(
        graph: &'a LinkGraph,
        uncrawled: &'a HashMap<String, u16>,
        external: &'a HashMap<String, u16>,
        config: &'a AuditConfig,
    ) -> SiteContext<'a> {
        SiteContext {
            graph,
            uncrawled_status: uncrawled,
            external_status: external,
            config,
        }
    }

    #[test]
    fn test_redirect_map() {
        let mut moved = page("https://example.com/new");
        moved.redirect_chain = vec![
            "https://example.com/old".to_string(),
            "https://example.com/new".to_string(),
        ];
        moved.redirect_type = 301;
        let mut result = site(vec![moved, page("https://example.com/")]);
        build_redirect_map(&mut result);
        assert_eq!(result.redirect_map.len(), 1);
        assert_eq!(result.redirect_map[0].hops, 1);
        assert_eq!(result.redirect_map[0].redirect_type, 301);
    }

    #[test]
    fn test_broken_internal_links() {
        let mut gone = page("https://example.com/gone");
        gone.status_code = 404;
        let mut result = site(vec![page("https://example.com/"), gone]);
        let mut graph = LinkGraph::new();
        link(&mut graph, "https://example.com/", "https://example.com/gone");
        link(&mut graph, "https://example.com/", "https://example.com/missing");
        link(&mut graph, "https://example.com/", "https://example.com/unchecked");
        let uncrawled = HashMap::from([("https://example.com/missing".to_string(), 410)]);
        let external = HashMap::new();
        let config = AuditConfig::default();

        build_broken_link_map(&mut result, &context(&graph, &uncrawled, &external, &config));

        assert_eq!(result.broken_link_map.len(), 2);
        assert_eq!(result.broken_link_map[0].broken_url, "https://example.com/gone");
        assert_eq!(result.broken_link_map[1].status_code, 410);
        let home = &result.pages["https://example.com/"];
        assert_eq!(home.broken_internal_links, 2);
        let issue = home
            .issues
            .iter()
            .find(|i| i.code == IssueCode::BrokenInternalLinks)
            .unwrap();
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.current_value.as_deref(), Some("2"));
    }

    #[test]
    fn test_broken_external_links_need_checks() {
        let mut result = site(vec![page("https://example.com/")]);
        let mut graph = LinkGraph::new();
        graph.record_external("https://example.com/", "https://dead.org/");
        graph.record_external("https://example.com/", "https://unchecked.org/");
        let uncrawled = HashMap::new();
        let config = AuditConfig::default();

        let none = HashMap::new();
        build_broken_link_map(&mut result, &context(&graph, &uncrawled, &none, &config));
        assert_eq!(result.pages["https://example.com/"].broken_external_links, 0);

        let checked = HashMap::from([("https://dead.org/".to_string(), 500)]);
        build_broken_link_map(&mut result, &context(&graph, &uncrawled, &checked, &config));
        let home = &result.pages["https://example.com/"];
        assert_eq!(home.broken_external_links, 1);
        assert_eq!(home.broken_links_on_page, ["https://dead.org/"]);
        assert!(home.has_issue(IssueCode::BrokenExternalLinks));
    }

    #[test]
    fn test_url_pattern_duplicates() {
        let mut result = site(vec![]);
        let mut graph = LinkGraph::new();
        let norm = "https://example.com/a";
        graph.record_internal("https://example.com/", "https://example.com/a", norm);
        graph.record_internal("https://example.com/", "https://example.com/a/", norm);
        graph.record_internal("https://example.com/", "https://example.com/a?", norm);
        graph.record_internal("https://example.com/", "https://example.com/b", "https://example.com/b");

        find_url_pattern_duplicates(&mut result, &graph);

        assert_eq!(result.url_pattern_duplicates.len(), 1);
        assert_eq!(
            result.url_pattern_duplicates[0].variants,
            ["https://example.com/a", "https://example.com/a?"]
        );
    }

    #[test]
    fn test_thin_clusters() {
        let mut pages = Vec::new();
        for url in [
            "https://example.com/tag/a",
            "https://example.com/tag/b",
            "https://example.com/news/x",
        ] {
            let mut p = page(url);
            p.word_count = 50;
            pages.push(p);
        }
        pages.push(page("https://example.com/tag/full"));
        let mut result = site(pages);

        find_thin_clusters(&mut result, 300);

        assert_eq!(result.thin_content_clusters.len(), 1);
        assert_eq!(result.thin_content_clusters[0].directory, "tag");
        assert_eq!(result.thin_content_clusters[0].urls.len(), 2);
    }

    #[test]
    fn test_sitemap_comparison() {
        let mut result = site(vec![
            page("https://example.com/"),
            page("https://example.com/a"),
            page("https://example.com/crawl-only"),
        ]);
        result.sitemap_entries = ["https://example.com/", "https://example.com/a/", "https://example.com/map-only"]
            .iter()
            .map(|u| SitemapEntry {
                url: u.to_string(),
                lastmod: String::new(),
            })
            .collect();

        compare_sitemap(&mut result);

        let cmp = &result.sitemap_vs_crawled;
        assert_eq!(cmp.only_in_sitemap, ["https://example.com/map-only"]);
        assert_eq!(cmp.only_in_crawl, ["https://example.com/crawl-only"]);
        assert_eq!(cmp.overlap, 2);
        assert_eq!(cmp.sitemap_total, 3);
        assert_eq!(cmp.crawled_total, 3);
    }
}
