use super::{push_issue, warning};
use crate::crawler::fetcher::truncate;
use crate::model::{
    CanonicalChain, CanonicalConflict, CanonicalStatus, Category, IssueCode, SiteAuditResult,
};
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// Chain nodes shown in an issue's current value
const CHAIN_PREVIEW: usize = 4;

/// Last path segment, or `/` for the root
fn last_segment(raw: &str) -> String {
    Url::parse(raw)
        .ok()
        .and_then(|url| {
            url.path()
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "/".to_string())
}

/// Follows canonicals that point at pages which canonicalize elsewhere
///
/// A walk stops at the first page without an outgoing canonical, or at a
/// node it already visited. The latter is a cycle and every page on it is
/// reported once.
pub(super) fn find_canonical_chains(result: &mut SiteAuditResult) {
    let pointers: BTreeMap<String, String> = result
        .pages
        .values()
        .filter(|page| page.canonical_status == Some(CanonicalStatus::Other))
        .filter(|page| !page.canonical_absolute.is_empty())
        .map(|page| (page.url.clone(), page.canonical_absolute.clone()))
        .collect();

    let mut chains = Vec::new();
    let mut on_cycle: HashSet<&str> = HashSet::new();

    for (start, first_target) in &pointers {
        if on_cycle.contains(start.as_str()) || !pointers.contains_key(first_target) {
            continue;
        }

        let mut chain = vec![start.as_str(), first_target.as_str()];
        let mut seen: HashSet<&str> = chain.iter().copied().collect();
        let mut cycle = false;
        let mut current = first_target.as_str();
        while let Some(next) = pointers.get(current).map(String::as_str) {
            chain.push(next);
            if !seen.insert(next) {
                cycle = true;
                break;
            }
            current = next;
        }

        if cycle {
            on_cycle.extend(chain.iter().copied());
        }
        chains.push(CanonicalChain {
            chain: chain.iter().map(|s| s.to_string()).collect(),
            length: chain.len(),
            cycle,
        });
    }

    for entry in &chains {
        let preview = entry
            .chain
            .iter()
            .take(CHAIN_PREVIEW)
            .map(|url| last_segment(url))
            .collect::<Vec<_>>()
            .join(" → ");
        let issue = if entry.cycle {
            warning(
                Category::Technical,
                IssueCode::CanonicalCycle,
                "Canonical tags form a loop",
            )
            .with_values(preview, "canonical to an indexable page")
        } else {
            warning(
                Category::Technical,
                IssueCode::CanonicalChain,
                format!("Canonical chain of {} hops", entry.length - 1),
            )
            .with_values(preview, "direct canonical to final page")
        };
        push_issue(result, &entry.chain[0], issue);
    }

    result.canonical_chains = chains;
}

/// Sitemap URLs whose canonical points somewhere else
pub(super) fn find_sitemap_conflicts(result: &mut SiteAuditResult) {
    let in_sitemap: HashSet<&str> = result
        .sitemap_entries
        .iter()
        .map(|entry| entry.url.as_str())
        .collect();

    let conflicts: Vec<CanonicalConflict> = result
        .pages
        .values()
        .filter(|page| in_sitemap.contains(page.url.as_str()))
        .filter(|page| page.canonical_status == Some(CanonicalStatus::Other))
        .filter(|page| page.canonical_absolute != page.url)
        .map(|page| CanonicalConflict {
            url: page.url.clone(),
            canonical: page.canonical.clone(),
            canonical_norm: page.canonical_absolute.clone(),
        })
        .collect();

    for conflict in &conflicts {
        push_issue(
            result,
            &conflict.url,
            warning(
                Category::Technical,
                IssueCode::CanonicalSitemapConflict,
                "URL is listed in the sitemap but canonicalizes to another page",
            )
            .with_values(truncate(&conflict.canonical, 80), "canonical to self"),
        );
    }
    result.canonical_sitemap_conflicts = conflicts;
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::model::PageResult;
    use crate::robots::SitemapEntry;

    fn pointing(url: &str, canonical: &str) -> PageResult {
        let mut p = page(url);
        p.canonical = canonical.to_string();
        p.canonical_absolute = canonical.to_string();
        p.canonical_status = Some(CanonicalStatus::Other);
        p
    }

    #[test]
    fn test_chain_of_three() {
        let a = "https://example.com/a";
        let b = "https://example.com/b";
        let c = "https://example.com/c";
        let mut result = site(vec![pointing(a, b), pointing(b, c), page(c)]);

        find_canonical_chains(&mut result);

        assert_eq!(result.canonical_chains.len(), 1);
        let chain = &result.canonical_chains[0];
        assert_eq!(chain.chain, [a, b, c]);
        assert_eq!(chain.length, 3);
        assert!(!chain.cycle);
        let issue = result.pages[a]
            .issues
            .iter()
            .find(|i| i.code == IssueCode::CanonicalChain)
            .unwrap();
        assert_eq!(issue.current_value.as_deref(), Some("a → b → c"));
        assert!(!result.pages[b].has_issue(IssueCode::CanonicalChain));
    }

    #[test]
    fn test_single_hop_is_not_a_chain() {
        let mut result = site(vec![
            pointing("https://example.com/a", "https://example.com/b"),
            page("https://example.com/b"),
        ]);
        find_canonical_chains(&mut result);
        assert!(result.canonical_chains.is_empty());
    }

    #[test]
    fn test_cycle_is_reported_once() {
        let a = "https://example.com/a";
        let b = "https://example.com/b";
        let mut result = site(vec![pointing(a, b), pointing(b, a)]);

        find_canonical_chains(&mut result);

        assert_eq!(result.canonical_chains.len(), 1);
        assert!(result.canonical_chains[0].cycle);
        assert_eq!(result.canonical_chains[0].chain, [a, b, a]);
        assert!(result.pages[a].has_issue(IssueCode::CanonicalCycle));
        assert!(!result.pages[a].has_issue(IssueCode::CanonicalChain));
    }

    #[test]
    fn test_sitemap_conflicts() {
        let listed = "https://example.com/listed";
        let mut result = site(vec![
            pointing(listed, "https://example.com/main"),
            pointing("https://example.com/unlisted", "https://example.com/main"),
            page("https://example.com/main"),
        ]);
        result.sitemap_entries = vec![
            SitemapEntry {
                url: listed.to_string(),
                lastmod: String::new(),
            },
            SitemapEntry {
                url: "https://example.com/main".to_string(),
                lastmod: String::new(),
            },
        ];

        find_sitemap_conflicts(&mut result);

        assert_eq!(result.canonical_sitemap_conflicts.len(), 1);
        assert_eq!(result.canonical_sitemap_conflicts[0].url, listed);
        assert!(result.pages[listed].has_issue(IssueCode::CanonicalSitemapConflict));
    }
}
