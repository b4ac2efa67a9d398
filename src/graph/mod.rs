//! Internal link graph
//!
//! Built incrementally while pages are committed, then frozen and handed to
//! the site analyzer. All keys are normalized URLs; iteration order is
//! sorted so site-level findings come out deterministic.

use std::collections::{BTreeMap, BTreeSet};

/// Everything one page links to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingLinks {
    /// Normalized internal targets
    pub internal: BTreeSet<String>,
    /// External targets as found on the page
    pub external: BTreeSet<String>,
    /// Normalized internal targets disallowed by robots.txt
    pub blocked: BTreeSet<String>,
}

/// Who links to whom across the crawled site
#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    outgoing: BTreeMap<String, OutgoingLinks>,
    inbound: BTreeMap<String, BTreeSet<String>>,
    raw_variants: BTreeMap<String, BTreeSet<String>>,
    external: BTreeSet<String>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a crawled page so it appears as a source even without links
    pub fn add_page(&mut self, source: &str) {
        self.outgoing.entry(source.to_string()).or_default();
    }

    /// Records an internal edge
    ///
    /// # Arguments
    ///
    /// * `source` - Normalized URL of the linking page
    /// * `raw` - The absolute link as it appeared on the page
    /// * `normalized` - Normalized form of `raw`
    pub fn record_internal(&mut self, source: &str, raw: &str, normalized: &str) {
        self.outgoing
            .entry(source.to_string())
            .or_default()
            .internal
            .insert(normalized.to_string());
        self.inbound
            .entry(normalized.to_string())
            .or_default()
            .insert(source.to_string());
        self.raw_variants
            .entry(normalized.to_string())
            .or_default()
            .insert(raw.to_string());
    }

    pub fn record_external(&mut self, source: &str, url: &str) {
        self.outgoing
            .entry(source.to_string())
            .or_default()
            .external
            .insert(url.to_string());
        self.external.insert(url.to_string());
    }

    /// Marks an internal target the page links to as robots-disallowed
    pub fn record_blocked(&mut self, source: &str, normalized: &str) {
        self.outgoing
            .entry(source.to_string())
            .or_default()
            .blocked
            .insert(normalized.to_string());
    }

    /// Pages linking to `target`
    pub fn sources(&self, target: &str) -> Option<&BTreeSet<String>> {
        self.inbound.get(target)
    }

    /// Number of distinct pages linking to `target`
    pub fn inbound_count(&self, target: &str) -> usize {
        self.inbound.get(target).map_or(0, BTreeSet::len)
    }

    /// Whether any page links to `target`
    pub fn is_linked(&self, target: &str) -> bool {
        self.inbound.contains_key(target)
    }

    pub fn outgoing(&self, source: &str) -> Option<&OutgoingLinks> {
        self.outgoing.get(source)
    }

    /// Iterates over every source page and its links, sorted by URL
    pub fn pages(&self) -> impl Iterator<Item = (&String, &OutgoingLinks)> {
        self.outgoing.iter()
    }

    /// Normalized internal targets of `source`, empty when it has none
    pub fn internal_targets(&self, source: &str) -> impl Iterator<Item = &String> {
        self.outgoing
            .get(source)
            .into_iter()
            .flat_map(|links| links.internal.iter())
    }

    /// Every external URL linked from anywhere on the site
    pub fn external_urls(&self) -> &BTreeSet<String> {
        &self.external
    }

    /// Linked internal targets for which `is_crawled` is false
    pub fn uncrawled_targets<F>(&self, is_crawled: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        self.inbound
            .keys()
            .filter(|target| !is_crawled(target.as_str()))
            .cloned()
            .collect()
    }

    /// Raw spellings seen for each normalized target
    pub fn raw_variants(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.raw_variants
    }

    /// Every robots-disallowed target linked from the site
    pub fn blocked_targets(&self) -> BTreeSet<&String> {
        self.outgoing
            .values()
            .flat_map(|links| links.blocked.iter())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LinkGraph {
        let mut graph = LinkGraph::new();
        graph.add_page("https://example.com/");
        graph.record_internal(
            "https://example.com/",
            "https://example.com/a/",
            "https://example.com/a",
        );
        graph.record_internal(
            "https://example.com/",
            "https://example.com/a",
            "https://example.com/a",
        );
        graph.record_internal(
            "https://example.com/b",
            "https://example.com/a",
            "https://example.com/a",
        );
        graph.record_internal(
            "https://example.com/b",
            "https://example.com/missing",
            "https://example.com/missing",
        );
        graph.record_external("https://example.com/b", "https://other.org/");
        graph.record_blocked("https://example.com/b", "https://example.com/admin");
        graph
    }

    #[test]
    fn test_inbound_sources() {
        let graph = sample();
        assert_eq!(graph.inbound_count("https://example.com/a"), 2);
        assert_eq!(graph.inbound_count("https://example.com/"), 0);
        assert!(graph.is_linked("https://example.com/missing"));
        let sources: Vec<&String> = graph
            .sources("https://example.com/a")
            .unwrap()
            .iter()
            .collect();
        assert_eq!(sources, ["https://example.com/", "https://example.com/b"]);
    }

    #[test]
    fn test_outgoing_and_externals() {
        let graph = sample();
        let targets: Vec<&String> = graph.internal_targets("https://example.com/").collect();
        assert_eq!(targets, ["https://example.com/a"]);
        assert_eq!(graph.internal_targets("https://example.com/none").count(), 0);
        assert_eq!(graph.external_urls().len(), 1);
        assert_eq!(graph.pages().count(), 2);
        assert_eq!(
            graph.blocked_targets().into_iter().collect::<Vec<_>>(),
            ["https://example.com/admin"]
        );
    }

    #[test]
    fn test_uncrawled_targets() {
        let graph = sample();
        let uncrawled = graph.uncrawled_targets(|url| url != "https://example.com/missing");
        assert_eq!(uncrawled, vec!["https://example.com/missing"]);
    }

    #[test]
    fn test_raw_variants_are_collected() {
        let graph = sample();
        let variants = &graph.raw_variants()["https://example.com/a"];
        assert_eq!(variants.len(), 2);
        assert!(variants.contains("https://example.com/a/"));
    }
}
