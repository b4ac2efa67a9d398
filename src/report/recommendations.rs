use crate::model::{IssueCode, Severity, SiteAuditResult};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use strum_macros::{EnumIter, IntoStaticStr};

/// URLs listed on one recommendation
const MAX_URLS: usize = 20;

/// Rough cost of applying a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Quick,
    Medium,
    Complex,
}

/// Every kind of fix the audit can recommend
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecommendationKind {
    BrokenLinks,
    MissingH1,
    MultipleH1,
    MissingTitle,
    EmptyTitle,
    MissingDescription,
    DuplicateTitles,
    DuplicateDescriptions,
    MissingAlt,
    MissingCanonical,
    SlowPages,
    NoSchema,
    NoHttpsRedirect,
    RedirectChains,
    MissingViewport,
    OrphanPages,
    ThinContent,
    MissingOg,
    MissingCharset,
    MixedContent,
    HeadingHierarchy,
    NoindexLinked,
    RobotsBlockedLinked,
    YandexCleanParam,
    DeadEndPages,
    LowInlinks,
    CanonicalChain,
    CanonicalSitemapConflict,
    SchemaIncomplete,
}

/// Text of a recommendation; `title` may contain a `{count}` placeholder
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub title: &'static str,
    pub impact: &'static str,
    pub fix: &'static str,
    pub effort: Effort,
}

impl RecommendationKind {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn template(self) -> Template {
        use Effort::*;
        let (title, impact, fix, effort) = match self {
            Self::BrokenLinks => (
                "Fix {count} pages with broken links or error responses",
                "Crawlers waste budget on dead links and visitors hit error pages.",
                "Redirect removed URLs with a 301 to their replacement, or update and remove the links in navigation and content.",
                Quick,
            ),
            Self::MissingH1 => (
                "Add an H1 heading to {count} pages",
                "Without an H1 search engines have a harder time understanding the main topic of the page.",
                "Add a single H1 containing the page's primary keyword.",
                Quick,
            ),
            Self::MultipleH1 => (
                "Keep a single H1 on {count} pages",
                "Several H1 headings dilute the page's topical focus.",
                "Keep one H1 and demote the others to H2 or H3.",
                Quick,
            ),
            Self::MissingTitle => (
                "Add a title to {count} pages",
                "Pages without a title are nearly invisible in search and get an arbitrary snippet.",
                "Write a unique title of 30-60 characters with the main keyword for each page.",
                Medium,
            ),
            Self::EmptyTitle => (
                "Fill in the empty title on {count} pages",
                "An empty title gives search engines nothing to show in results.",
                "Write a unique, descriptive title for each page.",
                Medium,
            ),
            Self::MissingDescription => (
                "Add a meta description to {count} pages",
                "Search engines build the snippet from random page text, which lowers click-through.",
                "Write a 120-160 character description that summarizes the page and invites the click.",
                Medium,
            ),
            Self::DuplicateTitles => (
                "Make {count} groups of duplicate titles unique",
                "Pages sharing a title compete with each other in search results.",
                "Give every page a title that reflects its own content.",
                Medium,
            ),
            Self::DuplicateDescriptions => (
                "Make {count} groups of duplicate descriptions unique",
                "Identical snippets make pages indistinguishable in search results.",
                "Write a distinct meta description for every page.",
                Medium,
            ),
            Self::MissingAlt => (
                "Add alt text to images on {count} pages",
                "Images without alt text are invisible to image search and to screen readers.",
                "Describe each meaningful image in its alt attribute.",
                Medium,
            ),
            Self::MissingCanonical => (
                "Review canonical tags on {count} pages",
                "Missing or misdirected canonicals let duplicate URLs split ranking signals.",
                "Add a self-referencing canonical to every indexable page and point duplicates at a live 200 page.",
                Medium,
            ),
            Self::SlowPages => (
                "Speed up {count} slow pages",
                "Slow server responses hurt rankings and drive visitors away.",
                "Enable caching and compression, and profile the slowest server-side handlers.",
                Complex,
            ),
            Self::NoSchema => (
                "Add structured data markup",
                "Without schema.org markup the site misses rich results in search.",
                "Add JSON-LD for the organization, breadcrumbs and the main content types.",
                Complex,
            ),
            Self::NoHttpsRedirect => (
                "Redirect HTTP to HTTPS",
                "The site answers on plain HTTP, which splits signals and is flagged as insecure by browsers.",
                "Configure a permanent 301 redirect from every HTTP URL to its HTTPS version.",
                Quick,
            ),
            Self::RedirectChains => (
                "Shorten redirect chains on {count} pages",
                "Every extra hop slows the page down and leaks link equity.",
                "Point links and redirects straight at the final URL.",
                Medium,
            ),
            Self::MissingViewport => (
                "Add a viewport meta tag to {count} pages",
                "Without a viewport the page renders poorly on mobile, which affects mobile rankings.",
                "Add <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">.",
                Quick,
            ),
            Self::OrphanPages => (
                "Link to {count} orphan pages",
                "Pages listed in the sitemap but never linked internally get little crawl attention and no link equity.",
                "Add links to these pages from relevant sections, or drop them from the sitemap.",
                Medium,
            ),
            Self::ThinContent => (
                "Expand thin content on {count} pages",
                "Pages with little text rarely rank and can drag down the site's perceived quality.",
                "Add useful content or merge thin pages into stronger ones.",
                Complex,
            ),
            Self::MissingOg => (
                "Add Open Graph tags to {count} pages",
                "Shared links show up without a proper title, description or image.",
                "Add og:title, og:description and og:image to every page.",
                Medium,
            ),
            Self::MissingCharset => (
                "Declare the character encoding on {count} pages",
                "Without a charset declaration text may render garbled.",
                "Add <meta charset=\"utf-8\"> at the top of the head.",
                Quick,
            ),
            Self::MixedContent => (
                "Remove mixed content from {count} pages",
                "HTTP resources on HTTPS pages trigger browser warnings or get blocked.",
                "Load every script, stylesheet and image over HTTPS.",
                Medium,
            ),
            Self::HeadingHierarchy => (
                "Fix the heading hierarchy on {count} pages",
                "Skipped heading levels make the document structure harder to parse.",
                "Nest headings in order: H1, then H2, then H3.",
                Medium,
            ),
            Self::NoindexLinked => (
                "Review {count} noindex pages that receive internal links",
                "Linking to pages excluded from the index wastes crawl budget and link equity.",
                "Remove the links or make the pages indexable if they matter.",
                Medium,
            ),
            Self::RobotsBlockedLinked => (
                "Review {count} linked URLs blocked by robots.txt",
                "Links to blocked URLs waste crawl budget and hide content from search.",
                "Open the important URLs in robots.txt or stop linking to them.",
                Medium,
            ),
            Self::YandexCleanParam => (
                "Add a Clean-param directive for tracking parameters",
                "URLs with tracking or sorting parameters create duplicates in Yandex.",
                "Add Clean-param to robots.txt for utm_, sort and filter parameters.",
                Quick,
            ),
            Self::DeadEndPages => (
                "Add outgoing links to {count} dead-end pages",
                "Pages without internal links stop crawlers and visitors alike.",
                "Link each page to related content and its parent section.",
                Medium,
            ),
            Self::LowInlinks => (
                "Strengthen internal linking to {count} weakly linked pages",
                "Pages with one inbound link or none receive little link equity.",
                "Link to these pages from navigation, hubs and related articles.",
                Medium,
            ),
            Self::CanonicalChain => (
                "Flatten {count} canonical chains",
                "Canonicals that point at pages with their own canonical may be ignored.",
                "Point every canonical directly at the final page.",
                Quick,
            ),
            Self::CanonicalSitemapConflict => (
                "Resolve {count} sitemap URLs that canonicalize elsewhere",
                "The sitemap and the canonical tags send contradicting signals.",
                "List only canonical URLs in the sitemap.",
                Quick,
            ),
            Self::SchemaIncomplete => (
                "Complete structured data on {count} pages",
                "Markup missing required properties is not eligible for rich results.",
                "Add the required properties for each schema.org type.",
                Medium,
            ),
        };
        Template {
            title,
            impact,
            fix,
            effort,
        }
    }
}

/// Kind of fix a page-level issue feeds into, if any
///
/// Codes without a kind are either informational or covered by a
/// site-level recommendation.
pub fn recommendation_for(code: IssueCode) -> Option<RecommendationKind> {
    use IssueCode::*;
    use RecommendationKind as K;
    match code {
        ClientError | ServerError | BrokenInternalLinks | BrokenExternalLinks => {
            Some(K::BrokenLinks)
        }
        MissingH1 | EmptyH1 => Some(K::MissingH1),
        MultipleH1 => Some(K::MultipleH1),
        MissingTitle => Some(K::MissingTitle),
        EmptyTitle => Some(K::EmptyTitle),
        MissingDescription | EmptyDescription => Some(K::MissingDescription),
        MissingAlt => Some(K::MissingAlt),
        MissingCanonical | CanonicalTargetError | CanonicalNotSelf => Some(K::MissingCanonical),
        SlowTtfb => Some(K::SlowPages),
        RedirectChain => Some(K::RedirectChains),
        MissingViewport => Some(K::MissingViewport),
        ThinContent | VeryThinContent => Some(K::ThinContent),
        MissingOgTitle | MissingOgDesc | MissingOgImage => Some(K::MissingOg),
        MissingCharset => Some(K::MissingCharset),
        MixedContent => Some(K::MixedContent),
        HeadingHierarchy => Some(K::HeadingHierarchy),

        SslError | Timeout | ConnectionError | InvalidUrl | RedirectLoop | EmptyResponse
        | NonHtmlContent | LargePage | CrawlError | BlockedByServer | CloudflareProtection
        | XrobotsNoindex | XrobotsNofollow | LongUrl | TooManyQueryParams | Redirect
        | ShortTitle | LongTitle | ShortDescription | LongDescription | Noindex | Nofollow
        | MetaNoarchive | MetaNosnippet | LongH1 | H1EqualsTitle | LowTextRatio
        | MultipleCanonical | EmptyCanonical | RelativeCanonical | CanonicalHttp
        | CanonicalChain | CanonicalCycle | CanonicalSitemapConflict | EmptyAltNonDecorative
        | MissingDimensions | BrokenImages | LargeImages | InvalidJsonLd | SchemaIncomplete
        | SchemaInvalidJson | MissingTwitter | WrongCharset | MissingLang | MissingHreflang
        | JsRenderingRisk | NofollowInternal | EmptyHrefLinks | ZeroInlinks | LowInlinks
        | DeadEndPage | DuplicateTitle | DuplicateDescription | DuplicateContent => None,
    }
}

/// One actionable fix with the pages it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub key: RecommendationKind,
    pub title: String,
    pub impact: &'static str,
    pub fix: &'static str,
    pub effort: Effort,
    pub severity: Severity,
    pub urls: Vec<String>,
    pub count: usize,
}

impl Recommendation {
    fn new(kind: RecommendationKind, severity: Severity, urls: Vec<String>, count: usize) -> Self {
        let template = kind.template();
        Self {
            key: kind,
            title: template.title.replace("{count}", &count.to_string()),
            impact: template.impact,
            fix: template.fix,
            effort: template.effort,
            severity,
            urls: urls.into_iter().take(MAX_URLS).collect(),
            count,
        }
    }
}

/// Affected pages and worst severity collected for one kind
#[derive(Default)]
struct Bucket {
    urls: Vec<String>,
    seen: HashSet<String>,
    severity: Option<Severity>,
}

/// Builds the sorted recommendation list
pub fn generate_recommendations(result: &mut SiteAuditResult) {
    let mut buckets: BTreeMap<RecommendationKind, Bucket> = BTreeMap::new();
    for (url, page) in &result.pages {
        for issue in &page.issues {
            let Some(kind) = recommendation_for(issue.code) else {
                continue;
            };
            let bucket = buckets.entry(kind).or_default();
            if bucket.seen.insert(url.clone()) {
                bucket.urls.push(url.clone());
            }
            bucket.severity = Some(match bucket.severity {
                Some(current) => current.min(issue.severity),
                None => issue.severity,
            });
        }
    }

    let mut recs: Vec<Recommendation> = buckets
        .into_iter()
        .map(|(kind, bucket)| {
            let count = bucket.urls.len();
            Recommendation::new(
                kind,
                bucket.severity.unwrap_or(Severity::Info),
                bucket.urls,
                count,
            )
        })
        .collect();

    recs.extend(site_level(result));
    recs.sort_by_key(|r| r.severity);
    result.recommendations = recs;
}

/// Recommendations driven by site-wide findings rather than page issues
fn site_level(result: &SiteAuditResult) -> Vec<Recommendation> {
    use RecommendationKind as K;
    let mut recs = Vec::new();

    if !result.http_to_https {
        recs.push(Recommendation::new(
            K::NoHttpsRedirect,
            Severity::Critical,
            vec![result.base_url.clone()],
            1,
        ));
    }
    if !result.orphan_pages.is_empty() {
        recs.push(Recommendation::new(
            K::OrphanPages,
            Severity::Warning,
            result.orphan_pages.clone(),
            result.orphan_pages.len(),
        ));
    }
    for (kind, groups) in [
        (K::DuplicateTitles, &result.duplicate_titles),
        (K::DuplicateDescriptions, &result.duplicate_descriptions),
    ] {
        if !groups.is_empty() {
            let urls = groups.iter().flat_map(|g| g.urls.iter().cloned()).collect();
            recs.push(Recommendation::new(kind, Severity::Warning, urls, groups.len()));
        }
    }
    if result.no_structured_data {
        recs.push(Recommendation::new(
            K::NoSchema,
            Severity::Warning,
            vec![result.base_url.clone()],
            1,
        ));
    }
    if !result.noindex_linked_pages.is_empty() {
        recs.push(Recommendation::new(
            K::NoindexLinked,
            Severity::Warning,
            result.noindex_linked_pages.clone(),
            result.noindex_linked_pages.len(),
        ));
    }
    if !result.robots_linked_blocked.is_empty() {
        recs.push(Recommendation::new(
            K::RobotsBlockedLinked,
            Severity::Warning,
            result.robots_linked_blocked.clone(),
            result.robots_linked_blocked.len(),
        ));
    }
    let has_tracking_urls = result.pages.keys().any(|url| {
        url.contains('?') && ["utm_", "sort=", "filter="].iter().any(|p| url.contains(p))
    });
    if !result.robots_has_clean_param && has_tracking_urls {
        recs.push(Recommendation::new(
            K::YandexCleanParam,
            Severity::Info,
            Vec::new(),
            0,
        ));
    }
    if !result.dead_end_pages.is_empty() {
        recs.push(Recommendation::new(
            K::DeadEndPages,
            Severity::Warning,
            result.dead_end_pages.clone(),
            result.dead_end_pages.len(),
        ));
    }
    if !result.pages_low_inlinks.is_empty() {
        recs.push(Recommendation::new(
            K::LowInlinks,
            Severity::Warning,
            result.pages_low_inlinks.clone(),
            result.pages_low_inlinks.len(),
        ));
    }
    if !result.canonical_chains.is_empty() {
        recs.push(Recommendation::new(
            K::CanonicalChain,
            Severity::Warning,
            result
                .canonical_chains
                .iter()
                .map(|c| c.chain[0].clone())
                .collect(),
            result.canonical_chains.len(),
        ));
    }
    if !result.canonical_sitemap_conflicts.is_empty() {
        recs.push(Recommendation::new(
            K::CanonicalSitemapConflict,
            Severity::Warning,
            result
                .canonical_sitemap_conflicts
                .iter()
                .map(|c| c.url.clone())
                .collect(),
            result.canonical_sitemap_conflicts.len(),
        ));
    }
    if !result.schema_validation_issues.is_empty() {
        let mut seen = HashSet::new();
        let urls: Vec<String> = result
            .schema_validation_issues
            .iter()
            .filter(|f| seen.insert(f.url.as_str()))
            .map(|f| f.url.clone())
            .collect();
        let count = urls.len();
        recs.push(Recommendation::new(
            K::SchemaIncomplete,
            Severity::Warning,
            urls,
            count,
        ));
    }

    recs
}
