use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use url::Url;

/// Path extensions of resources that are never HTML pages
const SKIP_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".css", ".js", ".json",
    ".xml", ".txt", ".zip", ".rar", ".gz", ".mp3", ".mp4", ".avi", ".mov", ".wmv", ".doc",
    ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".woff", ".woff2", ".ttf", ".eot",
];

/// Number of pattern hits on one path after which it counts as a trap
const TRAP_THRESHOLD: usize = 3;

static TRAP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"/\?.*page=\d+",
        r"/\?.*sort=",
        r"/\?.*filter=",
        r"/calendar/",
        r"/tag/",
        r"/\d{4}/\d{2}/\d{2}/",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("trap pattern should be valid"))
    .collect()
});

/// Returns false for URLs that point at binary or static assets, or that use
/// a scheme other than http(s)
///
/// Relative URLs are judged on their path alone.
pub fn is_crawlable_url(url: &str) -> bool {
    let (scheme, path) = match Url::parse(url) {
        Ok(parsed) => (parsed.scheme().to_string(), parsed.path().to_lowercase()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = url.split(['?', '#']).next().unwrap_or_default();
            (String::new(), path.to_lowercase())
        }
        Err(_) => return false,
    };

    if SKIP_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return false;
    }
    matches!(scheme.as_str(), "http" | "https" | "")
}

/// Detects crawl traps: pagination, sorting and filtering permutations,
/// calendars, tag archives and dated archives
///
/// Every URL matching one of the trap patterns bumps a counter keyed by its
/// path. Once a path has been seen more than three times, further matching
/// URLs on it are traps.
#[derive(Debug, Default)]
pub struct TrapDetector {
    path_hits: HashMap<String, usize>,
}

impl TrapDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `url` and returns true if it should be skipped as a trap
    pub fn is_trap(&mut self, url: &str) -> bool {
        if !TRAP_PATTERNS.iter().any(|re| re.is_match(url)) {
            return false;
        }

        let path = Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| url.split('?').next().unwrap_or_default().to_string());

        let hits = self.path_hits.entry(path).or_insert(0);
        *hits += 1;
        *hits > TRAP_THRESHOLD
    }
}
