//! Robots.txt parser implementation
//!
//! Rule matching is delegated to the robotstxt crate; the line-by-line pass
//! here only extracts the facts the audit reports on.

use robotstxt::DefaultMatcher;
use serde::Serialize;

/// User agent evaluated against robots.txt
///
/// Only the wildcard group is honored; product-specific groups are
/// recorded in the rules list but never applied to the crawl.
const WILDCARD_AGENT: &str = "*";

/// One `Allow` or `Disallow` line with the group it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsRule {
    pub user_agent: String,
    /// `Allow` or `Disallow`
    pub directive: String,
    pub path: String,
}

/// Parsed robots.txt facts
#[derive(Debug, Clone, Default)]
pub struct RobotsDirectives {
    /// Raw robots.txt content (empty means allow all)
    content: String,
    pub rules: Vec<RobotsRule>,
    pub sitemaps: Vec<String>,
    /// Value of the Yandex `Host` directive, if present
    pub host: Option<String>,
    /// Whether any Yandex `Clean-param` directive is present
    pub has_clean_param: bool,
}

impl RobotsDirectives {
    /// Parses raw robots.txt content
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    ///
    /// # Returns
    ///
    /// The extracted directives. Comments are stripped and lines without a
    /// `:` separator ignored; rules before any `User-agent` line belong to `*`.
    pub fn parse(content: &str) -> Self {
        let mut directives = Self {
            content: content.to_string(),
            ..Self::default()
        };
        let mut current_agent = WILDCARD_AGENT.to_string();

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => current_agent = value.to_string(),
                "allow" | "disallow" => directives.rules.push(RobotsRule {
                    user_agent: current_agent.clone(),
                    directive: if key == "allow" { "Allow" } else { "Disallow" }.to_string(),
                    path: value.to_string(),
                }),
                "sitemap" => directives.sitemaps.push(value.to_string()),
                "host" => directives.host = Some(value.to_string()),
                "clean-param" => directives.has_clean_param = true,
                _ => {}
            }
        }

        directives
    }

    /// Creates permissive directives used when robots.txt is missing
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Returns the raw robots.txt content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Checks whether the wildcard agent may fetch `url`
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to check
    pub fn is_allowed(&self, url: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, WILDCARD_AGENT, url)
    }
}
