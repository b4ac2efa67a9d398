//! site-audit: a technical SEO audit crawler
//!
//! This crate crawls a single website breadth-first, runs a battery of
//! per-page checks, correlates the findings across the whole site and turns
//! them into a weighted health score and a prioritized list of fixes.

pub mod analyzer;
pub mod config;
pub mod crawler;
pub mod graph;
pub mod lease;
pub mod model;
pub mod report;
pub mod robots;
pub mod site;
pub mod url;

use thiserror::Error;

/// Main error type for audit runs
///
/// Only failures that leave nothing to crawl end up here. Per-page network
/// and parse faults are recorded as issues on the page instead.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Another audit is already running (held by {holder})")]
    Busy { holder: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::AuditConfig;
pub use crawler::{run_audit, run_exclusive, Coordinator, CrawlEvent, StopHandle};
pub use lease::AuditLease;
pub use model::{Category, Issue, IssueCode, PageResult, Severity, SiteAuditResult};
pub use crate::url::{normalize_url, SiteScope};
