//! Configuration module for site-audit
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All keys are optional; an empty file yields the default configuration.
//!
//! # Example
//!
//! ```no_run
//! use site_audit::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("audit.toml")).unwrap();
//! println!("Crawler will visit at most {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AuditConfig, CrawlerConfig, LimitsConfig, ThresholdsConfig, TimeoutsConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
