//! URL handling module for site-audit
//!
//! This module provides URL normalization, link resolution, the internal
//! site scope, and the filters that keep assets and crawl traps out of the
//! frontier.

mod domain;
mod filter;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, strip_www, SiteScope};
pub use filter::{is_crawlable_url, TrapDetector};
pub use normalize::{canonical_compare_key, normalize_parsed, normalize_url, resolve_url};
