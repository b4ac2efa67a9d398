//! Audit data model
//!
//! Issues, per-page results and the site-wide aggregate. Severity, category
//! and issue codes are closed enumerations; values outside them cannot be
//! constructed.

mod framework;
mod issue;
mod page;
mod site;

pub use framework::Framework;
pub use issue::{Category, Issue, IssueCode, Severity};
pub use page::{CanonicalStatus, Heading, HreflangTag, PageResult};
pub use site::{
    BrokenLink, CanonicalChain, CanonicalConflict, DeepPage, DuplicateGroup, RedirectEntry,
    SchemaFinding, SiteAuditResult, SitemapComparison, ThinCluster, UrlVariants, WwwConsistency,
};
