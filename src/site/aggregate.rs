use crate::model::{Framework, SiteAuditResult};
use std::collections::{BTreeMap, BTreeSet};

/// Sets the site-wide flag when no page carries JSON-LD or microdata
pub(super) fn check_structured_data(result: &mut SiteAuditResult) {
    result.no_structured_data = !result
        .pages
        .values()
        .any(|page| page.has_schema || page.has_microdata);
}

/// Status histogram, issue tallies and detected platforms
pub(super) fn aggregate(result: &mut SiteAuditResult) {
    let mut status_codes = BTreeMap::new();
    let mut by_severity = BTreeMap::new();
    let mut by_category: BTreeMap<_, BTreeMap<_, usize>> = BTreeMap::new();
    let mut frameworks: BTreeSet<Framework> = BTreeSet::new();

    for page in result.pages.values() {
        *status_codes.entry(page.status_code).or_insert(0) += 1;
        for issue in &page.issues {
            *by_severity.entry(issue.severity).or_insert(0) += 1;
            *by_category
                .entry(issue.category)
                .or_default()
                .entry(issue.severity)
                .or_insert(0) += 1;
        }
        if let Some(framework) = page.detected_framework {
            frameworks.insert(framework);
        }
    }

    result.total_scanned = result.pages.len();
    result.status_codes = status_codes;
    result.issues_by_severity = by_severity;
    result.issues_by_category = by_category;
    result.detected_frameworks = frameworks.into_iter().collect();
}
