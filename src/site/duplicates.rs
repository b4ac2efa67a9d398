use super::similarity::near_duplicate_clusters;
use super::{push_issue, warning};
use crate::crawler::fetcher::truncate;
use crate::model::{Category, DuplicateGroup, IssueCode, PageResult, SiteAuditResult};
use std::collections::{BTreeMap, HashSet};

/// Groups pages sharing a non-empty value, keeping groups of two or more
fn group_by<F>(result: &SiteAuditResult, key: F) -> BTreeMap<String, Vec<String>>
where
    F: Fn(&PageResult) -> &str,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (url, page) in &result.pages {
        let value = key(page);
        if !value.is_empty() {
            groups.entry(value.to_string()).or_default().push(url.clone());
        }
    }
    groups.retain(|_, urls| urls.len() > 1);
    groups
}

/// Exact duplicates by title, description and content hash, then near
/// duplicates among the remaining pages
pub(super) fn find_duplicates(result: &mut SiteAuditResult, max_similarity_pairs: usize) {
    let titles = group_by(result, |p| &p.title);
    for (title, urls) in &titles {
        for url in urls {
            push_issue(
                result,
                url,
                warning(
                    Category::Content,
                    IssueCode::DuplicateTitle,
                    format!("Title is shared with {} other pages", urls.len() - 1),
                )
                .with_values(truncate(title, 90), "unique title"),
            );
        }
    }
    result.duplicate_titles = titles
        .into_iter()
        .map(|(value, urls)| DuplicateGroup {
            value: Some(value),
            urls,
        })
        .collect();

    let descriptions = group_by(result, |p| &p.description);
    for (description, urls) in &descriptions {
        for url in urls {
            push_issue(
                result,
                url,
                warning(
                    Category::Content,
                    IssueCode::DuplicateDescription,
                    format!("Meta description is shared with {} other pages", urls.len() - 1),
                )
                .with_values(truncate(description, 90), "unique description"),
            );
        }
    }
    result.duplicate_descriptions = descriptions
        .into_iter()
        .map(|(value, urls)| DuplicateGroup {
            value: Some(value),
            urls,
        })
        .collect();

    let mut content_groups: Vec<Vec<String>> = group_by(result, |p| &p.content_hash)
        .into_values()
        .collect();

    let exact: HashSet<&String> = content_groups.iter().flatten().collect();
    let candidates: Vec<(&str, &str)> = result
        .pages
        .iter()
        .filter(|(url, _)| !exact.contains(url))
        .map(|(url, page)| (url.as_str(), page.content_text.as_str()))
        .collect();
    let near = near_duplicate_clusters(&candidates, max_similarity_pairs);
    tracing::debug!(
        "Near-duplicate detection: {} clusters after {} comparisons",
        near.clusters.len(),
        near.comparisons
    );
    content_groups.extend(near.clusters);

    for urls in &content_groups {
        for url in urls {
            push_issue(
                result,
                url,
                warning(
                    Category::Content,
                    IssueCode::DuplicateContent,
                    format!(
                        "Content duplicates or nearly duplicates {} other pages",
                        urls.len() - 1
                    ),
                ),
            );
        }
    }
    result.duplicate_content = content_groups
        .into_iter()
        .map(|urls| DuplicateGroup { value: None, urls })
        .collect();
}
