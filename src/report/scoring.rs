use crate::model::{Category, SiteAuditResult};
use serde::Serialize;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Normalized penalty at which a category score reaches zero
pub const MAX_CATEGORY_PENALTY: f64 = 30.0;
/// Scales the per-page penalty before capping
const PENALTY_SCALE: f64 = 6.0;
const FORMULA: &str = "weighted_average(category_scores * weights)";

/// Score buckets; security issues count toward the technical score
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    Technical,
    Content,
    Links,
    Images,
    StructuredData,
}

impl ScoreCategory {
    /// Share of the health score; weights sum to one
    pub fn weight(self) -> f64 {
        match self {
            Self::Technical => 0.30,
            Self::Content => 0.25,
            Self::Links => 0.25,
            Self::Images => 0.10,
            Self::StructuredData => 0.10,
        }
    }

    /// Bucket an issue category is scored under
    pub fn of(category: Category) -> Self {
        match category {
            Category::Technical | Category::Security => Self::Technical,
            Category::Content => Self::Content,
            Category::Links => Self::Links,
            Category::Images => Self::Images,
            Category::StructuredData => Self::StructuredData,
        }
    }
}

/// How the health score was derived
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreExplanation {
    pub formula: &'static str,
    pub weights: BTreeMap<ScoreCategory, f64>,
    pub category_scores: BTreeMap<ScoreCategory, u32>,
    pub category_raw_penalties: BTreeMap<ScoreCategory, u32>,
    pub category_normalized_penalties: BTreeMap<ScoreCategory, f64>,
    pub pages_count: usize,
    pub health_score: u32,
}

/// Computes category scores, the weighted health score and its explanation
///
/// Each category's raw penalty is the sum of severity penalties of its
/// issues. It is normalized by site size so that large sites are not
/// punished for having more pages, then capped at [`MAX_CATEGORY_PENALTY`].
///
/// An audit that committed no pages is not scored: the health score stays
/// 0, no category scores are set and the explanation records zero pages.
pub fn calculate_scores(result: &mut SiteAuditResult) {
    if result.pages.is_empty() {
        result.health_score = 0;
        result.category_scores.clear();
        result.score_explanation = Some(ScoreExplanation {
            formula: FORMULA,
            weights: ScoreCategory::iter().map(|c| (c, c.weight())).collect(),
            category_scores: BTreeMap::new(),
            category_raw_penalties: BTreeMap::new(),
            category_normalized_penalties: BTreeMap::new(),
            pages_count: 0,
            health_score: 0,
        });
        return;
    }
    let pages_count = result.pages.len();

    let mut raw: BTreeMap<ScoreCategory, u32> =
        ScoreCategory::iter().map(|c| (c, 0)).collect();
    for issue in result.pages.values().flat_map(|p| &p.issues) {
        *raw.entry(ScoreCategory::of(issue.category)).or_insert(0) += issue.severity.penalty();
    }

    let mut normalized = BTreeMap::new();
    let mut scores = BTreeMap::new();
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (&category, &penalty) in &raw {
        let norm = (penalty as f64 / pages_count as f64 * PENALTY_SCALE).min(MAX_CATEGORY_PENALTY);
        let score = (100.0 - norm / MAX_CATEGORY_PENALTY * 100.0).max(0.0) as u32;
        normalized.insert(category, norm);
        scores.insert(category, score);
        weighted_sum += score as f64 * category.weight();
        total_weight += category.weight();
    }

    let health = (weighted_sum / total_weight).round().clamp(0.0, 100.0) as u32;

    result.health_score = health;
    result.category_scores = scores.clone();
    result.score_explanation = Some(ScoreExplanation {
        formula: FORMULA,
        weights: ScoreCategory::iter().map(|c| (c, c.weight())).collect(),
        category_scores: scores,
        category_raw_penalties: raw,
        category_normalized_penalties: normalized,
        pages_count,
        health_score: health,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Issue, IssueCode, PageResult, Severity};

    fn site_with(issues_per_page: &[Vec<Issue>]) -> SiteAuditResult {
        let mut result = SiteAuditResult::new("https://example.com/", "example.com");
        for (i, issues) in issues_per_page.iter().enumerate() {
            let mut page = PageResult::new(format!("https://example.com/p{}", i), 1);
            page.issues = issues.clone();
            result.pages.insert(page.url.clone(), page);
        }
        result
    }

    fn critical(category: Category) -> Issue {
        Issue::new(Severity::Critical, category, IssueCode::ServerError, "x")
    }

    #[test]
    fn test_clean_site_scores_100() {
        let mut result = site_with(&[vec![], vec![]]);
        calculate_scores(&mut result);
        assert_eq!(result.health_score, 100);
        assert!(result.category_scores.values().all(|&s| s == 100));
        assert_eq!(result.category_scores.len(), 5);
    }

    #[test]
    fn test_empty_audit_is_not_scored() {
        let mut result = site_with(&[]);
        calculate_scores(&mut result);
        assert_eq!(result.health_score, 0);
        assert!(result.category_scores.is_empty());

        let explanation = result.score_explanation.unwrap();
        assert_eq!(explanation.pages_count, 0);
        assert_eq!(explanation.health_score, 0);
        assert!(explanation.category_scores.is_empty());
    }

    #[test]
    fn test_category_penalty_normalization() {
        // One critical on one of two pages: 5 / 2 * 6 = 15, half the cap
        let mut result = site_with(&[vec![critical(Category::Technical)], vec![]]);
        calculate_scores(&mut result);
        assert_eq!(result.category_scores[&ScoreCategory::Technical], 50);
        // 50 * 0.30 + 100 * 0.70 = 85
        assert_eq!(result.health_score, 85);

        let explanation = result.score_explanation.unwrap();
        assert_eq!(explanation.category_raw_penalties[&ScoreCategory::Technical], 5);
        assert_eq!(
            explanation.category_normalized_penalties[&ScoreCategory::Technical],
            15.0
        );
    }

    #[test]
    fn test_security_counts_as_technical_and_caps() {
        let issues = vec![critical(Category::Security); 10];
        let mut result = site_with(&[issues]);
        calculate_scores(&mut result);
        assert_eq!(result.category_scores[&ScoreCategory::Technical], 0);
        assert_eq!(result.health_score, 70);
    }

    #[test]
    fn test_info_issues_are_free() {
        let info = Issue::new(Severity::Info, Category::Content, IssueCode::MissingLang, "x");
        let mut result = site_with(&[vec![info; 20]]);
        calculate_scores(&mut result);
        assert_eq!(result.health_score, 100);
    }

    #[test]
    fn test_health_is_monotone_in_criticals() {
        let mut previous = 101;
        for n in 0..8 {
            let mut result = site_with(&[vec![critical(Category::Content); n], vec![]]);
            calculate_scores(&mut result);
            assert!(result.health_score <= previous);
            previous = result.health_score;
        }
    }
}
