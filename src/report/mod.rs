//! Health scoring and recommendations
//!
//! The last stage of an audit: turns the issues collected on every page
//! into per-category scores, an overall health score and a prioritized list
//! of fixes.

mod recommendations;
mod scoring;

pub use recommendations::{
    generate_recommendations, recommendation_for, Effort, Recommendation, RecommendationKind,
};
pub use scoring::{calculate_scores, ScoreCategory, ScoreExplanation, MAX_CATEGORY_PENALTY};

use crate::model::SiteAuditResult;

/// Scores the site and builds its recommendation list
pub fn finalize(result: &mut SiteAuditResult) {
    calculate_scores(result);
    generate_recommendations(result);
    tracing::info!(
        "Health score {} with {} recommendations",
        result.health_score,
        result.recommendations.len()
    );
}
