use chrono::{DateTime, Utc};
use std::collections::HashSet;

use crate::dataset::Article;
use crate::validation::{MAX_IMPORTANCE, MIN_IMPORTANCE};

/// Cluster size at which the size factor saturates.
const SATURATING_CLUSTER_SIZE: f64 = 32.0;

const SIZE_WEIGHT: f64 = 0.45;
const RECENCY_WEIGHT: f64 = 0.35;
const DIVERSITY_WEIGHT: f64 = 0.20;

/// Calculates the importance score for a story on the 1-10 scale.
///
/// The score is based on:
/// - Number of articles (logarithmic, saturating at 32)
/// - Recency of the newest article relative to `reference` (halves after 7 days)
/// - Source diversity (distinct hosts per article)
///
/// `reference` should be the newest publish date of the whole dataset, so
/// the same input always scores the same. With no reference every story is
/// treated as current.
pub fn score_importance(articles: &[&Article], reference: Option<DateTime<Utc>>) -> u8 {
    if articles.is_empty() {
        return MIN_IMPORTANCE;
    }

    let n = articles.len() as f64;
    let size_factor = ((1.0 + n).ln() / (1.0 + SATURATING_CLUSTER_SIZE).ln()).min(1.0);

    let recency_factor = match (reference, articles.iter().map(|a| a.publish_date).max()) {
        (Some(reference), Some(newest)) => {
            let days = (reference - newest).num_seconds().max(0) as f64 / 86400.0;
            1.0 / (1.0 + days / 7.0)
        }
        _ => 1.0,
    };

    let hosts: HashSet<String> = articles.iter().map(|a| a.source_host()).collect();
    let diversity_factor = hosts.len() as f64 / n;

    let blended = SIZE_WEIGHT * size_factor
        + RECENCY_WEIGHT * recency_factor
        + DIVERSITY_WEIGHT * diversity_factor;
    let score = 1.0 + (9.0 * blended).round();

    score.clamp(MIN_IMPORTANCE as f64, MAX_IMPORTANCE as f64) as u8
}
