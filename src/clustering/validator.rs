use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::classifier::{ClusterClassifier, ClusterVerdict};
use super::significance::score_importance;
use super::types::{RawCluster, RejectedCluster, RejectionReason, Story, ValidatedStories};
use super::TARGET_VALIDATION;
use crate::config::ValidatorConfig;
use crate::dataset::ArticleDataset;
use crate::error::AnalysisError;
use crate::validation::{MAX_IMPORTANCE, MIN_IMPORTANCE};

/// Decides, for every raw cluster, whether it becomes a story or a rejection.
pub struct ClusterValidator {
    config: ValidatorConfig,
    classifier: Arc<dyn ClusterClassifier>,
}

/// A cluster after the cheap checks: either already rejected or waiting on
/// the classifier with its usable article IDs.
enum Screened<'a> {
    Rejected(RejectedCluster),
    Candidate {
        cluster: &'a RawCluster,
        article_ids: Vec<i64>,
    },
}

enum Judgement {
    Story(Story),
    Rejected(RejectedCluster),
}

fn rejection(cluster: &RawCluster, reason: RejectionReason) -> RejectedCluster {
    RejectedCluster {
        cluster_id: cluster.cluster_id,
        rejection_reason: reason,
        original_article_ids: cluster.article_ids.clone(),
    }
}

impl ClusterValidator {
    pub fn new(config: ValidatorConfig, classifier: Arc<dyn ClusterClassifier>) -> Self {
        ClusterValidator { config, classifier }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Classifies `clusters` in input order. Every input cluster lands in
    /// exactly one of the two output lists.
    pub async fn validate(
        &self,
        clusters: &[RawCluster],
        dataset: &ArticleDataset,
    ) -> Result<ValidatedStories, AnalysisError> {
        let mut seen = HashSet::new();
        for cluster in clusters {
            if !seen.insert(cluster.cluster_id) {
                return Err(AnalysisError::input(format!(
                    "Duplicate cluster ID {}",
                    cluster.cluster_id
                )));
            }
        }

        info!(
            target: TARGET_VALIDATION,
            "Validating {} clusters against {} articles using the {} classifier",
            clusters.len(),
            dataset.len(),
            self.classifier.name()
        );

        let reference = dataset.newest_publish_date();
        let screened: Vec<Screened> = clusters.iter().map(|c| self.screen(c, dataset)).collect();

        let judgements: Vec<Judgement> = stream::iter(screened)
            .map(|item| self.judge(item, dataset, reference))
            .buffered(self.config.classification_concurrency.max(1))
            .collect()
            .await;

        let mut validated = ValidatedStories::default();
        for judgement in judgements {
            match judgement {
                Judgement::Story(story) => validated.stories.push(story),
                Judgement::Rejected(rejected) => validated.rejected_clusters.push(rejected),
            }
        }

        let violations = validated.check_partition(clusters);
        if !violations.is_empty() {
            error!(
                target: TARGET_VALIDATION,
                "Cluster partition check failed: {:?}", violations
            );
            return Err(AnalysisError::Validation {
                message: "validated stories do not partition the input clusters".to_string(),
                violations,
            });
        }

        info!(
            target: TARGET_VALIDATION,
            "{} stories, {} rejected clusters",
            validated.stories.len(),
            validated.rejected_clusters.len()
        );
        Ok(validated)
    }

    fn screen<'a>(&self, cluster: &'a RawCluster, dataset: &ArticleDataset) -> Screened<'a> {
        if cluster.is_noise {
            debug!(target: TARGET_VALIDATION, "Cluster {} is noise", cluster.cluster_id);
            return Screened::Rejected(rejection(cluster, RejectionReason::PureNoise));
        }

        let mut unique = HashSet::new();
        let article_ids: Vec<i64> = cluster
            .article_ids
            .iter()
            .copied()
            .filter(|id| unique.insert(*id))
            .filter(|id| dataset.contains(*id))
            .collect();

        let unknown = unique.len() - article_ids.len();
        if unknown > 0 {
            warn!(
                target: TARGET_VALIDATION,
                "Cluster {} references {} unknown articles", cluster.cluster_id, unknown
            );
        }

        if article_ids.len() < self.config.min_articles {
            debug!(
                target: TARGET_VALIDATION,
                "Cluster {} has {} usable articles, need {}",
                cluster.cluster_id,
                article_ids.len(),
                self.config.min_articles
            );
            return Screened::Rejected(rejection(cluster, RejectionReason::InsufficientArticles));
        }

        Screened::Candidate {
            cluster,
            article_ids,
        }
    }

    async fn judge(
        &self,
        item: Screened<'_>,
        dataset: &ArticleDataset,
        reference: Option<DateTime<Utc>>,
    ) -> Judgement {
        let (cluster, article_ids) = match item {
            Screened::Rejected(rejected) => return Judgement::Rejected(rejected),
            Screened::Candidate {
                cluster,
                article_ids,
            } => (cluster, article_ids),
        };
        let articles = dataset.resolve(&article_ids);

        let verdict = match self.classifier.classify(cluster, &articles, dataset).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(
                    target: TARGET_VALIDATION,
                    "Classifier {} failed on cluster {}: {}",
                    self.classifier.name(),
                    cluster.cluster_id,
                    e
                );
                return Judgement::Rejected(rejection(cluster, RejectionReason::NoStories));
            }
        };

        let (title, story_type, suggested) = match verdict {
            ClusterVerdict::NoStories { reason } => {
                debug!(
                    target: TARGET_VALIDATION,
                    "Cluster {} has no story: {}", cluster.cluster_id, reason
                );
                return Judgement::Rejected(rejection(cluster, RejectionReason::NoStories));
            }
            ClusterVerdict::Story {
                title,
                story_type,
                importance,
            } => (title, story_type, importance),
        };

        let title = if title.trim().is_empty() {
            format!("Cluster {}", cluster.cluster_id)
        } else {
            title.trim().to_string()
        };
        let importance = suggested
            .map(|i| i.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE))
            .unwrap_or_else(|| score_importance(&articles, reference));

        match Story::new(cluster.cluster_id, title, importance, article_ids, story_type) {
            Ok(story) => Judgement::Story(story),
            Err(violations) => {
                warn!(
                    target: TARGET_VALIDATION,
                    "Cluster {} produced an invalid story: {:?}", cluster.cluster_id, violations
                );
                Judgement::Rejected(rejection(cluster, RejectionReason::NoStories))
            }
        }
    }
}
