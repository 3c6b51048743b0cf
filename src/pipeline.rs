use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::analysis::IntelligenceAnalyzer;
use crate::clustering::{
    build_classifier, ClusterClassifier, ClusterSource, ClusterValidator, ClusteringConfig,
    RawCluster, Story, ValidatedStories,
};
use crate::config::PipelineConfig;
use crate::dataset::{Article, ArticleDataset, ArticleStore};
use crate::error::AnalysisError;
use crate::llm::{build_engine, SynthesisEngine};
use crate::report::types::{IntelligenceReport, IntelligenceReports};
use crate::workers::StoryBatchOrchestrator;
use crate::TARGET_PIPELINE;

/// Everything one run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub clustering_config: ClusteringConfig,
    pub validated_stories: ValidatedStories,
    pub intelligence_reports: IntelligenceReports,
}

/// Cluster validation followed by batch story analysis, wired from one config.
pub struct Pipeline {
    validator: ClusterValidator,
    analyzer: Arc<IntelligenceAnalyzer>,
    orchestrator: StoryBatchOrchestrator,
    cancel: watch::Receiver<bool>,
}

impl Pipeline {
    /// Uses the classifier named in `config.validator`.
    pub fn new(config: PipelineConfig, engine: Arc<dyn SynthesisEngine>) -> Self {
        let classifier = build_classifier(&config.validator, engine.clone());
        Self::with_classifier(config, engine, classifier)
    }

    pub fn with_classifier(
        config: PipelineConfig,
        engine: Arc<dyn SynthesisEngine>,
        classifier: Arc<dyn ClusterClassifier>,
    ) -> Self {
        let analyzer = Arc::new(IntelligenceAnalyzer::new(engine, config.analyzer));
        // Nothing holds the sender, so this pipeline is never cancelled
        // unless `with_cancellation` swaps in a live receiver.
        let (_, cancel) = watch::channel(false);
        Pipeline {
            validator: ClusterValidator::new(config.validator, classifier),
            orchestrator: StoryBatchOrchestrator::new(analyzer.clone(), config.orchestrator),
            analyzer,
            cancel,
        }
    }

    /// Builds the engine from `config.engine` as well.
    pub fn from_config(config: PipelineConfig) -> Self {
        let engine = build_engine(&config.engine);
        Self::new(config, engine)
    }

    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn validate_clusters(
        &self,
        clusters: &[RawCluster],
        dataset: &ArticleDataset,
    ) -> Result<ValidatedStories, AnalysisError> {
        self.validator.validate(clusters, dataset).await
    }

    pub async fn analyze_stories(
        &self,
        validated: &ValidatedStories,
        dataset: Arc<ArticleDataset>,
    ) -> Result<IntelligenceReports, AnalysisError> {
        if validated.stories.is_empty() {
            return Err(AnalysisError::input("No stories to analyze"));
        }
        Ok(self
            .orchestrator
            .run(&validated.stories, dataset, self.cancel.clone())
            .await)
    }

    pub async fn analyze_single_story(
        &self,
        story: &Story,
        articles: &[Article],
    ) -> Result<IntelligenceReport, AnalysisError> {
        let pool: Vec<&Article> = articles.iter().collect();
        self.analyzer.analyze(story, &pool).await
    }

    /// Pulls clusters and their articles from the given sources and runs both
    /// stages. A batch with no stories yields an empty report set.
    pub async fn run(
        &self,
        source: &dyn ClusterSource,
        store: &dyn ArticleStore,
    ) -> Result<PipelineOutput> {
        let batch = source.clusters().await.context("Failed to load clusters")?;
        let wanted: BTreeSet<i64> = batch
            .clusters
            .iter()
            .flat_map(|c| c.article_ids.iter().copied())
            .collect();
        let wanted: Vec<i64> = wanted.into_iter().collect();

        let dataset = store
            .by_ids(&wanted)
            .await
            .context("Failed to load articles")?
            .into_dataset()
            .context("Article batch is inconsistent")?;
        let dataset = Arc::new(dataset);
        info!(
            target: TARGET_PIPELINE,
            "Running pipeline over {} clusters and {} articles",
            batch.clusters.len(),
            dataset.len()
        );

        let validated = self.validate_clusters(&batch.clusters, &dataset).await?;
        let intelligence_reports = if validated.stories.is_empty() {
            warn!(target: TARGET_PIPELINE, "No clusters held a story; nothing to analyze");
            IntelligenceReports::default()
        } else {
            self.analyze_stories(&validated, dataset).await?
        };

        Ok(PipelineOutput {
            clustering_config: batch.config,
            validated_stories: validated,
            intelligence_reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::{InMemoryClusterSource, RejectionReason, StoryType};
    use crate::config::EngineConfig;
    use crate::dataset::fixtures::{article, embedding, three_article_dataset};
    use crate::dataset::InMemoryArticleStore;
    use crate::llm::StubEngine;

    fn pipeline() -> Pipeline {
        Pipeline::new(PipelineConfig::default(), Arc::new(StubEngine::canned()))
    }

    fn story(article_ids: Vec<i64>) -> Story {
        Story {
            cluster_id: 0,
            title: "Storm coverage".to_string(),
            importance: 5,
            article_ids,
            story_type: StoryType::SingleStory,
        }
    }

    fn articles() -> Vec<Article> {
        let dataset = three_article_dataset();
        dataset.resolve(&[1, 2, 3]).into_iter().cloned().collect()
    }

    #[tokio::test]
    async fn test_two_stories_over_three_articles() {
        let validated = ValidatedStories {
            stories: vec![story(vec![1]), story(vec![2, 3])],
            rejected_clusters: vec![],
        };
        let reports = pipeline()
            .analyze_stories(&validated, Arc::new(three_article_dataset()))
            .await
            .unwrap();
        assert_eq!(reports.reports.len(), 2);
        assert_eq!(reports.processing_status.total_stories, 2);
        assert!(reports.processing_status.is_reconciled());
    }

    #[tokio::test]
    async fn test_no_stories_to_analyze() {
        let err = pipeline()
            .analyze_stories(&ValidatedStories::default(), Arc::new(three_article_dataset()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No stories to analyze");
    }

    #[tokio::test]
    async fn test_single_story_errors() {
        let pipeline = pipeline();
        let err = pipeline
            .analyze_single_story(&story(vec![]), &articles())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No articles in story");

        let err = pipeline
            .analyze_single_story(&story(vec![999, 1000]), &articles())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No matching articles found");
    }

    #[tokio::test]
    async fn test_noise_cluster_is_always_rejected() {
        let clusters = vec![RawCluster {
            cluster_id: 3,
            article_ids: vec![1, 2, 3],
            is_noise: true,
        }];
        let validated = pipeline()
            .validate_clusters(&clusters, &three_article_dataset())
            .await
            .unwrap();
        assert!(validated.stories.is_empty());
        assert_eq!(
            validated.rejected_clusters[0].rejection_reason,
            RejectionReason::PureNoise
        );
    }

    #[tokio::test]
    async fn test_run_end_to_end_with_stub_engine() {
        let source = InMemoryClusterSource::new(
            vec![
                RawCluster {
                    cluster_id: 0,
                    article_ids: vec![1, 2],
                    is_noise: false,
                },
                RawCluster {
                    cluster_id: 1,
                    article_ids: vec![3],
                    is_noise: false,
                },
                RawCluster {
                    cluster_id: -1,
                    article_ids: vec![4],
                    is_noise: true,
                },
            ],
            ClusteringConfig::default(),
        );
        let store = InMemoryArticleStore::new(
            vec![
                article(1, "Dam breach floods valley", "https://a.example.com/1", 4),
                article(2, "Valley flooded after dam breach", "https://b.example.com/2", 5),
                article(3, "Festival opens", "https://c.example.com/3", 5),
                article(4, "Unrelated", "https://d.example.com/4", 5),
                article(5, "Not in any cluster", "https://e.example.com/5", 5),
            ],
            vec![embedding(1, 0, 0.1), embedding(2, 0, 0.2)],
        );

        let output = Pipeline::from_config(PipelineConfig {
            engine: EngineConfig::default(),
            ..PipelineConfig::default()
        })
        .run(&source, &store)
        .await
        .unwrap();

        let validated = &output.validated_stories;
        assert_eq!(validated.stories.len(), 1);
        assert_eq!(validated.rejected_clusters.len(), 2);
        let reports = &output.intelligence_reports;
        assert_eq!(reports.reports.len(), 1);
        assert_eq!(reports.reports[0].article_ids, vec![1, 2]);
        assert!(reports.processing_status.is_reconciled());

        let json = serde_json::to_value(&output).unwrap();
        assert!(json["intelligenceReports"]["processingStatus"]["totalStories"].is_number());
    }
}
