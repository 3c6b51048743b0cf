use std::sync::Arc;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::retry::{backoff_delay, wait_for_cancel};
use super::TARGET_BATCH;
use crate::analysis::IntelligenceAnalyzer;
use crate::clustering::types::Story;
use crate::config::OrchestratorConfig;
use crate::dataset::ArticleDataset;
use crate::error::AnalysisError;
use crate::report::aggregator::{aggregate, StoryOutcome};
use crate::report::story_id::assign_story_ids;
use crate::report::types::{IntelligenceReport, IntelligenceReports};

type StoryResult = Result<IntelligenceReport, AnalysisError>;

/// Runs one analysis task per story on a bounded pool and folds the results.
/// A failing story never affects the others.
pub struct StoryBatchOrchestrator {
    analyzer: Arc<IntelligenceAnalyzer>,
    config: OrchestratorConfig,
}

impl StoryBatchOrchestrator {
    pub fn new(analyzer: Arc<IntelligenceAnalyzer>, config: OrchestratorConfig) -> Self {
        StoryBatchOrchestrator { analyzer, config }
    }

    /// Analyzes `stories` until done or until `cancel` flips to true. Stories
    /// cancelled before or during analysis count as failed.
    pub async fn run(
        &self,
        stories: &[Story],
        dataset: Arc<ArticleDataset>,
        mut cancel: watch::Receiver<bool>,
    ) -> IntelligenceReports {
        let batch_id = Uuid::new_v4();
        let story_ids = assign_story_ids(
            &stories.iter().map(|s| s.title.as_str()).collect::<Vec<_>>(),
        );
        info!(
            target: TARGET_BATCH,
            "Batch {}: analyzing {} stories, {} at a time, via {}",
            batch_id,
            stories.len(),
            self.config.max_concurrency,
            self.analyzer.engine_name()
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let (tx, mut rx) = mpsc::channel::<(usize, StoryResult)>(stories.len().max(1));
        let mut slots: Vec<Option<StoryResult>> = (0..stories.len()).map(|_| None).collect();
        let mut handles = Vec::with_capacity(stories.len());

        for (index, story) in stories.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = wait_for_cancel(&mut cancel) => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                warn!(
                    target: TARGET_BATCH,
                    "Batch {}: cancelled with {} stories not started",
                    batch_id,
                    stories.len() - index
                );
                for slot in slots.iter_mut().skip(index) {
                    *slot = Some(Err(AnalysisError::Cancelled));
                }
                break;
            };

            let analyzer = self.analyzer.clone();
            let story = story.clone();
            let story_id = story_ids[index].clone();
            let dataset = dataset.clone();
            let config = self.config.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result =
                    analyze_with_retry(&analyzer, &story, &story_id, &dataset, &config, cancel)
                        .await;
                if tx.send((index, result)).await.is_err() {
                    error!(target: TARGET_BATCH, "Result channel closed before story {} reported", story_id);
                }
            });
            handles.push((index, handle));
        }
        drop(tx);

        while let Some((index, result)) = rx.recv().await {
            slots[index] = Some(result);
        }
        for (index, handle) in handles {
            if let Err(e) = handle.await {
                error!(target: TARGET_BATCH, "Batch {}: worker for story {} died: {}", batch_id, story_ids[index], e);
                if slots[index].is_none() {
                    slots[index] = Some(Err(AnalysisError::Aborted(e.to_string())));
                }
            }
        }

        let outcomes = stories
            .iter()
            .zip(story_ids)
            .zip(slots)
            .map(|((story, story_id), slot)| StoryOutcome {
                story_id,
                story_title: story.title.clone(),
                result: slot.unwrap_or_else(|| {
                    Err(AnalysisError::Aborted(
                        "worker exited without reporting".to_string(),
                    ))
                }),
            })
            .collect();

        let reports = aggregate(outcomes);
        info!(
            target: TARGET_BATCH,
            "Batch {} finished: {}/{} stories analyzed",
            batch_id,
            reports.processing_status.completed_analyses,
            reports.processing_status.total_stories
        );
        reports
    }
}

/// One story, retried on transport errors only. Each attempt is bounded by
/// the per-story timeout; a timeout counts as a transport error.
async fn analyze_with_retry(
    analyzer: &IntelligenceAnalyzer,
    story: &Story,
    story_id: &str,
    dataset: &ArticleDataset,
    config: &OrchestratorConfig,
    mut cancel: watch::Receiver<bool>,
) -> StoryResult {
    let articles = dataset.resolve(&story.article_ids);
    let mut attempt = 0;

    loop {
        debug!(target: TARGET_BATCH, "Story {}: attempt {}", story_id, attempt + 1);
        let result = tokio::select! {
            biased;
            _ = wait_for_cancel(&mut cancel) => {
                warn!(target: TARGET_BATCH, "Story {}: cancelled during analysis", story_id);
                return Err(AnalysisError::Cancelled);
            }
            outcome = timeout(config.per_story_timeout, analyzer.analyze_as(story, &articles, story_id)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => Err(AnalysisError::Transport(format!(
                        "analysis timed out after {} ms",
                        config.per_story_timeout.as_millis()
                    ))),
                }
            }
        };

        match result {
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = backoff_delay(attempt, config.initial_backoff, config.max_backoff);
                warn!(
                    target: TARGET_BATCH,
                    "Story {}: {} (attempt {} of {}), retrying in {} ms",
                    story_id,
                    e,
                    attempt + 1,
                    config.max_retries + 1,
                    delay.as_millis()
                );
                attempt += 1;
                tokio::select! {
                    biased;
                    _ = wait_for_cancel(&mut cancel) => return Err(AnalysisError::Cancelled),
                    _ = sleep(delay) => {}
                }
            }
            other => return other,
        }
    }
}
