use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::context::build_context;
use super::status::infer_story_status;
use crate::clustering::types::Story;
use crate::config::AnalyzerConfig;
use crate::dataset::Article;
use crate::error::AnalysisError;
use crate::llm::SynthesisEngine;
use crate::prompt;
use crate::report::contradictions::{detect_contradictions, merge_contradictions};
use crate::report::parser::{parse_report_response, ParsedResponse, ReportDraft};
use crate::report::schema::report_schema_json;
use crate::report::story_id::assign_story_ids;
use crate::report::types::{
    IntelligenceReport, ReportStatus, SignificanceAssessment, SignificanceLevel,
};
use crate::report::TARGET_REPORT;
use crate::validation::{validate_report, Violation};

/// Turns one story into one intelligence report. Holds no per-story state,
/// so a single analyzer serves every worker in a batch.
pub struct IntelligenceAnalyzer {
    engine: Arc<dyn SynthesisEngine>,
    config: AnalyzerConfig,
}

impl IntelligenceAnalyzer {
    pub fn new(engine: Arc<dyn SynthesisEngine>, config: AnalyzerConfig) -> Self {
        IntelligenceAnalyzer { engine, config }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Analyzes a story on its own; its ID is the plain slug of its title.
    /// `articles` may hold more than the story needs.
    pub async fn analyze(
        &self,
        story: &Story,
        articles: &[&Article],
    ) -> Result<IntelligenceReport, AnalysisError> {
        let story_id = assign_story_ids(&[story.title.as_str()])
            .pop()
            .unwrap_or_else(|| "story-0".to_string());
        self.analyze_as(story, articles, &story_id).await
    }

    /// Analyzes a story under an ID chosen by the caller, as the batch
    /// orchestrator does to keep IDs unique.
    pub async fn analyze_as(
        &self,
        story: &Story,
        articles: &[&Article],
        story_id: &str,
    ) -> Result<IntelligenceReport, AnalysisError> {
        if story.article_ids.is_empty() {
            return Err(AnalysisError::input("No articles in story"));
        }

        let pool: HashMap<i64, &Article> = articles.iter().map(|a| (a.id, *a)).collect();
        let resolved: Vec<&Article> = story
            .article_ids
            .iter()
            .filter_map(|id| pool.get(id).copied())
            .collect();
        if resolved.is_empty() {
            return Err(AnalysisError::input("No matching articles found"));
        }
        if resolved.len() < story.article_ids.len() {
            debug!(
                target: TARGET_REPORT,
                "Story {}: {} of {} articles found",
                story_id,
                resolved.len(),
                story.article_ids.len()
            );
        }

        let context = build_context(&resolved, &self.config);
        info!(
            target: TARGET_REPORT,
            "Analyzing story {} with {} articles ({} duplicates removed, truncated: {}) via {}",
            story_id,
            context.article_ids.len(),
            context.duplicates_removed,
            context.truncated,
            self.engine.name()
        );

        let reference_date = resolved.iter().map(|a| a.publish_date).max();
        let known_ids: HashSet<i64> = resolved.iter().map(|a| a.id).collect();
        let report_prompt = prompt::intelligence_report_prompt(
            story,
            &context.text,
            reference_date,
            report_schema_json(),
        );

        let response = self.engine.invoke(&report_prompt).await?;
        let first = parse_report_response(&response, &known_ids);
        if first.is_clean() {
            return self.finish(story, story_id, &resolved, &known_ids, first.draft, Vec::new());
        }

        warn!(
            target: TARGET_REPORT,
            "Story {}: response failed validation with {} violations, asking for a repair",
            story_id,
            first.violations.len()
        );
        let repair = prompt::repair_prompt(&report_prompt, &response, &first.violations);
        let repaired_response = self.engine.invoke(&repair).await?;
        let second = parse_report_response(&repaired_response, &known_ids);
        if second.is_clean() {
            info!(target: TARGET_REPORT, "Story {}: repair succeeded", story_id);
            return self.finish(story, story_id, &resolved, &known_ids, second.draft, Vec::new());
        }

        match best_effort(first, second) {
            Ok(salvaged) => {
                warn!(
                    target: TARGET_REPORT,
                    "Story {}: repair failed, emitting an INCOMPLETE report with {} issues",
                    story_id,
                    salvaged.violations.len()
                );
                self.finish(
                    story,
                    story_id,
                    &resolved,
                    &known_ids,
                    salvaged.draft,
                    salvaged.violations,
                )
            }
            Err(violations) => {
                error!(
                    target: TARGET_REPORT,
                    "Story {}: no executive summary after repair", story_id
                );
                Err(AnalysisError::Validation {
                    message: format!("synthesis response for story {} failed validation", story_id),
                    violations,
                })
            }
        }
    }

    fn finish(
        &self,
        story: &Story,
        story_id: &str,
        resolved: &[&Article],
        known_ids: &HashSet<i64>,
        draft: ReportDraft,
        issues: Vec<Violation>,
    ) -> Result<IntelligenceReport, AnalysisError> {
        let ReportDraft {
            executive_summary,
            story_status,
            timeline,
            significance,
            entities,
            sources,
            factual_basis,
            information_gaps,
            claims,
            contradictions,
        } = draft;

        let story_status = story_status.unwrap_or_else(|| infer_story_status(&timeline));
        let significance = significance.unwrap_or_else(|| SignificanceAssessment {
            level: SignificanceLevel::from_importance(story.importance),
            reasoning: format!(
                "Derived from the cluster importance score of {}/10.",
                story.importance
            ),
        });
        let contradictions = merge_contradictions(detect_contradictions(&claims), contradictions);

        let report = IntelligenceReport {
            story_id: story_id.to_string(),
            title: story.title.clone(),
            article_ids: resolved.iter().map(|a| a.id).collect(),
            status: if issues.is_empty() {
                ReportStatus::Complete
            } else {
                ReportStatus::Incomplete
            },
            executive_summary: executive_summary.unwrap_or_default(),
            story_status,
            timeline,
            significance,
            entities,
            sources,
            factual_basis,
            information_gaps,
            contradictions,
            validation_issues: issues,
        };

        let violations = validate_report(&report, known_ids);
        if !violations.is_empty() {
            error!(
                target: TARGET_REPORT,
                "Story {}: assembled report is invalid: {:?}", story_id, violations
            );
            return Err(AnalysisError::Validation {
                message: format!("assembled report for story {} is invalid", story_id),
                violations,
            });
        }
        Ok(report)
    }
}

/// Picks the attempt to salvage after a failed repair: the repair if it has a
/// summary, otherwise the first response if that one does.
fn best_effort(
    first: ParsedResponse,
    second: ParsedResponse,
) -> Result<ParsedResponse, Vec<Violation>> {
    if second.draft.executive_summary.is_some() {
        Ok(second)
    } else if first.draft.executive_summary.is_some() {
        Ok(first)
    } else {
        Err(second.violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::types::StoryType;
    use crate::dataset::fixtures::three_article_dataset;
    use crate::dataset::ArticleDataset;
    use crate::llm::stub::canned_report_json;
    use crate::llm::{EngineError, StubEngine, StubReply};
    use crate::report::types::StoryStatus;
    use serde_json::json;

    fn story(article_ids: Vec<i64>) -> Story {
        Story {
            cluster_id: 1,
            title: "Storm hits coast".to_string(),
            importance: 7,
            article_ids,
            story_type: StoryType::SingleStory,
        }
    }

    fn analyzer(engine: Arc<StubEngine>) -> IntelligenceAnalyzer {
        IntelligenceAnalyzer::new(engine, AnalyzerConfig::default())
    }

    fn articles(dataset: &ArticleDataset) -> Vec<&Article> {
        dataset.resolve(&[1, 2, 3])
    }

    fn full_response() -> String {
        json!({
            "executiveSummary": "A storm struck the coast and relief funds were approved.",
            "timeline": [
                {"date": "2025-03-01", "description": "Storm makes landfall", "importance": "HIGH"},
                {"date": "2025-03-03", "description": "Relief funds approved", "importance": "LOW"}
            ],
            "entities": [
                {"name": "Coastal Council", "type": "ORGANIZATION", "role": "local government", "positions": ["requested aid"]}
            ],
            "sources": [
                {"sourceName": "news.example.com", "articleIds": [1], "reliabilityLevel": "HIGH", "bias": "none detected"}
            ],
            "factualBasis": ["The storm made landfall on March 1."],
            "informationGaps": ["Total damage is unknown."],
            "claims": [
                {"issue": "damage estimate", "source": "news.example.com", "statement": "Damage is estimated at 40 million"},
                {"issue": "Damage estimates", "source": "daily.example.org", "statement": "Officials put damage at 65 million"}
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_empty_story_is_input_error() {
        let engine = Arc::new(StubEngine::canned());
        let dataset = three_article_dataset();
        let err = analyzer(engine.clone())
            .analyze(&story(vec![]), &articles(&dataset))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Input(ref m) if m == "No articles in story"));
        assert_eq!(engine.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_articles_are_input_error() {
        let engine = Arc::new(StubEngine::canned());
        let dataset = three_article_dataset();
        let err = analyzer(engine)
            .analyze(&story(vec![999, 1000]), &articles(&dataset))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No matching articles found");
    }

    #[tokio::test]
    async fn test_complete_report_fills_derived_fields() {
        let engine = Arc::new(StubEngine::cycling(vec![full_response()]));
        let dataset = three_article_dataset();
        let report = analyzer(engine.clone())
            .analyze(&story(vec![1, 2, 3, 42]), &articles(&dataset))
            .await
            .unwrap();

        assert_eq!(report.story_id, "storm-hits-coast");
        assert_eq!(report.status, ReportStatus::Complete);
        assert_eq!(report.article_ids, vec![1, 2, 3]);
        // No storyStatus in the response: inferred from a HIGH then LOW timeline.
        assert_eq!(report.story_status, StoryStatus::DeEscalating);
        assert_eq!(report.significance.level, SignificanceLevel::High);
        assert_eq!(report.contradictions.len(), 1);
        assert_eq!(report.contradictions[0].conflicting_claims.len(), 2);
        assert!(report.validation_issues.is_empty());
        assert_eq!(engine.call_count(), 1);
        assert!(engine.prompts()[0].contains("[Article 1]"));
    }

    #[tokio::test]
    async fn test_repair_attempt_fixes_response() {
        let engine = Arc::new(StubEngine::scripted(vec![
            StubReply::text(r#"{"storyStatus": "STATIC"}"#),
            StubReply::text(canned_report_json()),
        ]));
        let dataset = three_article_dataset();
        let report = analyzer(engine.clone())
            .analyze(&story(vec![1, 2]), &articles(&dataset))
            .await
            .unwrap();
        assert_eq!(report.status, ReportStatus::Complete);
        assert_eq!(engine.call_count(), 2);
        let repair = &engine.prompts()[1];
        assert!(repair.contains("executiveSummary: must be a non-empty string"));
    }

    #[tokio::test]
    async fn test_failed_repair_with_summary_is_incomplete() {
        let partial = json!({
            "executiveSummary": "A storm struck the coast.",
            "storyStatus": "ESCALATING",
            "timeline": [{"date": "soon", "description": "Landfall", "importance": "HIGH"}]
        })
        .to_string();
        let engine = Arc::new(StubEngine::cycling(vec![partial]));
        let dataset = three_article_dataset();
        let report = analyzer(engine.clone())
            .analyze(&story(vec![1]), &articles(&dataset))
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Incomplete);
        assert_eq!(report.story_status, StoryStatus::Escalating);
        assert!(report.timeline.is_empty());
        assert_eq!(report.validation_issues[0].path, "timeline[0].date");
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_repair_without_summary_is_validation_error() {
        let engine = Arc::new(StubEngine::cycling(vec!["not json at all".to_string()]));
        let dataset = three_article_dataset();
        let err = analyzer(engine.clone())
            .analyze(&story(vec![1]), &articles(&dataset))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Validation { .. }));
        assert!(!err.is_retryable());
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn test_engine_failure_is_transport_error() {
        let engine = Arc::new(StubEngine::scripted(vec![StubReply::error(
            EngineError::RateLimited("429".into()),
        )]));
        let dataset = three_article_dataset();
        let err = analyzer(engine)
            .analyze(&story(vec![1]), &articles(&dataset))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_same_input_gives_same_report() {
        let dataset = three_article_dataset();
        let engine = Arc::new(StubEngine::cycling(vec![full_response()]));
        let analyzer = analyzer(engine);
        let first = analyzer
            .analyze(&story(vec![3, 1, 2]), &articles(&dataset))
            .await
            .unwrap();
        let second = analyzer
            .analyze(&story(vec![3, 1, 2]), &articles(&dataset))
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
