use tracing::{info, warn};

use super::types::{IntelligenceReport, IntelligenceReports, ProcessingStatus, StoryFailure};
use super::TARGET_REPORT;
use crate::error::AnalysisError;

/// What became of one story in a batch.
#[derive(Debug, Clone)]
pub struct StoryOutcome {
    pub story_id: String,
    pub story_title: String,
    pub result: Result<IntelligenceReport, AnalysisError>,
}

/// Folds per-story outcomes, in the order given, into the batch result.
/// `completed + failed == total` holds by construction.
pub fn aggregate(outcomes: Vec<StoryOutcome>) -> IntelligenceReports {
    let total_stories = outcomes.len();
    let mut reports = Vec::new();
    let mut failures = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!(
                    target: TARGET_REPORT,
                    "Story {} ({}) failed: {}", outcome.story_id, outcome.story_title, e
                );
                failures.push(StoryFailure {
                    story_id: outcome.story_id,
                    story_title: outcome.story_title,
                    kind: e.kind().to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    let processing_status = ProcessingStatus {
        total_stories,
        completed_analyses: reports.len(),
        failed_analyses: failures.len(),
    };
    info!(
        target: TARGET_REPORT,
        "Aggregated {} stories: {} completed, {} failed",
        processing_status.total_stories,
        processing_status.completed_analyses,
        processing_status.failed_analyses
    );

    IntelligenceReports {
        reports,
        processing_status,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::types::{
        ReportStatus, SignificanceAssessment, SignificanceLevel, StoryStatus,
    };

    fn report(story_id: &str) -> IntelligenceReport {
        IntelligenceReport {
            story_id: story_id.to_string(),
            title: story_id.to_string(),
            article_ids: vec![1],
            status: ReportStatus::Complete,
            executive_summary: "Summary".to_string(),
            story_status: StoryStatus::Static,
            timeline: vec![],
            significance: SignificanceAssessment {
                level: SignificanceLevel::Low,
                reasoning: "Minor".to_string(),
            },
            entities: vec![],
            sources: vec![],
            factual_basis: vec![],
            information_gaps: vec![],
            contradictions: vec![],
            validation_issues: vec![],
        }
    }

    fn outcome(id: &str, result: Result<IntelligenceReport, AnalysisError>) -> StoryOutcome {
        StoryOutcome {
            story_id: id.to_string(),
            story_title: id.to_string(),
            result,
        }
    }

    #[test]
    fn test_counts_reconcile() {
        let reports = aggregate(vec![
            outcome("a", Ok(report("a"))),
            outcome("b", Err(AnalysisError::Transport("timed out".into()))),
            outcome("c", Ok(report("c"))),
            outcome("d", Err(AnalysisError::Cancelled)),
        ]);
        assert_eq!(reports.processing_status.total_stories, 4);
        assert_eq!(reports.processing_status.completed_analyses, 2);
        assert_eq!(reports.processing_status.failed_analyses, 2);
        assert!(reports.processing_status.is_reconciled());
        let ids: Vec<&str> = reports.reports.iter().map(|r| r.story_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(reports.failures[1].kind, "cancelled");
    }

    #[test]
    fn test_empty_batch() {
        let reports = aggregate(vec![]);
        assert_eq!(reports.processing_status, ProcessingStatus::default());
        assert!(reports.processing_status.is_reconciled());
    }
}
