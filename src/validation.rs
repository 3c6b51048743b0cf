//! Structural checks for the data model.
//!
//! Each `validate_*` function is pure: it inspects one value and returns every
//! problem it finds as a [`Violation`] tagged with a JSON-style path. Callers
//! compose them, so the response parser can report all problems with a
//! synthesis response in one pass and feed them back into the repair prompt.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::clustering::types::Story;
use crate::report::types::{
    Claim, Contradiction, Entity, IntelligenceReport, ReportStatus, SignificanceAssessment,
    SourceAnalysis, TimelineEvent,
};

pub const MIN_IMPORTANCE: u8 = 1;
pub const MAX_IMPORTANCE: u8 = 10;

/// A single structural problem found in a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Violation {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn require_text(value: &str, path: &str, violations: &mut Vec<Violation>) {
    if value.trim().is_empty() {
        violations.push(Violation::new(path, "must not be empty"));
    }
}

pub fn validate_importance(importance: i64, path: &str) -> Vec<Violation> {
    if importance < MIN_IMPORTANCE as i64 || importance > MAX_IMPORTANCE as i64 {
        vec![Violation::new(
            path,
            format!(
                "importance {} is outside {}..={}",
                importance, MIN_IMPORTANCE, MAX_IMPORTANCE
            ),
        )]
    } else {
        Vec::new()
    }
}

pub fn validate_story(story: &Story) -> Vec<Violation> {
    let mut violations = Vec::new();
    require_text(&story.title, "title", &mut violations);
    violations.extend(validate_importance(story.importance as i64, "importance"));

    if story.article_ids.is_empty() {
        violations.push(Violation::new("articleIds", "must not be empty"));
    }
    let mut seen = HashSet::new();
    for id in &story.article_ids {
        if !seen.insert(id) {
            violations.push(Violation::new(
                "articleIds",
                format!("article {} listed more than once", id),
            ));
        }
    }
    violations
}

pub fn validate_timeline_event(event: &TimelineEvent, path: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    require_text(
        &event.description,
        &format!("{}.description", path),
        &mut violations,
    );
    violations
}

pub fn validate_significance(significance: &SignificanceAssessment, path: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    require_text(
        &significance.reasoning,
        &format!("{}.reasoning", path),
        &mut violations,
    );
    violations
}

pub fn validate_entity(entity: &Entity, path: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    require_text(&entity.name, &format!("{}.name", path), &mut violations);
    require_text(&entity.entity_type, &format!("{}.type", path), &mut violations);
    require_text(&entity.role, &format!("{}.role", path), &mut violations);
    if entity.positions.iter().all(|p| p.trim().is_empty()) {
        violations.push(Violation::new(
            format!("{}.positions", path),
            "must contain at least one position",
        ));
    }
    violations
}

pub fn validate_claim(claim: &Claim, path: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    require_text(&claim.source, &format!("{}.source", path), &mut violations);
    require_text(&claim.statement, &format!("{}.statement", path), &mut violations);
    if let Some(entity) = &claim.entity {
        require_text(entity, &format!("{}.entity", path), &mut violations);
    }
    violations
}

pub fn validate_contradiction(contradiction: &Contradiction, path: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    require_text(&contradiction.issue, &format!("{}.issue", path), &mut violations);

    for (i, claim) in contradiction.conflicting_claims.iter().enumerate() {
        violations.extend(validate_claim(
            claim,
            &format!("{}.conflictingClaims[{}]", path, i),
        ));
    }

    let sources: HashSet<String> = contradiction
        .conflicting_claims
        .iter()
        .map(|c| c.source.trim().to_lowercase())
        .collect();
    if contradiction.conflicting_claims.len() < 2 || sources.len() < 2 {
        violations.push(Violation::new(
            format!("{}.conflictingClaims", path),
            "needs at least two claims from distinct sources",
        ));
    }
    violations
}

/// `known_article_ids` is the set of articles the story was built from; a
/// source may only cite those.
pub fn validate_source_analysis(
    source: &SourceAnalysis,
    known_article_ids: &HashSet<i64>,
    path: &str,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    require_text(
        &source.source_name,
        &format!("{}.sourceName", path),
        &mut violations,
    );
    for id in &source.article_ids {
        if !known_article_ids.contains(id) {
            violations.push(Violation::new(
                format!("{}.articleIds", path),
                format!("article {} is not part of this story", id),
            ));
        }
    }
    violations
}

/// Full check of an assembled report. A COMPLETE report must come back clean.
pub fn validate_report(
    report: &IntelligenceReport,
    known_article_ids: &HashSet<i64>,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    require_text(&report.story_id, "storyId", &mut violations);
    require_text(
        &report.executive_summary,
        "executiveSummary",
        &mut violations,
    );

    for (i, event) in report.timeline.iter().enumerate() {
        violations.extend(validate_timeline_event(event, &format!("timeline[{}]", i)));
    }
    violations.extend(validate_significance(&report.significance, "significance"));
    for (i, entity) in report.entities.iter().enumerate() {
        violations.extend(validate_entity(entity, &format!("entities[{}]", i)));
    }
    for (i, source) in report.sources.iter().enumerate() {
        violations.extend(validate_source_analysis(
            source,
            known_article_ids,
            &format!("sources[{}]", i),
        ));
    }
    for (i, item) in report.factual_basis.iter().enumerate() {
        require_text(item, &format!("factualBasis[{}]", i), &mut violations);
    }
    for (i, item) in report.information_gaps.iter().enumerate() {
        require_text(item, &format!("informationGaps[{}]", i), &mut violations);
    }
    for (i, contradiction) in report.contradictions.iter().enumerate() {
        violations.extend(validate_contradiction(
            contradiction,
            &format!("contradictions[{}]", i),
        ));
    }

    if report.status == ReportStatus::Complete && !report.validation_issues.is_empty() {
        violations.push(Violation::new(
            "validationIssues",
            "a complete report cannot carry validation issues",
        ));
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::types::StoryType;

    fn claim(source: &str, statement: &str) -> Claim {
        Claim {
            source: source.to_string(),
            statement: statement.to_string(),
            entity: None,
        }
    }

    #[test]
    fn test_importance_bounds() {
        assert!(validate_importance(1, "importance").is_empty());
        assert!(validate_importance(10, "importance").is_empty());
        assert_eq!(validate_importance(0, "importance").len(), 1);
        assert_eq!(validate_importance(11, "importance").len(), 1);
        assert_eq!(validate_importance(-3, "importance").len(), 1);
    }

    #[test]
    fn test_story_rejects_out_of_range_importance_and_duplicates() {
        let story = Story {
            cluster_id: 4,
            title: "Port strike".to_string(),
            importance: 11,
            article_ids: vec![1, 1],
            story_type: StoryType::SingleStory,
        };
        let violations = validate_story(&story);
        assert!(violations.iter().any(|v| v.path == "importance"));
        assert!(violations.iter().any(|v| v.path == "articleIds"));
    }

    #[test]
    fn test_contradiction_needs_distinct_sources() {
        let same_source = Contradiction {
            issue: "casualty count".to_string(),
            conflicting_claims: vec![claim("Reuters", "12 dead"), claim("reuters", "15 dead")],
        };
        assert_eq!(validate_contradiction(&same_source, "c").len(), 1);

        let ok = Contradiction {
            issue: "casualty count".to_string(),
            conflicting_claims: vec![claim("Reuters", "12 dead"), claim("AP", "15 dead")],
        };
        assert!(validate_contradiction(&ok, "c").is_empty());
    }

    #[test]
    fn test_entity_positions_must_not_be_empty() {
        let entity = Entity {
            name: "Ministry of Transport".to_string(),
            entity_type: "ORGANIZATION".to_string(),
            role: "regulator".to_string(),
            positions: vec![" ".to_string()],
        };
        let violations = validate_entity(&entity, "entities[0]");
        assert_eq!(violations[0].path, "entities[0].positions");
    }

    #[test]
    fn test_source_may_only_cite_story_articles() {
        let source = SourceAnalysis {
            source_name: "example.com".to_string(),
            article_ids: vec![1, 7],
            reliability_level: crate::report::types::ReliabilityLevel::High,
            bias: "none detected".to_string(),
        };
        let known: HashSet<i64> = [1, 2].into_iter().collect();
        let violations = validate_source_analysis(&source, &known, "sources[0]");
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("article 7"));
    }
}
