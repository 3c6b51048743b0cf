use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::Violation;

/// Canonical form of an enum label coming back from a model:
/// `"De-escalating"`, `"de escalating"` and `"DE_ESCALATING"` all map to `DE_ESCALATING`.
pub fn label_key(label: &str) -> String {
    label
        .trim()
        .to_uppercase()
        .replace(['-', ' '], "_")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventImportance {
    Low,
    Medium,
    High,
}

impl EventImportance {
    pub fn parse(label: &str) -> Option<Self> {
        match label_key(label).as_str() {
            "HIGH" => Some(EventImportance::High),
            "MEDIUM" | "MODERATE" => Some(EventImportance::Medium),
            "LOW" => Some(EventImportance::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub date: DateTime<Utc>,
    pub description: String,
    pub importance: EventImportance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignificanceLevel {
    Critical,
    High,
    Moderate,
    Low,
}

impl SignificanceLevel {
    pub fn parse(label: &str) -> Option<Self> {
        match label_key(label).as_str() {
            "CRITICAL" => Some(SignificanceLevel::Critical),
            "HIGH" => Some(SignificanceLevel::High),
            "MODERATE" | "MEDIUM" => Some(SignificanceLevel::Moderate),
            "LOW" => Some(SignificanceLevel::Low),
            _ => None,
        }
    }

    /// Level implied by a story importance score when the synthesis step gave none.
    pub fn from_importance(importance: u8) -> Self {
        match importance {
            9..=u8::MAX => SignificanceLevel::Critical,
            7..=8 => SignificanceLevel::High,
            4..=6 => SignificanceLevel::Moderate,
            _ => SignificanceLevel::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignificanceAssessment {
    pub level: SignificanceLevel,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub role: String,
    pub positions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub source: String,
    pub statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

/// A claim tagged with the issue it speaks to, as extracted by the synthesis step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IssueClaim {
    pub issue: String,
    pub claim: Claim,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contradiction {
    pub issue: String,
    pub conflicting_claims: Vec<Claim>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReliabilityLevel {
    VeryHigh,
    High,
    Moderate,
    Low,
    VeryLow,
}

impl ReliabilityLevel {
    pub fn parse(label: &str) -> Option<Self> {
        match label_key(label).as_str() {
            "VERY_HIGH" => Some(ReliabilityLevel::VeryHigh),
            "HIGH" => Some(ReliabilityLevel::High),
            "MODERATE" | "MEDIUM" => Some(ReliabilityLevel::Moderate),
            "LOW" => Some(ReliabilityLevel::Low),
            "VERY_LOW" => Some(ReliabilityLevel::VeryLow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAnalysis {
    pub source_name: String,
    pub article_ids: Vec<i64>,
    pub reliability_level: ReliabilityLevel,
    pub bias: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Complete,
    Incomplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoryStatus {
    Developing,
    Escalating,
    DeEscalating,
    Concluding,
    Static,
}

impl StoryStatus {
    pub fn parse(label: &str) -> Option<Self> {
        match label_key(label).as_str() {
            "DEVELOPING" => Some(StoryStatus::Developing),
            "ESCALATING" => Some(StoryStatus::Escalating),
            "DE_ESCALATING" | "DEESCALATING" => Some(StoryStatus::DeEscalating),
            "CONCLUDING" | "CONCLUDED" => Some(StoryStatus::Concluding),
            "STATIC" => Some(StoryStatus::Static),
            _ => None,
        }
    }
}

/// Structured synthesis for one story. Built once by the analyzer and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceReport {
    pub story_id: String,
    pub title: String,
    pub article_ids: Vec<i64>,
    pub status: ReportStatus,
    pub executive_summary: String,
    pub story_status: StoryStatus,
    pub timeline: Vec<TimelineEvent>,
    pub significance: SignificanceAssessment,
    pub entities: Vec<Entity>,
    pub sources: Vec<SourceAnalysis>,
    pub factual_basis: Vec<String>,
    pub information_gaps: Vec<String>,
    pub contradictions: Vec<Contradiction>,
    /// Why the report is INCOMPLETE; always empty for COMPLETE reports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_issues: Vec<Violation>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatus {
    pub total_stories: usize,
    pub completed_analyses: usize,
    pub failed_analyses: usize,
}

impl ProcessingStatus {
    pub fn is_reconciled(&self) -> bool {
        self.completed_analyses + self.failed_analyses == self.total_stories
    }
}

/// Why one story in a batch produced no report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryFailure {
    pub story_id: String,
    pub story_title: String,
    pub kind: String,
    pub error: String,
}

/// Result of analyzing a batch of stories.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelligenceReports {
    pub reports: Vec<IntelligenceReport>,
    pub processing_status: ProcessingStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<StoryFailure>,
}
