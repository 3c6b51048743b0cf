//! Salvages a synthesis response into typed report parts.
//!
//! Each list element is parsed and validated on its own: a bad timeline event
//! is dropped and reported, the rest of the timeline survives. The collected
//! violations drive the repair prompt and, if the repair also fails, end up on
//! the INCOMPLETE report.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashSet;

use super::types::{
    Claim, Contradiction, Entity, EventImportance, IssueClaim, ReliabilityLevel,
    SignificanceAssessment, SignificanceLevel, SourceAnalysis, StoryStatus, TimelineEvent,
};
use crate::llm::extract_json_object;
use crate::validation::{
    validate_claim, validate_contradiction, validate_entity, validate_significance,
    validate_source_analysis, validate_timeline_event, Violation,
};

/// Everything recoverable from one response. Missing optional parts are
/// `None` so the analyzer can fill them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportDraft {
    pub executive_summary: Option<String>,
    pub story_status: Option<StoryStatus>,
    pub timeline: Vec<TimelineEvent>,
    pub significance: Option<SignificanceAssessment>,
    pub entities: Vec<Entity>,
    pub sources: Vec<SourceAnalysis>,
    pub factual_basis: Vec<String>,
    pub information_gaps: Vec<String>,
    pub claims: Vec<IssueClaim>,
    pub contradictions: Vec<Contradiction>,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    pub draft: ReportDraft,
    pub violations: Vec<Violation>,
}

impl ParsedResponse {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    fn rejected(path: &str, message: impl Into<String>) -> Self {
        ParsedResponse {
            draft: ReportDraft::default(),
            violations: vec![Violation::new(path, message)],
        }
    }
}

/// Accepts RFC 3339 timestamps, naive timestamps (taken as UTC) and plain dates
/// (midnight UTC).
pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn str_field(obj: &Value, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn array_field<'a>(json: &'a Value, key: &str, violations: &mut Vec<Violation>) -> &'a [Value] {
    match json.get(key) {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items.as_slice(),
        Some(_) => {
            violations.push(Violation::new(key, "must be an array"));
            &[]
        }
    }
}

fn require_object(item: &Value, path: &str) -> Result<(), Vec<Violation>> {
    if item.is_object() {
        Ok(())
    } else {
        Err(vec![Violation::new(path, "must be an object")])
    }
}

fn into_result<T>(value: T, violations: Vec<Violation>) -> Result<T, Vec<Violation>> {
    if violations.is_empty() {
        Ok(value)
    } else {
        Err(violations)
    }
}

fn parse_timeline_event(item: &Value, path: &str) -> Result<TimelineEvent, Vec<Violation>> {
    require_object(item, path)?;
    let mut violations = Vec::new();

    let date_raw = str_field(item, "date");
    let date = parse_event_date(&date_raw);
    if date.is_none() {
        violations.push(Violation::new(
            format!("{}.date", path),
            format!("\"{}\" is not an ISO-8601 date", date_raw),
        ));
    }
    let importance_raw = str_field(item, "importance");
    let importance = EventImportance::parse(&importance_raw);
    if importance.is_none() {
        violations.push(Violation::new(
            format!("{}.importance", path),
            format!("unknown label \"{}\"", importance_raw),
        ));
    }

    match (date, importance) {
        (Some(date), Some(importance)) => {
            let event = TimelineEvent {
                date,
                description: str_field(item, "description"),
                importance,
            };
            violations.extend(validate_timeline_event(&event, path));
            into_result(event, violations)
        }
        _ => Err(violations),
    }
}

fn parse_significance(item: &Value) -> Result<SignificanceAssessment, Vec<Violation>> {
    let path = "significance";
    require_object(item, path)?;
    let level_raw = str_field(item, "level");
    let Some(level) = SignificanceLevel::parse(&level_raw) else {
        return Err(vec![Violation::new(
            "significance.level",
            format!("unknown label \"{}\"", level_raw),
        )]);
    };
    let significance = SignificanceAssessment {
        level,
        reasoning: str_field(item, "reasoning"),
    };
    let violations = validate_significance(&significance, path);
    into_result(significance, violations)
}

fn parse_entity(item: &Value, path: &str) -> Result<Entity, Vec<Violation>> {
    require_object(item, path)?;
    let positions = match item.get("positions") {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(single)) if !single.trim().is_empty() => vec![single.trim().to_string()],
        _ => Vec::new(),
    };
    let entity = Entity {
        name: str_field(item, "name"),
        entity_type: str_field(item, "type"),
        role: str_field(item, "role"),
        positions,
    };
    let violations = validate_entity(&entity, path);
    into_result(entity, violations)
}

fn parse_article_id(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn parse_source(
    item: &Value,
    known_article_ids: &HashSet<i64>,
    path: &str,
) -> Result<SourceAnalysis, Vec<Violation>> {
    require_object(item, path)?;
    let mut violations = Vec::new();

    let mut article_ids = Vec::new();
    if let Some(Value::Array(values)) = item.get("articleIds") {
        for value in values {
            match parse_article_id(value) {
                Some(id) if !article_ids.contains(&id) => article_ids.push(id),
                Some(_) => {}
                None => violations.push(Violation::new(
                    format!("{}.articleIds", path),
                    format!("{} is not an article ID", value),
                )),
            }
        }
    }

    let reliability_raw = str_field(item, "reliabilityLevel");
    let Some(reliability_level) = ReliabilityLevel::parse(&reliability_raw) else {
        violations.push(Violation::new(
            format!("{}.reliabilityLevel", path),
            format!("unknown label \"{}\"", reliability_raw),
        ));
        return Err(violations);
    };

    let source = SourceAnalysis {
        source_name: str_field(item, "sourceName"),
        article_ids,
        reliability_level,
        bias: str_field(item, "bias"),
    };
    violations.extend(validate_source_analysis(&source, known_article_ids, path));
    into_result(source, violations)
}

fn parse_claim(item: &Value, path: &str) -> Result<Claim, Vec<Violation>> {
    require_object(item, path)?;
    let entity = Some(str_field(item, "entity")).filter(|e| !e.is_empty());
    let claim = Claim {
        source: str_field(item, "source"),
        statement: str_field(item, "statement"),
        entity,
    };
    let violations = validate_claim(&claim, path);
    into_result(claim, violations)
}

fn parse_issue_claim(item: &Value, path: &str) -> Result<IssueClaim, Vec<Violation>> {
    let claim = parse_claim(item, path);
    let issue = str_field(item, "issue");
    match claim {
        Ok(claim) if !issue.is_empty() => Ok(IssueClaim { issue, claim }),
        Ok(_) => Err(vec![Violation::new(
            format!("{}.issue", path),
            "must not be empty",
        )]),
        Err(mut violations) => {
            if issue.is_empty() {
                violations.push(Violation::new(format!("{}.issue", path), "must not be empty"));
            }
            Err(violations)
        }
    }
}

fn parse_contradiction(item: &Value, path: &str) -> Result<Contradiction, Vec<Violation>> {
    require_object(item, path)?;
    let mut violations = Vec::new();
    let mut conflicting_claims = Vec::new();
    if let Some(Value::Array(claims)) = item.get("conflictingClaims") {
        for (i, claim) in claims.iter().enumerate() {
            match parse_claim(claim, &format!("{}.conflictingClaims[{}]", path, i)) {
                Ok(claim) => conflicting_claims.push(claim),
                Err(v) => violations.extend(v),
            }
        }
    }
    let contradiction = Contradiction {
        issue: str_field(item, "issue"),
        conflicting_claims,
    };
    violations.extend(validate_contradiction(&contradiction, path));
    into_result(contradiction, violations)
}

fn parse_text_list(
    json: &Value,
    key: &str,
    violations: &mut Vec<Violation>,
) -> Vec<String> {
    let mut items = Vec::new();
    for (i, value) in array_field(json, key, violations).iter().enumerate() {
        match value.as_str().map(str::trim) {
            Some(text) if !text.is_empty() => items.push(text.to_string()),
            _ => violations.push(Violation::new(
                format!("{}[{}]", key, i),
                "must be a non-empty string",
            )),
        }
    }
    items
}

/// Parses one raw response. `known_article_ids` are the story's articles;
/// sources citing anything else are dropped.
pub fn parse_report_response(raw: &str, known_article_ids: &HashSet<i64>) -> ParsedResponse {
    let Some(json_str) = extract_json_object(raw) else {
        return ParsedResponse::rejected("$", "response contains no JSON object");
    };
    let json: Value = match serde_json::from_str(&json_str) {
        Ok(json) => json,
        Err(e) => return ParsedResponse::rejected("$", format!("invalid JSON: {}", e)),
    };
    if !json.is_object() {
        return ParsedResponse::rejected("$", "expected a JSON object");
    }

    let mut violations = Vec::new();
    let mut draft = ReportDraft::default();

    match json.get("executiveSummary").and_then(Value::as_str).map(str::trim) {
        Some(summary) if !summary.is_empty() => draft.executive_summary = Some(summary.to_string()),
        _ => violations.push(Violation::new(
            "executiveSummary",
            "must be a non-empty string",
        )),
    }

    // A missing or unknown status is inferred later from the timeline.
    draft.story_status = json
        .get("storyStatus")
        .and_then(Value::as_str)
        .and_then(StoryStatus::parse);

    for (i, item) in array_field(&json, "timeline", &mut violations).iter().enumerate() {
        match parse_timeline_event(item, &format!("timeline[{}]", i)) {
            Ok(event) => draft.timeline.push(event),
            Err(v) => violations.extend(v),
        }
    }
    draft.timeline.sort_by_key(|event| event.date);

    match json.get("significance") {
        None | Some(Value::Null) => {}
        Some(item) => match parse_significance(item) {
            Ok(significance) => draft.significance = Some(significance),
            Err(v) => violations.extend(v),
        },
    }

    for (i, item) in array_field(&json, "entities", &mut violations).iter().enumerate() {
        match parse_entity(item, &format!("entities[{}]", i)) {
            Ok(entity) => draft.entities.push(entity),
            Err(v) => violations.extend(v),
        }
    }

    for (i, item) in array_field(&json, "sources", &mut violations).iter().enumerate() {
        match parse_source(item, known_article_ids, &format!("sources[{}]", i)) {
            Ok(source) => draft.sources.push(source),
            Err(v) => violations.extend(v),
        }
    }

    draft.factual_basis = parse_text_list(&json, "factualBasis", &mut violations);
    draft.information_gaps = parse_text_list(&json, "informationGaps", &mut violations);

    for (i, item) in array_field(&json, "claims", &mut violations).iter().enumerate() {
        match parse_issue_claim(item, &format!("claims[{}]", i)) {
            Ok(claim) => draft.claims.push(claim),
            Err(v) => violations.extend(v),
        }
    }

    for (i, item) in array_field(&json, "contradictions", &mut violations)
        .iter()
        .enumerate()
    {
        match parse_contradiction(item, &format!("contradictions[{}]", i)) {
            Ok(contradiction) => draft.contradictions.push(contradiction),
            Err(v) => violations.extend(v),
        }
    }

    ParsedResponse { draft, violations }
}
