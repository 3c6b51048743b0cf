//! The JSON shape the synthesis model is asked to return.
//!
//! These types exist to describe the response contract: their JSON schema is
//! embedded in the prompt, and tests serialize them to produce well-formed
//! responses. Parsing does not go through them, because a response that is
//! only partly valid still has to be salvaged field by field.

use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    /// Three to six sentences synthesizing the story across all articles.
    pub executive_summary: String,
    /// One of DEVELOPING, ESCALATING, DE_ESCALATING, CONCLUDING, STATIC.
    pub story_status: String,
    pub timeline: Vec<TimelineEventPayload>,
    pub significance: SignificancePayload,
    pub entities: Vec<EntityPayload>,
    pub sources: Vec<SourcePayload>,
    /// Facts corroborated by the articles.
    pub factual_basis: Vec<String>,
    /// Questions the articles leave open.
    pub information_gaps: Vec<String>,
    /// Individual claims attributed to a source, grouped by the issue they address.
    pub claims: Vec<ClaimPayload>,
    /// Conflicts you already see between sources. Optional; claims are also checked.
    #[serde(default)]
    pub contradictions: Vec<ContradictionPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEventPayload {
    /// ISO-8601 date or timestamp.
    pub date: String,
    pub description: String,
    /// One of HIGH, MEDIUM, LOW.
    pub importance: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignificancePayload {
    /// One of CRITICAL, HIGH, MODERATE, LOW.
    pub level: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityPayload {
    pub name: String,
    /// PERSON, ORGANIZATION, LOCATION, EVENT, PRODUCT or OTHER.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// The part this entity plays in the story.
    pub role: String,
    /// Positions or stances the entity has taken. At least one.
    pub positions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourcePayload {
    pub source_name: String,
    /// IDs of the articles from this source, as given in the article headers.
    pub article_ids: Vec<i64>,
    /// One of VERY_HIGH, HIGH, MODERATE, LOW, VERY_LOW.
    pub reliability_level: String,
    pub bias: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPayload {
    /// Short label for the question the claim answers, e.g. "death toll".
    pub issue: String,
    pub source: String,
    pub statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContradictionPayload {
    pub issue: String,
    pub conflicting_claims: Vec<ClaimPayload>,
}

static REPORT_SCHEMA: Lazy<String> = Lazy::new(|| {
    serde_json::to_string_pretty(&schemars::schema_for!(ReportPayload)).unwrap_or_default()
});

/// Pretty-printed JSON schema for [`ReportPayload`].
pub fn report_schema_json() -> &'static str {
    &REPORT_SCHEMA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_camel_case_fields() {
        let schema = report_schema_json();
        for field in ["executiveSummary", "storyStatus", "informationGaps", "reliabilityLevel"] {
            assert!(schema.contains(field), "schema is missing {}", field);
        }
    }
}
