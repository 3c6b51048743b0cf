use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::classifier::{ClusterClassifier, ClusterVerdict, HeuristicClassifier};
use super::types::{RawCluster, StoryType};
use super::TARGET_VALIDATION;
use crate::dataset::{Article, ArticleDataset};
use crate::llm::{extract_json_object, SynthesisEngine};
use crate::prompt;
use crate::validation::{MAX_IMPORTANCE, MIN_IMPORTANCE};

/// Asks the synthesis engine to judge each cluster. Any engine or parse
/// failure falls back to the heuristic verdict for that cluster.
pub struct LlmClassifier {
    engine: Arc<dyn SynthesisEngine>,
    fallback: HeuristicClassifier,
}

impl LlmClassifier {
    pub fn new(engine: Arc<dyn SynthesisEngine>, fallback: HeuristicClassifier) -> Self {
        LlmClassifier { engine, fallback }
    }
}

#[async_trait]
impl ClusterClassifier for LlmClassifier {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify(
        &self,
        cluster: &RawCluster,
        articles: &[&Article],
        dataset: &ArticleDataset,
    ) -> Result<ClusterVerdict> {
        let prompt = prompt::cluster_classification_prompt(articles);

        let parsed = match self.engine.invoke(&prompt).await {
            Ok(response) => parse_verdict(&response),
            Err(e) => Err(anyhow!(e)),
        };

        match parsed {
            Ok(verdict) => {
                debug!(
                    target: TARGET_VALIDATION,
                    "Cluster {} classified by {}: {:?}",
                    cluster.cluster_id,
                    self.engine.name(),
                    verdict
                );
                Ok(verdict)
            }
            Err(e) => {
                warn!(
                    target: TARGET_VALIDATION,
                    "Model classification of cluster {} failed, using heuristic: {}",
                    cluster.cluster_id,
                    e
                );
                Ok(self.fallback.verdict(articles, dataset))
            }
        }
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parses the classification JSON. `hasStory` is required; an unparseable
/// importance is dropped rather than failing the verdict.
pub fn parse_verdict(response: &str) -> Result<ClusterVerdict> {
    let json_str =
        extract_json_object(response).ok_or_else(|| anyhow!("No JSON object in response"))?;
    let json: Value =
        serde_json::from_str(&json_str).map_err(|e| anyhow!("Invalid JSON response: {}", e))?;

    let has_story = json
        .get("hasStory")
        .and_then(as_flag)
        .ok_or_else(|| anyhow!("Response is missing hasStory"))?;
    let reason = json
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    if !has_story {
        return Ok(ClusterVerdict::NoStories { reason });
    }

    let story_type = match json.get("storyType").and_then(Value::as_str) {
        Some(label) => StoryType::parse(label)
            .ok_or_else(|| anyhow!("Unknown storyType \"{}\"", label))?,
        None => StoryType::SingleStory,
    };
    let title = json
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let importance = json
        .get("importance")
        .and_then(|v| v.as_f64().or_else(|| v.as_str()?.trim().parse().ok()))
        .map(|v| v.round().clamp(MIN_IMPORTANCE as f64, MAX_IMPORTANCE as f64) as u8);

    Ok(ClusterVerdict::Story {
        title,
        story_type,
        importance,
    })
}
