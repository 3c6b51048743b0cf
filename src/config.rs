use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How clusters are judged for coherence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    Heuristic,
    Llm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Clusters with fewer known articles than this are rejected outright.
    pub min_articles: usize,
    pub classifier: ClassifierKind,
    /// Mean pairwise embedding similarity below which a cluster has no story.
    pub coherence_floor: f32,
    /// Mean pairwise embedding similarity at which a cluster is one story
    /// rather than a collection.
    pub single_story_threshold: f32,
    /// Concurrent classifications when the classifier calls a model.
    pub classification_concurrency: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_articles: 2,
            classifier: ClassifierKind::Heuristic,
            coherence_floor: 0.35,
            single_story_threshold: 0.70,
            classification_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub max_concurrency: usize,
    pub per_story_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            per_story_timeout: Duration::from_secs(180),
            max_retries: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Upper bound on the whole synthesis context, in characters.
    pub context_char_budget: usize,
    /// Upper bound on the body of any one article, in characters.
    pub max_article_chars: usize,
    pub max_context_articles: usize,
    /// Similarity of leading text at which two articles count as the same piece.
    pub near_duplicate_threshold: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            context_char_budget: 16_000,
            max_article_chars: 2_000,
            max_context_articles: 12,
            near_duplicate_threshold: 0.92,
        }
    }
}

/// Which synthesis backend to build. Chosen explicitly by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineConfig {
    /// Offline engine. An empty list answers every prompt with a canned report.
    Stub { responses: Vec<String> },
    Ollama {
        host: String,
        port: u16,
        model: String,
        temperature: f32,
    },
    OpenAI {
        api_key: String,
        model: String,
        temperature: f32,
    },
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::Stub {
            responses: Vec::new(),
        }
    }
}

/// All tunables for one pipeline, passed in at construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub validator: ValidatorConfig,
    pub orchestrator: OrchestratorConfig,
    pub analyzer: AnalyzerConfig,
    pub engine: EngineConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_kind_names_match_serde() {
        assert_eq!(
            ClassifierKind::from_str("heuristic", true),
            Ok(ClassifierKind::Heuristic)
        );
        assert_eq!(ClassifierKind::from_str("LLM", true), Ok(ClassifierKind::Llm));
        let json = serde_json::to_string(&ClassifierKind::Llm).unwrap();
        assert_eq!(json, "\"llm\"");
    }
}
