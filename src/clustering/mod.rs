// Module declarations
pub mod classifier;
pub mod llm_classifier;
pub mod significance;
pub mod source;
pub mod types;
pub mod validator;

pub use classifier::{ClusterClassifier, ClusterVerdict, HeuristicClassifier};
pub use llm_classifier::LlmClassifier;
pub use significance::score_importance;
pub use source::{ClusterSource, InMemoryClusterSource};
pub use types::*;
pub use validator::ClusterValidator;

use std::sync::Arc;

use crate::config::{ClassifierKind, ValidatorConfig};
use crate::llm::SynthesisEngine;

pub const TARGET_VALIDATION: &str = "cluster_validation";

/// Builds the classifier selected in `config`. The engine is only used by
/// the model-backed classifier.
pub fn build_classifier(
    config: &ValidatorConfig,
    engine: Arc<dyn SynthesisEngine>,
) -> Arc<dyn ClusterClassifier> {
    let heuristic = HeuristicClassifier::from_config(config);
    match config.classifier {
        ClassifierKind::Heuristic => Arc::new(heuristic),
        ClassifierKind::Llm => Arc::new(LlmClassifier::new(engine, heuristic)),
    }
}
