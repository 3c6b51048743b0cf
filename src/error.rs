use thiserror::Error;

use crate::llm::EngineError;
use crate::validation::Violation;

/// Everything that can go wrong while turning one story into a report.
///
/// Only [`AnalysisError::Transport`] is worth retrying; the other variants
/// describe input or output that will not get better on a second attempt.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// Malformed or referentially inconsistent input.
    #[error("{0}")]
    Input(String),

    /// The synthesis engine was unreachable, rate limited or timed out.
    #[error("transport error: {0}")]
    Transport(String),

    /// The synthesis response failed structural validation after the repair attempt.
    #[error("validation error: {message} ({} violations)", violations.len())]
    Validation {
        message: String,
        violations: Vec<Violation>,
    },

    /// The batch was cancelled before or while this story was analyzed.
    #[error("analysis cancelled")]
    Cancelled,

    /// The worker running this story died without reporting a result.
    #[error("worker aborted: {0}")]
    Aborted(String),
}

impl AnalysisError {
    pub fn input(message: impl Into<String>) -> Self {
        AnalysisError::Input(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::Transport(_))
    }

    /// Short label used in logs and in the failure list of a batch.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Input(_) => "input",
            AnalysisError::Transport(_) => "transport",
            AnalysisError::Validation { .. } => "validation",
            AnalysisError::Cancelled => "cancelled",
            AnalysisError::Aborted(_) => "aborted",
        }
    }
}

impl From<EngineError> for AnalysisError {
    fn from(err: EngineError) -> Self {
        AnalysisError::Transport(err.to_string())
    }
}

impl From<crate::dataset::DatasetError> for AnalysisError {
    fn from(err: crate::dataset::DatasetError) -> Self {
        AnalysisError::Input(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(AnalysisError::Transport("timeout".into()).is_retryable());
        assert!(!AnalysisError::input("No articles in story").is_retryable());
        assert!(!AnalysisError::Cancelled.is_retryable());
        assert!(!AnalysisError::Validation {
            message: "bad".into(),
            violations: vec![],
        }
        .is_retryable());
    }

    #[test]
    fn test_input_error_displays_bare_message() {
        let err = AnalysisError::input("No matching articles found");
        assert_eq!(err.to_string(), "No matching articles found");
    }

    #[test]
    fn test_engine_errors_become_transport() {
        let err: AnalysisError = EngineError::EmptyResponse.into();
        assert_eq!(err.kind(), "transport");
    }
}
