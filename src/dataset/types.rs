use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every embedding handed to the pipeline comes from the same 384-dimension model.
pub const EMBEDDING_DIMENSIONS: usize = 384;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DatasetError {
    #[error("embedding for article {article_id} has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        article_id: i64,
        expected: usize,
        actual: usize,
    },
    #[error("article {0} appears more than once in the dataset")]
    DuplicateArticle(i64),
    #[error("article {0} has more than one embedding")]
    DuplicateEmbedding(i64),
    #[error("embedding references unknown article {0}")]
    OrphanEmbedding(i64),
}

/// A news article as loaded from the article store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: String,
    pub url: String,
    pub publish_date: DateTime<Utc>,
}

impl Article {
    /// Host part of the article URL, used as the source name.
    pub fn source_host(&self) -> String {
        crate::util::source_host(&self.url)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEmbedding {
    article_id: i64,
    vector: Vec<f32>,
}

/// Embedding of one article. The length is checked on construction so a
/// vector of the wrong size can never exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawEmbedding")]
pub struct EmbeddingVector {
    article_id: i64,
    vector: Vec<f32>,
}

impl EmbeddingVector {
    pub fn new(article_id: i64, vector: Vec<f32>) -> Result<Self, DatasetError> {
        if vector.len() != EMBEDDING_DIMENSIONS {
            return Err(DatasetError::DimensionMismatch {
                article_id,
                expected: EMBEDDING_DIMENSIONS,
                actual: vector.len(),
            });
        }
        Ok(EmbeddingVector { article_id, vector })
    }

    pub fn article_id(&self) -> i64 {
        self.article_id
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.vector
    }
}

impl TryFrom<RawEmbedding> for EmbeddingVector {
    type Error = DatasetError;

    fn try_from(raw: RawEmbedding) -> Result<Self, Self::Error> {
        EmbeddingVector::new(raw.article_id, raw.vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_length_is_enforced() {
        assert!(EmbeddingVector::new(1, vec![0.0; EMBEDDING_DIMENSIONS]).is_ok());
        let err = EmbeddingVector::new(1, vec![0.0; 383]).unwrap_err();
        assert_eq!(
            err,
            DatasetError::DimensionMismatch {
                article_id: 1,
                expected: 384,
                actual: 383
            }
        );
    }

    #[test]
    fn test_embedding_length_is_enforced_when_deserializing() {
        let short = serde_json::json!({ "articleId": 3, "vector": [0.1, 0.2] });
        assert!(serde_json::from_value::<EmbeddingVector>(short).is_err());

        let full = serde_json::json!({ "articleId": 3, "vector": vec![0.5f32; 384] });
        let embedding: EmbeddingVector = serde_json::from_value(full).unwrap();
        assert_eq!(embedding.as_slice().len(), EMBEDDING_DIMENSIONS);
        assert_eq!(embedding.article_id(), 3);
    }
}
