pub mod store;
pub mod types;

pub use store::{ArticleBatch, ArticleStore, BatchFile, InMemoryArticleStore};
pub use types::{Article, DatasetError, EmbeddingVector, EMBEDDING_DIMENSIONS};

use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub const TARGET_DATASET: &str = "dataset";

/// Read-only view over a set of articles and their embeddings.
///
/// Built once per batch and shared between workers behind an `Arc`; nothing
/// mutates it after construction, so no locking is needed.
#[derive(Debug, Default)]
pub struct ArticleDataset {
    articles: HashMap<i64, Article>,
    embeddings: HashMap<i64, EmbeddingVector>,
}

impl ArticleDataset {
    /// Articles without an embedding are allowed; an embedding without an
    /// article, or a second article/embedding for the same ID, is not.
    pub fn new(
        articles: Vec<Article>,
        embeddings: Vec<EmbeddingVector>,
    ) -> Result<Self, DatasetError> {
        let mut by_id = HashMap::with_capacity(articles.len());
        for article in articles {
            let id = article.id;
            if by_id.insert(id, article).is_some() {
                return Err(DatasetError::DuplicateArticle(id));
            }
        }

        let mut vectors = HashMap::with_capacity(embeddings.len());
        for embedding in embeddings {
            let id = embedding.article_id();
            if !by_id.contains_key(&id) {
                return Err(DatasetError::OrphanEmbedding(id));
            }
            if vectors.insert(id, embedding).is_some() {
                return Err(DatasetError::DuplicateEmbedding(id));
            }
        }

        Ok(ArticleDataset {
            articles: by_id,
            embeddings: vectors,
        })
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Article> {
        self.articles.get(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.articles.contains_key(&id)
    }

    pub fn embedding(&self, id: i64) -> Option<&EmbeddingVector> {
        self.embeddings.get(&id)
    }

    pub fn articles(&self) -> impl Iterator<Item = &Article> {
        self.articles.values()
    }

    /// Looks up `ids` in order, skipping any the dataset does not know.
    pub fn resolve(&self, ids: &[i64]) -> Vec<&Article> {
        ids.iter().filter_map(|id| self.articles.get(id)).collect()
    }

    /// IDs from `ids` that have no article in the dataset.
    pub fn missing(&self, ids: &[i64]) -> Vec<i64> {
        ids.iter()
            .copied()
            .filter(|id| !self.articles.contains_key(id))
            .collect()
    }

    /// Publish date of the newest article. Recency is measured against this
    /// rather than the wall clock so scoring is reproducible.
    pub fn newest_publish_date(&self) -> Option<DateTime<Utc>> {
        self.articles.values().map(|a| a.publish_date).max()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_rejects_duplicate_articles() {
        let err = ArticleDataset::new(
            vec![
                article(1, "a", "https://a.example.com", 1),
                article(1, "b", "https://b.example.com", 1),
            ],
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, DatasetError::DuplicateArticle(1));
    }

    #[test]
    fn test_rejects_orphan_and_duplicate_embeddings() {
        let articles = vec![article(1, "a", "https://a.example.com", 1)];
        let err = ArticleDataset::new(articles.clone(), vec![embedding(9, 0, 0.0)]).unwrap_err();
        assert_eq!(err, DatasetError::OrphanEmbedding(9));

        let err = ArticleDataset::new(articles, vec![embedding(1, 0, 0.0), embedding(1, 1, 0.0)])
            .unwrap_err();
        assert_eq!(err, DatasetError::DuplicateEmbedding(1));
    }

    #[test]
    fn test_resolve_and_missing() {
        let dataset = three_article_dataset();
        let resolved: Vec<i64> = dataset.resolve(&[3, 999, 1]).iter().map(|a| a.id).collect();
        assert_eq!(resolved, vec![3, 1]);
        assert_eq!(dataset.missing(&[1, 999, 1000]), vec![999, 1000]);
        assert_eq!(
            dataset.newest_publish_date(),
            dataset.get(3).map(|a| a.publish_date)
        );
    }
}
