use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use super::types::{Article, DatasetError, EmbeddingVector};
use super::{ArticleDataset, TARGET_DATASET};
use crate::clustering::source::InMemoryClusterSource;
use crate::clustering::types::{ClusteringConfig, RawCluster};

/// Articles and embeddings returned together by an [`ArticleStore`].
#[derive(Debug, Clone, Default)]
pub struct ArticleBatch {
    pub articles: Vec<Article>,
    pub embeddings: Vec<EmbeddingVector>,
}

impl ArticleBatch {
    pub fn into_dataset(self) -> Result<ArticleDataset, DatasetError> {
        ArticleDataset::new(self.articles, self.embeddings)
    }
}

/// Where articles come from. Embeddings are carried through untouched.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn by_ids(&self, ids: &[i64]) -> Result<ArticleBatch>;
    async fn by_date_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<ArticleBatch>;
}

/// Store backed by vectors held in memory, typically loaded from a [`BatchFile`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryArticleStore {
    articles: Vec<Article>,
    embeddings: Vec<EmbeddingVector>,
}

impl InMemoryArticleStore {
    pub fn new(articles: Vec<Article>, embeddings: Vec<EmbeddingVector>) -> Self {
        InMemoryArticleStore {
            articles,
            embeddings,
        }
    }

    fn select(&self, keep: impl Fn(&Article) -> bool) -> ArticleBatch {
        let articles: Vec<Article> = self.articles.iter().filter(|a| keep(a)).cloned().collect();
        let ids: HashSet<i64> = articles.iter().map(|a| a.id).collect();
        let embeddings = self
            .embeddings
            .iter()
            .filter(|e| ids.contains(&e.article_id()))
            .cloned()
            .collect();
        ArticleBatch {
            articles,
            embeddings,
        }
    }
}

#[async_trait]
impl ArticleStore for InMemoryArticleStore {
    async fn by_ids(&self, ids: &[i64]) -> Result<ArticleBatch> {
        let wanted: HashSet<i64> = ids.iter().copied().collect();
        Ok(self.select(|a| wanted.contains(&a.id)))
    }

    async fn by_date_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<ArticleBatch> {
        Ok(self.select(|a| a.publish_date >= from && a.publish_date <= to))
    }
}

/// On-disk input for one run: the clustering output plus the articles it covers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFile {
    #[serde(default)]
    pub clustering_config: ClusteringConfig,
    pub clusters: Vec<RawCluster>,
    pub articles: Vec<Article>,
    #[serde(default)]
    pub embeddings: Vec<EmbeddingVector>,
}

impl BatchFile {
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read batch file {}", path.display()))?;
        let batch: BatchFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse batch file {}", path.display()))?;
        info!(
            target: TARGET_DATASET,
            "Loaded {} clusters, {} articles and {} embeddings from {}",
            batch.clusters.len(),
            batch.articles.len(),
            batch.embeddings.len(),
            path.display()
        );
        Ok(batch)
    }

    pub fn into_sources(self) -> (InMemoryClusterSource, InMemoryArticleStore) {
        (
            InMemoryClusterSource::new(self.clusters, self.clustering_config),
            InMemoryArticleStore::new(self.articles, self.embeddings),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::{article, embedding};

    fn store() -> InMemoryArticleStore {
        InMemoryArticleStore::new(
            vec![
                article(1, "a", "https://a.example.com/1", 1),
                article(2, "b", "https://b.example.com/2", 5),
                article(3, "c", "https://c.example.com/3", 9),
            ],
            vec![embedding(1, 0, 0.1), embedding(3, 2, 0.1)],
        )
    }

    #[tokio::test]
    async fn test_by_ids_carries_matching_embeddings() {
        let batch = store().by_ids(&[1, 2, 42]).await.unwrap();
        let ids: Vec<i64> = batch.articles.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(batch.embeddings.len(), 1);
        assert_eq!(batch.embeddings[0].article_id(), 1);
        assert_eq!(batch.into_dataset().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_by_date_range_is_inclusive() {
        let s = store();
        let from = s.articles[1].publish_date;
        let to = s.articles[2].publish_date;
        let batch = s.by_date_range(from, to).await.unwrap();
        let ids: Vec<i64> = batch.articles.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_batch_file_parses_camel_case() {
        let json = serde_json::json!({
            "clusteringConfig": {
                "umapNeighbors": 15,
                "umapComponents": 5,
                "hdbscanMinClusterSize": 3,
                "hdbscanMinSamples": 2,
                "hdbscanEpsilon": 0.1
            },
            "clusters": [{ "clusterId": 0, "articleIds": [1, 2], "isNoise": false }],
            "articles": [{
                "id": 1,
                "title": "t",
                "content": "c",
                "url": "https://example.com/x",
                "publishDate": "2025-03-01T08:00:00Z"
            }]
        });
        let batch: BatchFile = serde_json::from_value(json).unwrap();
        assert_eq!(batch.clustering_config.umap_neighbors, 15);
        assert_eq!(batch.clusters[0].article_ids, vec![1, 2]);
        assert!(batch.embeddings.is_empty());
        assert_eq!(batch.articles[0].summary, "");
    }
}
