use anyhow::Result;
use async_trait::async_trait;

use super::types::{RawCluster, StoryType};
use crate::config::ValidatorConfig;
use crate::dataset::{Article, ArticleDataset};
use crate::util::{cosine_similarity, token_jaccard};

/// Title overlap thresholds used when a cluster has too few embeddings.
/// Titles are short, so overlap runs much lower than embedding similarity.
const TITLE_COHERENCE_FLOOR: f32 = 0.10;
const TITLE_SINGLE_STORY_THRESHOLD: f32 = 0.35;

/// Outcome of classifying one cluster that passed the noise and size checks.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterVerdict {
    NoStories {
        reason: String,
    },
    Story {
        title: String,
        story_type: StoryType,
        /// Importance suggested by the classifier itself, if it has an opinion.
        importance: Option<u8>,
    },
}

/// Decides whether a cluster holds a coherent story. Implementations must
/// return the same verdict for the same input when their backend is deterministic.
#[async_trait]
pub trait ClusterClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// `articles` are the cluster's articles that exist in `dataset`, in cluster order.
    async fn classify(
        &self,
        cluster: &RawCluster,
        articles: &[&Article],
        dataset: &ArticleDataset,
    ) -> Result<ClusterVerdict>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoherenceBasis {
    Embeddings,
    Titles,
}

/// How tightly a cluster's articles hang together.
#[derive(Debug, Clone, PartialEq)]
pub struct Coherence {
    pub basis: CoherenceBasis,
    /// Mean pairwise similarity.
    pub score: f32,
    /// Article closest to all the others; its title names the story.
    pub medoid_id: i64,
}

/// Pairwise-similarity classifier. Uses embeddings when every article has
/// one, title overlap otherwise.
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    coherence_floor: f32,
    single_story_threshold: f32,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::from_config(&ValidatorConfig::default())
    }
}

impl HeuristicClassifier {
    pub fn from_config(config: &ValidatorConfig) -> Self {
        Self {
            coherence_floor: config.coherence_floor,
            single_story_threshold: config.single_story_threshold,
        }
    }

    pub fn coherence(&self, articles: &[&Article], dataset: &ArticleDataset) -> Option<Coherence> {
        if articles.is_empty() {
            return None;
        }

        let vectors: Vec<&[f32]> = articles
            .iter()
            .filter_map(|a| dataset.embedding(a.id).map(|e| e.as_slice()))
            .collect();
        let basis = if vectors.len() == articles.len() {
            CoherenceBasis::Embeddings
        } else {
            CoherenceBasis::Titles
        };
        let similarity = |i: usize, j: usize| -> f32 {
            match basis {
                // Zero-magnitude vectors count as unrelated.
                CoherenceBasis::Embeddings => {
                    cosine_similarity(vectors[i], vectors[j]).unwrap_or(0.0)
                }
                CoherenceBasis::Titles => token_jaccard(&articles[i].title, &articles[j].title),
            }
        };

        let n = articles.len();
        let mut totals = vec![0.0f32; n];
        let mut pair_sum = 0.0f32;
        for i in 0..n {
            for j in (i + 1)..n {
                let s = similarity(i, j);
                totals[i] += s;
                totals[j] += s;
                pair_sum += s;
            }
        }
        let pairs = (n * (n - 1) / 2).max(1) as f32;

        // Highest total similarity wins; ties go to the lowest article ID.
        let medoid = (0..n)
            .max_by(|&a, &b| {
                totals[a]
                    .partial_cmp(&totals[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(articles[b].id.cmp(&articles[a].id))
            })
            .unwrap_or(0);

        Some(Coherence {
            basis,
            score: if n == 1 { 1.0 } else { pair_sum / pairs },
            medoid_id: articles[medoid].id,
        })
    }

    fn thresholds(&self, basis: CoherenceBasis) -> (f32, f32) {
        match basis {
            CoherenceBasis::Embeddings => (self.coherence_floor, self.single_story_threshold),
            CoherenceBasis::Titles => (TITLE_COHERENCE_FLOOR, TITLE_SINGLE_STORY_THRESHOLD),
        }
    }

    pub fn verdict(&self, articles: &[&Article], dataset: &ArticleDataset) -> ClusterVerdict {
        let Some(coherence) = self.coherence(articles, dataset) else {
            return ClusterVerdict::NoStories {
                reason: "cluster has no known articles".to_string(),
            };
        };

        let (floor, single) = self.thresholds(coherence.basis);
        if coherence.score < floor {
            return ClusterVerdict::NoStories {
                reason: format!(
                    "coherence {:.2} is below {:.2} ({:?})",
                    coherence.score, floor, coherence.basis
                ),
            };
        }

        let title = articles
            .iter()
            .find(|a| a.id == coherence.medoid_id)
            .map(|a| a.title.trim().to_string())
            .unwrap_or_default();
        let story_type = if coherence.score >= single {
            StoryType::SingleStory
        } else {
            StoryType::CollectionOfStories
        };

        ClusterVerdict::Story {
            title,
            story_type,
            importance: None,
        }
    }
}

#[async_trait]
impl ClusterClassifier for HeuristicClassifier {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn classify(
        &self,
        _cluster: &RawCluster,
        articles: &[&Article],
        dataset: &ArticleDataset,
    ) -> Result<ClusterVerdict> {
        Ok(self.verdict(articles, dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::{article, embedding};

    fn dataset_with_axes(axes: &[(i64, &str, usize, f32)]) -> ArticleDataset {
        let articles = axes
            .iter()
            .map(|(id, title, _, _)| article(*id, title, "https://example.com/x", 1))
            .collect();
        let embeddings = axes
            .iter()
            .map(|(id, _, axis, jitter)| embedding(*id, *axis, *jitter))
            .collect();
        ArticleDataset::new(articles, embeddings).unwrap()
    }

    #[test]
    fn test_tight_embeddings_are_a_single_story() {
        let dataset = dataset_with_axes(&[
            (1, "Bridge collapses", 0, 0.1),
            (2, "Bridge collapse kills 3", 0, 0.2),
            (3, "Inquiry into bridge collapse", 0, 0.15),
        ]);
        let articles = dataset.resolve(&[1, 2, 3]);
        let verdict = HeuristicClassifier::default().verdict(&articles, &dataset);
        match verdict {
            ClusterVerdict::Story {
                story_type, title, ..
            } => {
                assert_eq!(story_type, StoryType::SingleStory);
                assert!(title.contains("ridge"));
            }
            other => panic!("expected a story, got {:?}", other),
        }
    }

    #[test]
    fn test_orthogonal_embeddings_have_no_story() {
        let dataset = dataset_with_axes(&[
            (1, "Bridge collapses", 0, 0.0),
            (2, "Cup final tonight", 10, 0.0),
            (3, "New phone released", 20, 0.0),
        ]);
        let articles = dataset.resolve(&[1, 2, 3]);
        assert!(matches!(
            HeuristicClassifier::default().verdict(&articles, &dataset),
            ClusterVerdict::NoStories { .. }
        ));
    }

    #[test]
    fn test_loose_embeddings_are_a_collection() {
        // Pairwise cosine of (1, j) and (j, 1) style vectors sits between the thresholds.
        let dataset = dataset_with_axes(&[
            (1, "Drought hits farms", 0, 1.0),
            (2, "Water rationing begins", 1, 1.0),
            (3, "Crop prices climb", 0, 1.0),
        ]);
        let articles = dataset.resolve(&[1, 2, 3]);
        let verdict = HeuristicClassifier::default().verdict(&articles, &dataset);
        assert!(matches!(
            verdict,
            ClusterVerdict::Story {
                story_type: StoryType::CollectionOfStories,
                ..
            }
        ));
    }

    #[test]
    fn test_falls_back_to_titles_without_embeddings() {
        let dataset = ArticleDataset::new(
            vec![
                article(1, "Harbor workers strike", "https://a.example.com", 1),
                article(2, "Harbor strike enters day two", "https://b.example.com", 2),
            ],
            vec![],
        )
        .unwrap();
        let articles = dataset.resolve(&[1, 2]);
        let coherence = HeuristicClassifier::default()
            .coherence(&articles, &dataset)
            .unwrap();
        assert_eq!(coherence.basis, CoherenceBasis::Titles);
        assert!(coherence.score >= TITLE_COHERENCE_FLOOR);
    }
}
