use serde::{Deserialize, Serialize};

use crate::validation::{validate_story, Violation};

/// A cluster as produced by the external embedding + HDBSCAN step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCluster {
    pub cluster_id: i64,
    pub article_ids: Vec<i64>,
    /// HDBSCAN outlier label.
    #[serde(default)]
    pub is_noise: bool,
}

/// Parameters the clusters were produced with. Kept for provenance only;
/// nothing here is recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringConfig {
    pub umap_neighbors: u32,
    pub umap_components: u32,
    pub hdbscan_min_cluster_size: u32,
    pub hdbscan_min_samples: u32,
    pub hdbscan_epsilon: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            umap_neighbors: 15,
            umap_components: 5,
            hdbscan_min_cluster_size: 2,
            hdbscan_min_samples: 1,
            hdbscan_epsilon: 0.0,
        }
    }
}

/// The clusters of one run together with how they were computed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterBatch {
    pub clusters: Vec<RawCluster>,
    pub config: ClusteringConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoryType {
    SingleStory,
    CollectionOfStories,
}

impl StoryType {
    pub fn parse(label: &str) -> Option<Self> {
        match crate::report::types::label_key(label).as_str() {
            "SINGLE_STORY" | "SINGLE" => Some(StoryType::SingleStory),
            "COLLECTION_OF_STORIES" | "COLLECTION" => Some(StoryType::CollectionOfStories),
            _ => None,
        }
    }
}

/// A cluster judged to cover one or more coherent news events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Cluster this story was validated from.
    pub cluster_id: i64,
    pub title: String,
    pub importance: u8,
    pub article_ids: Vec<i64>,
    pub story_type: StoryType,
}

impl Story {
    /// Builds a story, refusing any that fail structural validation.
    pub fn new(
        cluster_id: i64,
        title: impl Into<String>,
        importance: u8,
        article_ids: Vec<i64>,
        story_type: StoryType,
    ) -> Result<Self, Vec<Violation>> {
        let story = Story {
            cluster_id,
            title: title.into(),
            importance,
            article_ids,
            story_type,
        };
        let violations = validate_story(&story);
        if violations.is_empty() {
            Ok(story)
        } else {
            Err(violations)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    PureNoise,
    NoStories,
    InsufficientArticles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedCluster {
    pub cluster_id: i64,
    pub rejection_reason: RejectionReason,
    pub original_article_ids: Vec<i64>,
}

/// Every input cluster ends up in exactly one of the two lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedStories {
    pub stories: Vec<Story>,
    pub rejected_clusters: Vec<RejectedCluster>,
}

impl ValidatedStories {
    /// Checks that `clusters` is partitioned between stories and rejections:
    /// each input ID appears exactly once across both lists and nothing else does.
    pub fn check_partition(&self, clusters: &[RawCluster]) -> Vec<Violation> {
        use std::collections::HashMap;

        let mut seen: HashMap<i64, usize> = HashMap::new();
        for id in self
            .stories
            .iter()
            .map(|s| s.cluster_id)
            .chain(self.rejected_clusters.iter().map(|r| r.cluster_id))
        {
            *seen.entry(id).or_default() += 1;
        }

        let mut violations = Vec::new();
        for cluster in clusters {
            match seen.remove(&cluster.cluster_id) {
                Some(1) => {}
                Some(n) => violations.push(Violation::new(
                    format!("cluster[{}]", cluster.cluster_id),
                    format!("classified {} times", n),
                )),
                None => violations.push(Violation::new(
                    format!("cluster[{}]", cluster.cluster_id),
                    "dropped during validation",
                )),
            }
        }
        for id in seen.keys() {
            violations.push(Violation::new(
                format!("cluster[{}]", id),
                "not present in the input",
            ));
        }
        violations
    }
}
