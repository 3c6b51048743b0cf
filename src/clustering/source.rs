use anyhow::Result;
use async_trait::async_trait;

use super::types::{ClusterBatch, ClusteringConfig, RawCluster};

/// Where clusters come from. The embedding and HDBSCAN steps run elsewhere;
/// this only hands over their output.
#[async_trait]
pub trait ClusterSource: Send + Sync {
    async fn clusters(&self) -> Result<ClusterBatch>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryClusterSource {
    batch: ClusterBatch,
}

impl InMemoryClusterSource {
    pub fn new(clusters: Vec<RawCluster>, config: ClusteringConfig) -> Self {
        InMemoryClusterSource {
            batch: ClusterBatch { clusters, config },
        }
    }
}

#[async_trait]
impl ClusterSource for InMemoryClusterSource {
    async fn clusters(&self) -> Result<ClusterBatch> {
        Ok(self.batch.clone())
    }
}
