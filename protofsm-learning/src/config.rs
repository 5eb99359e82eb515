//! Configuration of the learning pipeline. Which clustering strategy is used is decided
//! here, the rest of the pipeline only sees a [`ClusteringAlgorithm`] trait object.

use crate::{
    clustering::{Hierarchical, KMeans, RuleBased},
    ClusteringAlgorithm,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ClusteringConfig {
    KMeans {
        clusters: usize,
        max_iterations: usize,
        seed: u64,
    },
    Hierarchical {
        distance_threshold: f64,
    },
    RuleBased,
}

impl ClusteringConfig {
    pub const DEFAULT_CLUSTERS: usize = 8;

    pub fn kmeans(clusters: usize) -> Self {
        ClusteringConfig::KMeans {
            clusters,
            max_iterations: KMeans::DEFAULT_MAX_ITERATIONS,
            seed: 0,
        }
    }

    /// Instantiates the configured strategy.
    pub fn build(&self) -> Box<dyn ClusteringAlgorithm> {
        match self {
            ClusteringConfig::KMeans {
                clusters,
                max_iterations,
                seed,
            } => Box::new(
                KMeans::new(*clusters)
                    .with_max_iterations(*max_iterations)
                    .with_seed(*seed),
            ),
            ClusteringConfig::Hierarchical { distance_threshold } => {
                Box::new(Hierarchical::new(*distance_threshold))
            }
            ClusteringConfig::RuleBased => Box::new(RuleBased::new()),
        }
    }
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self::kmeans(Self::DEFAULT_CLUSTERS)
    }
}

/// Settings for [`crate::ControlFlowPipeline`]. When `k` is set, the prefix tree is
/// compressed with k-tails using that lookahead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    pub clustering: ClusteringConfig,
    pub k: Option<usize>,
}

impl PipelineConfig {
    pub fn with_clustering(mut self, clustering: ClusteringConfig) -> Self {
        self.clustering = clustering;
        self
    }

    pub fn with_ktails(mut self, k: usize) -> Self {
        self.k = Some(k);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_configured_strategy() {
        assert_eq!(ClusteringConfig::default().build().name(), "k-means");
        assert_eq!(
            ClusteringConfig::Hierarchical {
                distance_threshold: 2.0
            }
            .build()
            .name(),
            "hierarchical"
        );
        assert_eq!(ClusteringConfig::RuleBased.build().name(), "rule-based");

        let config = PipelineConfig::default()
            .with_clustering(ClusteringConfig::RuleBased)
            .with_ktails(2);
        assert_eq!(config.k, Some(2));
        assert_eq!(PipelineConfig::default().k, None);
    }
}
