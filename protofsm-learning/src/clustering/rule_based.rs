use protofsm_core::math;

use super::vector_key;
use crate::{AbstractionError, ClusteringAlgorithm, FeatureVector};

/// Exact match clustering: every distinct vector forms a cluster of its own. Cluster
/// numbers are handed out in the order in which vectors are first seen and accumulate over
/// repeated fits.
#[derive(Debug, Clone, Default)]
pub struct RuleBased {
    clusters: math::Map<Vec<u64>, usize>,
}

impl RuleBased {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }
}

impl ClusteringAlgorithm for RuleBased {
    fn name(&self) -> &'static str {
        "rule-based"
    }

    fn fit(&mut self, points: &[FeatureVector]) -> Result<(), AbstractionError> {
        if points.is_empty() {
            return Err(AbstractionError::EmptyInput);
        }
        for point in points {
            let next = self.clusters.len();
            self.clusters.entry(vector_key(point)).or_insert(next);
        }
        Ok(())
    }

    fn predict(&self, points: &[FeatureVector]) -> Result<Vec<usize>, AbstractionError> {
        if self.clusters.is_empty() {
            return Err(AbstractionError::NotFitted);
        }
        points
            .iter()
            .map(|point| {
                self.clusters
                    .get(&vector_key(point))
                    .copied()
                    .ok_or_else(|| AbstractionError::UnknownVector(point.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_cluster_per_distinct_vector() {
        let mut rules = RuleBased::new();
        let labels = rules
            .fit_predict(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![1.0, 2.0]])
            .unwrap();
        assert_eq!(labels, vec![0, 1, 0]);

        rules.fit(&[vec![5.0, 6.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(rules.cluster_count(), 3);
        assert_eq!(rules.predict(&[vec![5.0, 6.0]]).unwrap(), vec![2]);
        assert_eq!(
            rules.predict(&[vec![9.0, 9.0]]),
            Err(AbstractionError::UnknownVector(vec![9.0, 9.0]))
        );
    }
}
