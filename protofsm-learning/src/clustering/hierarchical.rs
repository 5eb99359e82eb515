use protofsm_core::math;
use tracing::trace;

use super::{check_dimension, common_dimension, nearest, squared_distance, vector_key};
use crate::{AbstractionError, ClusteringAlgorithm, FeatureVector};

/// Agglomerative clustering with Ward linkage. Starting from one cluster per distinct
/// vector, the two clusters whose merge increases the within-cluster variance the least are
/// merged, as long as their linkage distance stays below the threshold. The number of
/// clusters is therefore not fixed up front.
#[derive(Debug, Clone)]
pub struct Hierarchical {
    distance_threshold: f64,
    representatives: Vec<FeatureVector>,
    labels: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Cluster {
    centroid: FeatureVector,
    size: usize,
    members: Vec<usize>,
}

impl Cluster {
    fn ward_distance(&self, other: &Cluster) -> f64 {
        let (n, m) = (self.size as f64, other.size as f64);
        (2.0 * n * m / (n + m) * squared_distance(&self.centroid, &other.centroid)).sqrt()
    }

    fn absorb(&mut self, other: Cluster) {
        let total = (self.size + other.size) as f64;
        for (mine, theirs) in self.centroid.iter_mut().zip(&other.centroid) {
            *mine = (*mine * self.size as f64 + theirs * other.size as f64) / total;
        }
        self.size += other.size;
        self.members.extend(other.members);
    }
}

impl Hierarchical {
    pub fn new(distance_threshold: f64) -> Self {
        Self {
            distance_threshold,
            representatives: vec![],
            labels: vec![],
        }
    }

    pub fn distance_threshold(&self) -> f64 {
        self.distance_threshold
    }

    /// Number of clusters found by the last fit.
    pub fn cluster_count(&self) -> usize {
        self.labels.iter().max().map_or(0, |max| max + 1)
    }

    fn closest_pair(clusters: &[Option<Cluster>]) -> Option<(usize, usize, f64)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for (i, a) in clusters.iter().enumerate() {
            let Some(a) = a else { continue };
            for (j, b) in clusters.iter().enumerate().skip(i + 1) {
                let Some(b) = b else { continue };
                let distance = a.ward_distance(b);
                if best.map_or(true, |(_, _, d)| distance < d) {
                    best = Some((i, j, distance));
                }
            }
        }
        best
    }
}

impl ClusteringAlgorithm for Hierarchical {
    fn name(&self) -> &'static str {
        "hierarchical"
    }

    fn fit(&mut self, points: &[FeatureVector]) -> Result<(), AbstractionError> {
        if !self.distance_threshold.is_finite() || self.distance_threshold < 0.0 {
            return Err(AbstractionError::InvalidParameter(format!(
                "distance threshold must be a non-negative number, got {}",
                self.distance_threshold
            )));
        }
        common_dimension(points)?;

        // identical vectors are at distance zero and would be merged first anyway
        let mut distinct: math::Map<Vec<u64>, usize> = math::Map::default();
        let mut clusters: Vec<Option<Cluster>> = vec![];
        for point in points {
            let next = distinct.len();
            let index = *distinct.entry(vector_key(point)).or_insert(next);
            if index == next {
                clusters.push(Some(Cluster {
                    centroid: point.clone(),
                    size: 1,
                    members: vec![index],
                }));
            } else if let Some(cluster) = clusters[index].as_mut() {
                cluster.size += 1;
            }
        }
        let representatives = clusters
            .iter()
            .flatten()
            .map(|c| c.centroid.clone())
            .collect::<Vec<_>>();

        while let Some((i, j, distance)) = Self::closest_pair(&clusters) {
            if distance >= self.distance_threshold {
                break;
            }
            trace!("merging clusters {i} and {j} at distance {distance}");
            if let Some(absorbed) = clusters[j].take() {
                if let Some(kept) = clusters[i].as_mut() {
                    kept.absorb(absorbed);
                }
            }
        }

        // label clusters in the order in which their first representative appeared
        let mut owner = vec![0; representatives.len()];
        for (cluster_index, cluster) in clusters.iter().enumerate() {
            for member in cluster.iter().flat_map(|c| c.members.iter()) {
                owner[*member] = cluster_index;
            }
        }
        let mut renumbered: math::Map<usize, usize> = math::Map::default();
        let labels = owner
            .into_iter()
            .map(|cluster_index| {
                let next = renumbered.len();
                *renumbered.entry(cluster_index).or_insert(next)
            })
            .collect::<Vec<_>>();

        trace!(
            "hierarchical clustering found {} clusters among {} distinct vectors",
            renumbered.len(),
            representatives.len()
        );
        self.representatives = representatives;
        self.labels = labels;
        Ok(())
    }

    /// Each vector gets the label of the closest fitted vector.
    fn predict(&self, points: &[FeatureVector]) -> Result<Vec<usize>, AbstractionError> {
        let Some(first) = self.representatives.first() else {
            return Err(AbstractionError::NotFitted);
        };
        check_dimension(points, first.len())?;
        Ok(points
            .iter()
            .map(|point| self.labels[nearest(point, &self.representatives)])
            .collect())
    }
}
