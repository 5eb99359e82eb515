use protofsm_core::math;
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    Rng, SeedableRng,
};
use tracing::{debug, trace};

use super::{check_dimension, common_dimension, nearest, squared_distance, vector_key};
use crate::{AbstractionError, ClusteringAlgorithm, FeatureVector};

/// Partitions the vectors into a fixed number of clusters around centroids, using k-means++
/// seeding followed by Lloyd iterations. Seeding is driven by a seeded generator, so fitting
/// the same data twice gives the same clusters.
#[derive(Debug, Clone)]
pub struct KMeans {
    clusters: usize,
    max_iterations: usize,
    seed: u64,
    centroids: Vec<FeatureVector>,
}

impl KMeans {
    pub const DEFAULT_MAX_ITERATIONS: usize = 300;

    pub fn new(clusters: usize) -> Self {
        Self {
            clusters,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            seed: 0,
            centroids: vec![],
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The fitted centroids, empty before [`ClusteringAlgorithm::fit`] was called.
    pub fn centroids(&self) -> &[FeatureVector] {
        &self.centroids
    }

    fn seed_centroids(
        &self,
        distinct: &[&FeatureVector],
        k: usize,
        rng: &mut StdRng,
    ) -> Result<Vec<FeatureVector>, AbstractionError> {
        let mut centroids = vec![distinct[rng.gen_range(0..distinct.len())].clone()];
        while centroids.len() < k {
            let weights = distinct
                .iter()
                .map(|point| {
                    centroids
                        .iter()
                        .map(|c| squared_distance(point, c))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect::<Vec<_>>();
            let chooser = WeightedIndex::new(&weights)
                .map_err(|e| AbstractionError::InvalidParameter(e.to_string()))?;
            centroids.push(distinct[chooser.sample(rng)].clone());
        }
        Ok(centroids)
    }
}

impl ClusteringAlgorithm for KMeans {
    fn name(&self) -> &'static str {
        "k-means"
    }

    fn fit(&mut self, points: &[FeatureVector]) -> Result<(), AbstractionError> {
        if self.clusters == 0 {
            return Err(AbstractionError::InvalidParameter(
                "k-means needs at least one cluster".into(),
            ));
        }
        let dimension = common_dimension(points)?;

        let mut seen = math::Set::default();
        let distinct = points
            .iter()
            .filter(|p| seen.insert(vector_key(p)))
            .collect::<Vec<_>>();
        let k = self.clusters.min(distinct.len());
        if k < self.clusters {
            debug!(
                "only {} distinct vectors, using {k} instead of {} clusters",
                distinct.len(),
                self.clusters
            );
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = self.seed_centroids(&distinct, k, &mut rng)?;

        let mut labels = vec![usize::MAX; points.len()];
        for iteration in 0..self.max_iterations {
            let mut changed = false;
            for (label, point) in labels.iter_mut().zip(points) {
                let closest = nearest(point, &centroids);
                if *label != closest {
                    *label = closest;
                    changed = true;
                }
            }
            if !changed {
                trace!("k-means converged after {iteration} iterations");
                break;
            }

            let mut sums = vec![vec![0.0; dimension]; k];
            let mut counts = vec![0usize; k];
            for (label, point) in labels.iter().zip(points) {
                counts[*label] += 1;
                for (sum, x) in sums[*label].iter_mut().zip(point) {
                    *sum += x;
                }
            }
            for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
                // an empty cluster keeps its previous centroid
                if count > 0 {
                    *centroid = sum.into_iter().map(|s| s / count as f64).collect();
                }
            }
        }

        self.centroids = centroids;
        Ok(())
    }

    fn predict(&self, points: &[FeatureVector]) -> Result<Vec<usize>, AbstractionError> {
        let Some(first) = self.centroids.first() else {
            return Err(AbstractionError::NotFitted);
        };
        check_dimension(points, first.len())?;
        Ok(points
            .iter()
            .map(|point| nearest(point, &self.centroids))
            .collect())
    }
}
