//! Clustering strategies that group feature vectors, the cluster number of a message then
//! becomes its symbol.

use std::fmt::Debug;

use crate::{AbstractionError, FeatureVector};

mod kmeans;
pub use kmeans::KMeans;

mod hierarchical;
pub use hierarchical::Hierarchical;

mod rule_based;
pub use rule_based::RuleBased;

/// A clustering algorithm that is first fitted on a set of feature vectors and afterwards
/// assigns cluster numbers to (possibly new) vectors.
pub trait ClusteringAlgorithm: Debug + Send + Sync {
    /// A short name for logging.
    fn name(&self) -> &'static str;

    /// Trains the clustering on the given vectors.
    fn fit(&mut self, points: &[FeatureVector]) -> Result<(), AbstractionError>;

    /// Assigns a cluster number to each of the given vectors, the result has the same length
    /// as `points`.
    fn predict(&self, points: &[FeatureVector]) -> Result<Vec<usize>, AbstractionError>;

    fn fit_predict(&mut self, points: &[FeatureVector]) -> Result<Vec<usize>, AbstractionError> {
        self.fit(points)?;
        self.predict(points)
    }
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the candidate closest to `point`, the first one wins ties. `candidates` must not
/// be empty.
pub(crate) fn nearest(point: &[f64], candidates: &[FeatureVector]) -> usize {
    let mut best = (0, f64::INFINITY);
    for (i, candidate) in candidates.iter().enumerate() {
        let distance = squared_distance(point, candidate);
        if distance < best.1 {
            best = (i, distance);
        }
    }
    best.0
}

/// A hashable representation of a vector, two vectors get the same key iff they are equal
/// component wise (with `-0.0 == 0.0`).
pub(crate) fn vector_key(point: &[f64]) -> Vec<u64> {
    point
        .iter()
        .map(|x| if *x == 0.0 { 0.0f64 } else { *x }.to_bits())
        .collect()
}

/// Returns the dimension shared by all vectors.
pub(crate) fn common_dimension(points: &[FeatureVector]) -> Result<usize, AbstractionError> {
    let expected = points.first().ok_or(AbstractionError::EmptyInput)?.len();
    match points.iter().find(|p| p.len() != expected) {
        Some(p) => Err(AbstractionError::DimensionMismatch {
            expected,
            found: p.len(),
        }),
        None => Ok(expected),
    }
}

pub(crate) fn check_dimension(
    points: &[FeatureVector],
    expected: usize,
) -> Result<(), AbstractionError> {
    match points.iter().find(|p| p.len() != expected) {
        Some(p) => Err(AbstractionError::DimensionMismatch {
            expected,
            found: p.len(),
        }),
        None => Ok(()),
    }
}
