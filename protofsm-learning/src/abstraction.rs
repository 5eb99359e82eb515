//! Turning feature vectors into protocol symbols.

use protofsm_core::Symbol;
use tracing::debug;

use crate::{AbstractionError, ClusteringAlgorithm, FeatureVector};

/// Maps feature vectors of message events to abstract symbols.
pub trait MessageAbstractor {
    /// Prepares the abstraction on the vectors of all observed messages.
    fn fit(&mut self, features: &[FeatureVector]) -> Result<(), AbstractionError>;

    /// Gives the symbol for a single vector.
    fn abstract_vector(&self, feature: &FeatureVector) -> Result<Symbol, AbstractionError>;

    fn abstract_all(&self, features: &[FeatureVector]) -> Result<Vec<Symbol>, AbstractionError> {
        features.iter().map(|f| self.abstract_vector(f)).collect()
    }
}

/// Uses the cluster number assigned by a [`ClusteringAlgorithm`] as symbol, formatted as
/// `C{cluster}`.
#[derive(Debug)]
pub struct ClusterAbstractor {
    algorithm: Box<dyn ClusteringAlgorithm>,
    fitted: bool,
}

impl ClusterAbstractor {
    pub fn new(algorithm: Box<dyn ClusteringAlgorithm>) -> Self {
        Self {
            algorithm,
            fitted: false,
        }
    }

    pub fn symbol_for(cluster: usize) -> Symbol {
        format!("C{cluster}")
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn algorithm(&self) -> &dyn ClusteringAlgorithm {
        self.algorithm.as_ref()
    }
}

impl MessageAbstractor for ClusterAbstractor {
    fn fit(&mut self, features: &[FeatureVector]) -> Result<(), AbstractionError> {
        debug!(
            "fitting {} clustering on {} feature vectors",
            self.algorithm.name(),
            features.len()
        );
        self.algorithm.fit(features)?;
        self.fitted = true;
        Ok(())
    }

    fn abstract_vector(&self, feature: &FeatureVector) -> Result<Symbol, AbstractionError> {
        self.abstract_all(std::slice::from_ref(feature))?
            .pop()
            .ok_or(AbstractionError::NotFitted)
    }

    fn abstract_all(&self, features: &[FeatureVector]) -> Result<Vec<Symbol>, AbstractionError> {
        if !self.fitted {
            return Err(AbstractionError::NotFitted);
        }
        Ok(self
            .algorithm
            .predict(features)?
            .into_iter()
            .map(Self::symbol_for)
            .collect())
    }
}
