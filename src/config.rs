use crate::clusterer::{Clusterer, ComponentClusterer, LouvainClusterer};
use crate::combiner::CombinationPolicy;
use crate::error::ConfigError;
use rand::prelude::StdRng;
use rand::SeedableRng;

/// The community detection algorithm run after every mutation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Algorithm {
    /// Multi-level modularity optimization with randomized node order.
    Louvain { resolution: f64, max_passes: usize },
    /// Connected components of the graph above a weight threshold.
    ConnectedComponents { min_edge_weight: f64 },
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Louvain {
            resolution: 0.5,
            max_passes: LouvainClusterer::DEFAULT_MAX_PASSES,
        }
    }
}

/// Tunables of one clustering session.
///
/// # Example
///
/// ```
/// use session_clustering::{ClusteringConfig, CombinationPolicy};
///
/// let config = ClusteringConfig {
///     combination: CombinationPolicy::weighted_sum(0.7).unwrap(),
///     seed: Some(1),
///     ..ClusteringConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusteringConfig {
    pub combination: CombinationPolicy,
    pub algorithm: Algorithm,
    /// Seed of the clustering random source. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl ClusteringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.combination.validate()?;
        match self.algorithm {
            Algorithm::Louvain { resolution, .. } => {
                if !resolution.is_finite() || resolution <= 0.0 {
                    return Err(ConfigError::OutOfRange {
                        name: "resolution",
                        value: resolution,
                    });
                }
            }
            Algorithm::ConnectedComponents { min_edge_weight } => {
                if !min_edge_weight.is_finite() || min_edge_weight < 0.0 {
                    return Err(ConfigError::OutOfRange {
                        name: "min_edge_weight",
                        value: min_edge_weight,
                    });
                }
            }
        }
        Ok(())
    }

    /// Builds the clusterer described by `algorithm` and `seed`.
    pub fn build_clusterer(&self) -> Box<dyn Clusterer> {
        match self.algorithm {
            Algorithm::Louvain {
                resolution,
                max_passes,
            } => {
                let rng = match self.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                Box::new(LouvainClusterer::new(resolution, max_passes, rng))
            }
            Algorithm::ConnectedComponents { min_edge_weight } => {
                Box::new(ComponentClusterer::new(min_edge_weight))
            }
        }
    }
}
