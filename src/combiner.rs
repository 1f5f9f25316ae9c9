use crate::clusterer::WeightedGraph;
use crate::error::{ConfigError, ValidationError};
use crate::matrix::SimilarityMatrix;
use rayon::prelude::*;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// How the navigation and text matrices are folded into one graph.
///
/// Every edge weight is `navigation_weight * navigation + text_weight * text`.
/// Combined weights not above `min_edge_weight` are dropped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CombinationPolicy {
    pub navigation_weight: f64,
    pub text_weight: f64,
    pub min_edge_weight: f64,
}

impl Default for CombinationPolicy {
    fn default() -> Self {
        CombinationPolicy {
            navigation_weight: 0.5,
            text_weight: 0.5,
            min_edge_weight: 0.0,
        }
    }
}

impl CombinationPolicy {
    /// `alpha * navigation + (1 - alpha) * text`.
    pub fn weighted_sum(alpha: f64) -> Result<CombinationPolicy, ConfigError> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(ConfigError::OutOfRange {
                name: "alpha",
                value: alpha,
            });
        }
        Ok(CombinationPolicy {
            navigation_weight: alpha,
            text_weight: 1.0 - alpha,
            min_edge_weight: 0.0,
        })
    }

    pub fn with_min_edge_weight(mut self, min_edge_weight: f64) -> CombinationPolicy {
        self.min_edge_weight = min_edge_weight;
        self
    }

    /// Both weights must lie in `[0, 1]` and sum to at most 1, so combined
    /// weights stay within the range of the inputs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("navigation_weight", self.navigation_weight),
            ("text_weight", self.text_weight),
        ];
        for (name, value) in weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        let sum = self.navigation_weight + self.text_weight;
        if sum > 1.0 + WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::OutOfRange {
                name: "navigation_weight + text_weight",
                value: sum,
            });
        }
        if !self.min_edge_weight.is_finite() || self.min_edge_weight < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "min_edge_weight",
                value: self.min_edge_weight,
            });
        }
        Ok(())
    }

    fn combine_weight(&self, navigation: f64, text: f64) -> f64 {
        let weight = self.navigation_weight * navigation + self.text_weight * text;
        if weight > self.min_edge_weight {
            weight
        } else {
            0.0
        }
    }
}

/// Merges the navigation and text matrices into the graph that is clustered.
#[derive(Clone, Debug, Default)]
pub struct GraphCombiner {
    policy: CombinationPolicy,
}

impl GraphCombiner {
    pub fn new(policy: CombinationPolicy) -> GraphCombiner {
        GraphCombiner { policy }
    }

    pub fn policy(&self) -> &CombinationPolicy {
        &self.policy
    }

    pub fn set_policy(&mut self, policy: CombinationPolicy) {
        self.policy = policy;
    }

    pub fn combine(
        &self,
        navigation: &SimilarityMatrix,
        text: &SimilarityMatrix,
    ) -> Result<WeightedGraph, ValidationError> {
        let n = navigation.dimension();
        if text.dimension() != n {
            return Err(ValidationError::DimensionMismatch {
                expected: n,
                actual: text.dimension(),
            });
        }
        if n == 0 {
            return Ok(WeightedGraph::empty());
        }

        let mut weights = vec![0.0; n * n];
        weights
            .par_chunks_mut(n)
            .enumerate()
            .for_each(|(row, out)| {
                let nav_row = navigation.row(row);
                let text_row = text.row(row);
                for column in 0..n {
                    if column != row {
                        out[column] = self.policy.combine_weight(nav_row[column], text_row[column]);
                    }
                }
            });
        Ok(WeightedGraph::from_dense(n, weights))
    }
}
