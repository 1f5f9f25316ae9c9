use crate::error::ClusteringError;

/// An undirected weighted graph over page indices, stored as a dense
/// symmetric weight buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightedGraph {
    dimension: usize,
    weights: Vec<f64>,
}

impl WeightedGraph {
    /// Wraps a row-major `dimension * dimension` buffer.
    ///
    /// The buffer is checked lazily by [`WeightedGraph::validate`], so that a
    /// malformed graph surfaces as a clustering failure.
    pub fn from_dense(dimension: usize, weights: Vec<f64>) -> WeightedGraph {
        WeightedGraph { dimension, weights }
    }

    pub fn empty() -> WeightedGraph {
        WeightedGraph::from_dense(0, Vec::new())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn weight(&self, row: usize, column: usize) -> f64 {
        self.weights[row * self.dimension + column]
    }

    /// Iterates over the neighbors of `node` joined by a positive weight.
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = node * self.dimension;
        self.weights[start..start + self.dimension]
            .iter()
            .enumerate()
            .filter(move |&(other, &weight)| other != node && weight > 0.0)
            .map(|(other, &weight)| (other, weight))
    }

    /// Checks that the buffer is square, finite, non-negative and symmetric.
    pub fn validate(&self) -> Result<(), ClusteringError> {
        let expected = self.dimension * self.dimension;
        if self.weights.len() != expected {
            return Err(ClusteringError::MalformedGraph {
                expected,
                actual: self.weights.len(),
            });
        }
        for row in 0..self.dimension {
            for column in row..self.dimension {
                let weight = self.weight(row, column);
                if !weight.is_finite() || weight < 0.0 || weight != self.weight(column, row) {
                    return Err(ClusteringError::InvalidWeight {
                        row,
                        column,
                        weight,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_skip_zero_weights_and_diagonal() {
        let graph = WeightedGraph::from_dense(3, vec![0.0, 0.5, 0.0, 0.5, 0.0, 1.0, 0.0, 1.0, 0.0]);
        let neighbors: Vec<_> = graph.neighbors(1).collect();
        assert_eq!(neighbors, vec![(0, 0.5), (2, 1.0)]);
        assert_eq!(graph.neighbors(0).count(), 1);
    }

    #[test]
    fn validate_rejects_bad_buffers() {
        assert_eq!(
            WeightedGraph::from_dense(2, vec![0.0; 3]).validate(),
            Err(ClusteringError::MalformedGraph {
                expected: 4,
                actual: 3
            })
        );
        assert!(WeightedGraph::from_dense(2, vec![0.0, f64::NAN, f64::NAN, 0.0])
            .validate()
            .is_err());
        assert!(WeightedGraph::from_dense(2, vec![0.0, 0.2, 0.3, 0.0])
            .validate()
            .is_err());
        assert!(WeightedGraph::empty().validate().is_ok());
    }
}
