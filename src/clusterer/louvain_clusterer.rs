use crate::clusterer::{compact_labels, Clusterer, Partition, WeightedGraph};
use crate::error::ClusteringError;
use rand::prelude::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

const MIN_GAIN: f64 = 1e-12;

/// One level of the Louvain hierarchy.
///
/// Each node is a community of the level below. `internal` holds the weight
/// of the edges folded into the node, counted in both directions, so that
/// `degree(i) = internal[i] + sum of neighbor weights` at every level.
struct Level {
    neighbors: Vec<Vec<(usize, f64)>>,
    internal: Vec<f64>,
}

impl Level {
    fn from_graph(graph: &WeightedGraph) -> Level {
        let n = graph.dimension();
        Level {
            neighbors: (0..n).map(|node| graph.neighbors(node).collect()).collect(),
            internal: vec![0.0; n],
        }
    }

    fn len(&self) -> usize {
        self.internal.len()
    }

    fn degrees(&self) -> Vec<f64> {
        self.neighbors
            .iter()
            .zip(&self.internal)
            .map(|(edges, internal)| internal + edges.iter().map(|&(_, w)| w).sum::<f64>())
            .collect()
    }

    /// Contracts every community of `community` into a single node.
    fn aggregate(&self, community: &[usize], count: usize) -> Level {
        let mut internal = vec![0.0; count];
        let mut weights: Vec<Vec<f64>> = vec![vec![0.0; count]; count];
        for node in 0..self.len() {
            let c = community[node];
            internal[c] += self.internal[node];
            for &(other, weight) in &self.neighbors[node] {
                let d = community[other];
                if c == d {
                    internal[c] += weight;
                } else {
                    weights[c][d] += weight;
                }
            }
        }
        let neighbors = weights
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .enumerate()
                    .filter(|&(_, w)| w > 0.0)
                    .collect()
            })
            .collect();
        Level {
            neighbors,
            internal,
        }
    }
}

/// A clusterer based on the Louvain modularity optimization method.
///
/// Nodes are visited in a random order on every pass, drawn from the injected
/// random source. The resulting partition therefore depends on the seed: the
/// grouping is usually the same between runs and the labels usually are not.
///
/// # Details
///
/// Modularity is evaluated with a resolution parameter `γ`. Values below 1
/// favour larger communities. A node only changes community when the move
/// strictly increases modularity, so isolated pages keep their own cluster.
///
/// # Example
///
/// ```
/// use session_clustering::clusterer::{Clusterer, LouvainClusterer, WeightedGraph};
///
/// let mut clusterer = LouvainClusterer::with_seed(0.5, 42);
/// let graph = WeightedGraph::from_dense(2, vec![0.0, 1.0, 1.0, 0.0]);
/// assert_eq!(clusterer.clusterize(&graph).unwrap(), vec![0, 0]);
/// ```
pub struct LouvainClusterer {
    resolution: f64,
    max_passes: usize,
    rng: StdRng,
}

impl LouvainClusterer {
    pub const DEFAULT_MAX_PASSES: usize = 32;

    /// Creates a clusterer drawing its tie-breaking order from `rng`.
    pub fn new(resolution: f64, max_passes: usize, rng: StdRng) -> LouvainClusterer {
        LouvainClusterer {
            resolution,
            max_passes: max_passes.max(1),
            rng,
        }
    }

    pub fn with_seed(resolution: f64, seed: u64) -> LouvainClusterer {
        Self::new(
            resolution,
            Self::DEFAULT_MAX_PASSES,
            StdRng::seed_from_u64(seed),
        )
    }

    pub fn from_entropy(resolution: f64) -> LouvainClusterer {
        Self::new(resolution, Self::DEFAULT_MAX_PASSES, StdRng::from_entropy())
    }

    /// Moves single nodes between neighboring communities until no move
    /// improves modularity. Returns the community of every node and whether
    /// anything moved.
    fn local_moving(&mut self, level: &Level, total_weight: f64) -> (Vec<usize>, bool) {
        let n = level.len();
        let degrees = level.degrees();
        let mut community: Vec<usize> = (0..n).collect();
        let mut totals = degrees.clone();
        let mut order: Vec<usize> = (0..n).collect();

        let mut link_weight = vec![0.0; n];
        let mut touched: Vec<usize> = Vec::new();
        let mut moved = false;

        for _ in 0..self.max_passes {
            order.shuffle(&mut self.rng);
            let mut improved = false;

            for &node in &order {
                let current = community[node];
                let degree = degrees[node];

                for &(other, weight) in &level.neighbors[node] {
                    let c = community[other];
                    if link_weight[c] == 0.0 {
                        touched.push(c);
                    }
                    link_weight[c] += weight;
                }

                totals[current] -= degree;
                let scale = self.resolution * degree / total_weight;
                let mut best = current;
                let mut best_gain = link_weight[current] - totals[current] * scale;
                for &c in &touched {
                    let gain = link_weight[c] - totals[c] * scale;
                    if gain > best_gain + MIN_GAIN {
                        best = c;
                        best_gain = gain;
                    }
                }
                totals[best] += degree;

                if best != current {
                    community[node] = best;
                    improved = true;
                }

                for c in touched.drain(..) {
                    link_weight[c] = 0.0;
                }
            }

            if !improved {
                break;
            }
            moved = true;
        }
        (community, moved)
    }
}

impl Clusterer for LouvainClusterer {
    fn clusterize(&mut self, graph: &WeightedGraph) -> Result<Partition, ClusteringError> {
        graph.validate()?;

        let n = graph.dimension();
        let mut level = Level::from_graph(graph);
        let total_weight: f64 = level.degrees().iter().sum();
        let mut membership: Vec<usize> = (0..n).collect();
        if total_weight <= 0.0 {
            return Ok(membership);
        }

        loop {
            let (community, moved) = self.local_moving(&level, total_weight);
            let community = compact_labels(&community);
            let count = community.iter().max().map_or(0, |&max| max + 1);
            log::trace!(
                "louvain level with {} nodes produced {} communities",
                level.len(),
                count
            );
            if !moved || count == level.len() {
                break;
            }
            for label in membership.iter_mut() {
                *label = community[*label];
            }
            level = level.aggregate(&community, count);
        }
        Ok(membership)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_from_edges(n: usize, edges: &[(usize, usize, f64)]) -> WeightedGraph {
        let mut weights = vec![0.0; n * n];
        for &(a, b, w) in edges {
            weights[a * n + b] = w;
            weights[b * n + a] = w;
        }
        WeightedGraph::from_dense(n, weights)
    }

    #[test]
    fn empty_graph_gives_empty_partition() {
        let mut clusterer = LouvainClusterer::with_seed(1.0, 1);
        assert!(clusterer.clusterize(&WeightedGraph::empty()).unwrap().is_empty());
    }

    #[test]
    fn single_page_is_one_cluster() {
        let mut clusterer = LouvainClusterer::with_seed(1.0, 1);
        let graph = WeightedGraph::from_dense(1, vec![0.0]);
        assert_eq!(clusterer.clusterize(&graph).unwrap(), vec![0]);
    }

    #[test]
    fn edgeless_pages_stay_apart() {
        let mut clusterer = LouvainClusterer::with_seed(0.5, 9);
        let graph = graph_from_edges(4, &[]);
        assert_eq!(clusterer.clusterize(&graph).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn isolated_page_keeps_its_own_cluster() {
        for seed in 0..50 {
            let mut clusterer = LouvainClusterer::with_seed(0.5, seed);
            let graph = graph_from_edges(4, &[(0, 1, 1.0), (0, 2, 1.0)]);
            let partition = compact_labels(&clusterer.clusterize(&graph).unwrap());
            assert_eq!(partition, vec![0, 0, 0, 1]);
        }
    }

    #[test]
    fn navigation_trees_merge_at_low_resolution() {
        for seed in 0..100 {
            let mut clusterer = LouvainClusterer::with_seed(0.5, seed);
            let graph = graph_from_edges(
                6,
                &[(0, 1, 0.5), (0, 2, 0.5), (3, 4, 0.5), (1, 5, 0.5)],
            );
            let partition = compact_labels(&clusterer.clusterize(&graph).unwrap());
            assert_eq!(partition, vec![0, 0, 0, 1, 1, 0]);
        }
    }

    #[test]
    fn two_cliques_joined_by_a_bridge_split() {
        let mut edges = Vec::new();
        for a in 0..5 {
            for b in a + 1..5 {
                edges.push((a, b, 1.0));
                edges.push((a + 5, b + 5, 1.0));
            }
        }
        edges.push((4, 5, 0.1));
        let graph = graph_from_edges(10, &edges);

        for seed in 0..20 {
            let mut clusterer = LouvainClusterer::with_seed(1.0, seed);
            let partition = compact_labels(&clusterer.clusterize(&graph).unwrap());
            assert_eq!(partition, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1]);
        }
    }

    #[test]
    fn same_seed_gives_same_partition() {
        let graph = graph_from_edges(
            8,
            &[
                (0, 1, 0.3),
                (1, 2, 0.8),
                (2, 3, 0.2),
                (4, 5, 0.9),
                (5, 6, 0.4),
                (6, 7, 0.7),
                (3, 4, 0.1),
            ],
        );
        let first = LouvainClusterer::with_seed(1.0, 77).clusterize(&graph).unwrap();
        let second = LouvainClusterer::with_seed(1.0, 77).clusterize(&graph).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_graph_is_rejected() {
        let mut clusterer = LouvainClusterer::with_seed(1.0, 1);
        let graph = WeightedGraph::from_dense(3, vec![0.0; 4]);
        assert!(matches!(
            clusterer.clusterize(&graph),
            Err(ClusteringError::MalformedGraph { .. })
        ));
    }
}
