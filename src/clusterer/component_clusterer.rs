use crate::clusterer::{compact_labels, Clusterer, Partition, WeightedGraph};
use crate::error::ClusteringError;

/// A vertex in the union-find forest.
struct Vertex {
    /// The parent vertex index in the union-find structure.
    parent: usize,
}

impl Vertex {
    fn new(index: usize) -> Vertex {
        Vertex { parent: index }
    }
}

/// A deterministic clusterer that groups pages joined by any edge heavier
/// than `min_edge_weight`.
///
/// Every connected component of the thresholded graph becomes one cluster,
/// so isolated pages stay on their own. It is also used to compute
/// navigation-only groups, where each component is a browsing tree.
///
/// # Example
///
/// ```
/// use session_clustering::clusterer::{Clusterer, ComponentClusterer, WeightedGraph};
///
/// let graph = WeightedGraph::from_dense(3, vec![0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
/// let partition = ComponentClusterer::default().clusterize(&graph).unwrap();
/// assert_eq!(partition, vec![0, 0, 1]);
/// ```
#[derive(Default)]
pub struct ComponentClusterer {
    vertices: Vec<Vertex>,
    min_edge_weight: f64,
}

impl ComponentClusterer {
    pub fn new(min_edge_weight: f64) -> ComponentClusterer {
        ComponentClusterer {
            vertices: Vec::new(),
            min_edge_weight,
        }
    }

    /// Finds the root of `index` with path compression.
    fn find_set(&mut self, index: usize) -> usize {
        let parent = self.vertices[index].parent;
        if index != parent {
            let root = self.find_set(parent);
            self.vertices[index].parent = root;
            root
        } else {
            parent
        }
    }

    /// Joins the sets of `a` and `b`, keeping the smaller root.
    fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find_set(a);
        let root_b = self.find_set(b);
        if root_a != root_b {
            let (keep, attach) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.vertices[attach].parent = keep;
        }
    }
}

impl Clusterer for ComponentClusterer {
    fn clusterize(&mut self, graph: &WeightedGraph) -> Result<Partition, ClusteringError> {
        graph.validate()?;

        let n = graph.dimension();
        self.vertices = (0..n).map(Vertex::new).collect();
        for row in 0..n {
            for column in row + 1..n {
                if graph.weight(row, column) > self.min_edge_weight {
                    self.union(row, column);
                }
            }
        }

        let roots: Vec<usize> = (0..n).map(|index| self.find_set(index)).collect();
        Ok(compact_labels(&roots))
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
    fn components_become_clusters() {
        let graph = graph_from_edges(6, &[(0, 1, 1.0), (0, 2, 1.0), (3, 4, 1.0), (1, 5, 1.0)]);
        let partition = ComponentClusterer::default().clusterize(&graph).unwrap();
        assert_eq!(partition, vec![0, 0, 0, 1, 1, 0]);
    }

    #[test]
    fn threshold_drops_weak_edges() {
        let graph = graph_from_edges(3, &[(0, 1, 0.9), (1, 2, 0.1)]);
        let partition = ComponentClusterer::new(0.2).clusterize(&graph).unwrap();
        assert_eq!(partition, vec![0, 0, 1]);
    }

    #[test]
    fn empty_and_single_graphs() {
        let mut clusterer = ComponentClusterer::default();
        assert!(clusterer.clusterize(&WeightedGraph::empty()).unwrap().is_empty());
        assert_eq!(
            clusterer
                .clusterize(&WeightedGraph::from_dense(1, vec![0.0]))
                .unwrap(),
            vec![0]
        );
    }
}
