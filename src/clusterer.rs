mod component_clusterer;
mod graph;
mod louvain_clusterer;

use crate::error::ClusteringError;
pub use component_clusterer::ComponentClusterer;
pub use graph::WeightedGraph;
pub use louvain_clusterer::LouvainClusterer;

/// One cluster label per page index. Labels carry no meaning across passes.
pub type Partition = Vec<usize>;

/// A community detection algorithm over a weighted page graph.
///
/// Implementations may be randomized; two calls on the same graph are only
/// required to agree up to label renaming, and occasionally not even that.
pub trait Clusterer: Send {
    fn clusterize(&mut self, graph: &WeightedGraph) -> Result<Partition, ClusteringError>;
}

/// Renumbers `partition` so that labels are `0..k` in order of first
/// occurrence. Two label-isomorphic partitions compact to the same vector.
pub fn compact_labels(partition: &[usize]) -> Partition {
    let mut mapping: Vec<Option<usize>> = Vec::new();
    let mut next = 0;
    partition
        .iter()
        .map(|&label| {
            if label >= mapping.len() {
                mapping.resize(label + 1, None);
            }
            *mapping[label].get_or_insert_with(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}
