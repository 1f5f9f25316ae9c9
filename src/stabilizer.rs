//! Label stabilization between successive clustering passes.
//!
//! A clustering pass produces arbitrary labels. Before a partition is shown
//! to the user, its clusters are matched against the clusters of the previous
//! stable partition, so that a topic keeps its label while pages come and go.

use crate::clusterer::{compact_labels, Partition};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};

/// Remaps `raw` onto the labels of `previous`.
///
/// `previous[i]` is the stable label page `i` had after the last pass, or
/// `None` for a page that was never clustered. Both slices are indexed by the
/// current page order and must have the same length.
///
/// Raw clusters and previous clusters are paired greedily by the number of
/// pages they share. Ties go to the smallest previous label, then to the raw
/// cluster whose first page comes first. Raw clusters left without a partner
/// take the smallest labels not already in use, in order of their first page.
///
/// The result depends only on the grouping in `raw`, not on its label values,
/// so label-isomorphic raw partitions always stabilize to the same output.
///
/// # Panics
///
/// Panics if `raw` and `previous` have different lengths.
pub fn stabilize(raw: &[usize], previous: &[Option<usize>]) -> Partition {
    assert_eq!(raw.len(), previous.len());
    let raw = compact_labels(raw);
    let raw_count = raw.iter().max().map_or(0, |&max| max + 1);

    let mut overlap: HashMap<(usize, usize), usize> = HashMap::new();
    for (&cluster, &label) in raw.iter().zip(previous) {
        if let Some(label) = label {
            *overlap.entry((cluster, label)).or_default() += 1;
        }
    }

    let mut candidates: Vec<(usize, usize, usize)> = overlap
        .into_iter()
        .map(|((cluster, label), shared)| (shared, label, cluster))
        .collect();
    candidates.sort_by_key(|&(shared, label, cluster)| (Reverse(shared), label, cluster));

    let mut assigned: Vec<Option<usize>> = vec![None; raw_count];
    let mut used: BTreeSet<usize> = BTreeSet::new();
    for (_, label, cluster) in candidates {
        if assigned[cluster].is_none() && !used.contains(&label) {
            assigned[cluster] = Some(label);
            used.insert(label);
        }
    }

    let mut next_free = 0;
    for slot in assigned.iter_mut().filter(|slot| slot.is_none()) {
        while used.contains(&next_free) {
            next_free += 1;
        }
        *slot = Some(next_free);
        used.insert(next_free);
    }

    raw.iter()
        .map(|&cluster| assigned[cluster].unwrap_or_default())
        .collect()
}

/// Groups page indices by label, ordering members and groups by first
/// index.
pub fn group_indices(partition: &[usize]) -> Vec<Vec<usize>> {
    let mut position: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, &label) in partition.iter().enumerate() {
        let slot = *position.entry(label).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(index);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_pass_uses_smallest_labels() {
        assert_eq!(stabilize(&[4, 4, 9], &[None, None, None]), vec![0, 0, 1]);
    }

    #[test]
    fn relabeled_raw_partition_keeps_previous_labels() {
        let previous = [Some(1), Some(1), Some(0), Some(0)];
        assert_eq!(stabilize(&[5, 5, 2, 2], &previous), vec![1, 1, 0, 0]);
        assert_eq!(stabilize(&[0, 0, 1, 1], &previous), vec![1, 1, 0, 0]);
    }

    #[test]
    fn new_page_joining_a_cluster_takes_its_label() {
        let previous = [Some(0), Some(0), Some(1), None];
        assert_eq!(stabilize(&[3, 3, 8, 8], &previous), vec![0, 0, 1, 1]);
    }

    #[test]
    fn new_cluster_gets_next_unused_label() {
        let previous = [Some(0), Some(2), None];
        assert_eq!(stabilize(&[1, 2, 0], &previous), vec![0, 2, 1]);
    }

    #[test]
    fn split_cluster_keeps_label_on_larger_half() {
        let previous = [Some(0), Some(0), Some(0), Some(0), Some(0)];
        assert_eq!(stabilize(&[1, 0, 0, 0, 1], &previous), vec![1, 0, 0, 0, 1]);
    }

    #[test]
    fn merged_clusters_keep_smallest_label_on_tie() {
        let previous = [Some(3), Some(3), Some(1), Some(1)];
        assert_eq!(stabilize(&[7, 7, 7, 7], &previous), vec![1, 1, 1, 1]);
    }

    #[test]
    fn stabilize_is_idempotent() {
        let raw = [2, 0, 2, 1, 1, 0, 3];
        let previous = [Some(0), Some(1), Some(0), None, Some(2), Some(1), None];
        let first = stabilize(&raw, &previous);
        let second = stabilize(&raw, &previous);
        assert_eq!(first, second);
    }

    #[test]
    fn isomorphic_raw_partitions_stabilize_identically() {
        let previous = [Some(0), Some(1), Some(0), None, Some(2)];
        let a = stabilize(&[0, 1, 0, 2, 2], &previous);
        let b = stabilize(&[9, 4, 9, 6, 6], &previous);
        assert_eq!(a, b);
    }

    #[test]
    fn groups_follow_first_index() {
        assert_eq!(
            group_indices(&[2, 0, 2, 1, 0]),
            vec![vec![0, 2], vec![1, 4], vec![3]]
        );
        assert!(group_indices(&[]).is_empty());
    }
}
