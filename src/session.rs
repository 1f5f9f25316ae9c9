use crate::clusterer::{Clusterer, ComponentClusterer, Partition, WeightedGraph};
use crate::combiner::{CombinationPolicy, GraphCombiner};
use crate::error::{ClusteringError, CoordinatorError, ValidationError};
use crate::matrix::SimilarityMatrix;
use crate::scorer::{sanitize_score, TextSimilarity};
use crate::stabilizer::{group_indices, stabilize};
use crate::{Page, PageGroups, PageId};
use std::collections::HashMap;

/// A page as seen by the last clustering pass.
#[derive(Clone, Debug, PartialEq)]
pub struct PageSnapshot {
    pub id: PageId,
    pub parent_id: Option<PageId>,
    /// Stable cluster label.
    pub group: usize,
    /// Label of the navigation tree the page belongs to, ignoring text.
    pub navigation_group: usize,
}

/// A copy of the session state, for export and inspection.
#[derive(Clone, Debug)]
pub struct SessionSnapshot {
    /// Tracked pages in insertion order.
    pub pages: Vec<PageSnapshot>,
    combined: WeightedGraph,
    positions: HashMap<PageId, usize>,
}

impl SessionSnapshot {
    pub fn dimension(&self) -> usize {
        self.pages.len()
    }

    /// Combined edge weight between two tracked pages.
    pub fn similarity(&self, a: PageId, b: PageId) -> Option<f64> {
        let a = *self.positions.get(&a)?;
        let b = *self.positions.get(&b)?;
        Some(self.combined.weight(a, b))
    }

    pub fn groups(&self) -> PageGroups {
        let labels: Vec<usize> = self.pages.iter().map(|page| page.group).collect();
        group_indices(&labels)
            .into_iter()
            .map(|group| group.into_iter().map(|i| self.pages[i].id).collect())
            .collect()
    }
}

/// The clustering state of one browsing session.
///
/// Owned by the coordinator worker; every method runs to completion and
/// leaves the state untouched when it fails.
pub(crate) struct Session {
    navigation: SimilarityMatrix,
    text: SimilarityMatrix,
    /// Tracked pages in index order.
    pages: Vec<Page>,
    positions: HashMap<PageId, usize>,
    /// Last stable label of every page, in index order.
    stable: Partition,
    combiner: GraphCombiner,
    clusterer: Box<dyn Clusterer>,
    scorer: Box<dyn TextSimilarity>,
}

impl Session {
    pub fn new(
        combiner: GraphCombiner,
        clusterer: Box<dyn Clusterer>,
        scorer: Box<dyn TextSimilarity>,
    ) -> Session {
        Session {
            navigation: SimilarityMatrix::new(),
            text: SimilarityMatrix::new(),
            pages: Vec::new(),
            positions: HashMap::new(),
            stable: Vec::new(),
            combiner,
            clusterer,
            scorer,
        }
    }

    pub fn dimension(&self) -> usize {
        self.pages.len()
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn add(&mut self, page: Page) -> Result<PageGroups, CoordinatorError> {
        if self.positions.contains_key(&page.id) {
            return Err(ValidationError::DuplicateId(page.id).into());
        }
        let index = self.dimension();

        let mut navigation_row = vec![0.0; index];
        if let Some(&parent) = page
            .parent_id
            .filter(|&parent| parent != page.id)
            .and_then(|parent| self.positions.get(&parent))
        {
            navigation_row[parent] = 1.0;
        }

        let text_row: Vec<f64> = self
            .scorer
            .score(&page, &self.pages)
            .into_iter()
            .map(|score| {
                let clamped = sanitize_score(score);
                if clamped != score {
                    log::warn!("text score {score} for page {} clamped to {clamped}", page.id);
                }
                clamped
            })
            .collect();
        if text_row.len() != index {
            return Err(ValidationError::DimensionMismatch {
                expected: index,
                actual: text_row.len(),
            }
            .into());
        }

        self.navigation.add_page(&navigation_row)?;
        if let Err(e) = self.text.add_page(&text_row) {
            self.navigation.remove_page(index)?;
            return Err(e.into());
        }

        let previous: Vec<Option<usize>> = self
            .stable
            .iter()
            .copied()
            .map(Some)
            .chain(std::iter::once(None))
            .collect();
        match self.recluster(&previous) {
            Ok(stable) => {
                self.positions.insert(page.id, index);
                self.pages.push(page);
                self.stable = stable;
                Ok(self.groups())
            }
            Err(e) => {
                self.navigation.remove_page(index)?;
                self.text.remove_page(index)?;
                Err(e)
            }
        }
    }

    pub fn remove(&mut self, id: PageId) -> Result<PageGroups, CoordinatorError> {
        let index = *self
            .positions
            .get(&id)
            .ok_or(ValidationError::UnknownId(id))?;

        let navigation_row = self.navigation.remove_page(index)?;
        let text_row = match self.text.remove_page(index) {
            Ok(row) => row,
            Err(e) => {
                self.navigation.insert_page(index, &navigation_row)?;
                return Err(e.into());
            }
        };

        let previous: Vec<Option<usize>> = self
            .stable
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != index)
            .map(|(_, &label)| Some(label))
            .collect();
        match self.recluster(&previous) {
            Ok(stable) => {
                self.pages.remove(index);
                self.positions.remove(&id);
                for position in self.positions.values_mut() {
                    if *position > index {
                        *position -= 1;
                    }
                }
                self.stable = stable;
                Ok(self.groups())
            }
            Err(e) => {
                self.navigation.insert_page(index, &navigation_row)?;
                self.text.insert_page(index, &text_row)?;
                Err(e)
            }
        }
    }

    /// Switches the combination weights and clusters the current pages again.
    pub fn reconfigure(
        &mut self,
        policy: CombinationPolicy,
    ) -> Result<PageGroups, CoordinatorError> {
        policy.validate()?;
        let old_policy = *self.combiner.policy();
        self.combiner.set_policy(policy);

        let previous: Vec<Option<usize>> = self.stable.iter().copied().map(Some).collect();
        match self.recluster(&previous) {
            Ok(stable) => {
                self.stable = stable;
                Ok(self.groups())
            }
            Err(e) => {
                self.combiner.set_policy(old_policy);
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot, CoordinatorError> {
        let n = self.dimension();
        let navigation_graph = WeightedGraph::from_dense(n, self.navigation.to_dense());
        let navigation_groups = ComponentClusterer::default().clusterize(&navigation_graph)?;
        let combined = self.combiner.combine(&self.navigation, &self.text)?;

        let pages = self
            .pages
            .iter()
            .enumerate()
            .map(|(i, page)| PageSnapshot {
                id: page.id,
                parent_id: page.parent_id,
                group: self.stable[i],
                navigation_group: navigation_groups[i],
            })
            .collect();
        Ok(SessionSnapshot {
            pages,
            combined,
            positions: self.positions.clone(),
        })
    }

    /// Clusters the matrices as they are now and stabilizes the result
    /// against `previous`. Nothing is committed.
    fn recluster(&mut self, previous: &[Option<usize>]) -> Result<Partition, CoordinatorError> {
        let graph = self.combiner.combine(&self.navigation, &self.text)?;
        let raw = self.clusterer.clusterize(&graph)?;
        if raw.len() != graph.dimension() || previous.len() != graph.dimension() {
            return Err(ClusteringError::PartitionLength {
                expected: graph.dimension(),
                actual: raw.len(),
            }
            .into());
        }
        Ok(stabilize(&raw, previous))
    }

    fn groups(&self) -> PageGroups {
        group_indices(&self.stable)
            .into_iter()
            .map(|group| group.into_iter().map(|i| self.pages[i].id).collect())
            .collect()
    }
}
