//! Incremental clustering of browsing sessions.
//!
//! Pages visited during a session are grouped into topic clusters, and the
//! grouping is recomputed after every visit or removal. Two similarity
//! matrices are maintained side by side: navigation edges between a page and
//! the page it was opened from, and text similarity scores supplied by a
//! [`TextSimilarity`] collaborator. They are combined into one weighted graph,
//! partitioned by a [`clusterer::Clusterer`], and the fresh labels are mapped
//! onto the previous ones by the [`stabilizer`] so clusters keep their
//! identity from one pass to the next.
//!
//! All mutations go through a [`Coordinator`], which owns one session and
//! processes requests one at a time on a dedicated worker thread.
//!
//! # Example
//!
//! ```
//! use session_clustering::{ClusteringConfig, Coordinator, NoTextSimilarity, Page};
//!
//! let coordinator = Coordinator::new(ClusteringConfig::default(), NoTextSimilarity).unwrap();
//! let groups = futures::executor::block_on(async {
//!     coordinator.add_async(Page::new(0)).unwrap().await.unwrap();
//!     coordinator.add_async(Page::new(1).with_parent(0)).unwrap().await
//! })
//! .unwrap();
//! assert_eq!(groups, vec![vec![0, 1]]);
//! ```

pub use combiner::{CombinationPolicy, GraphCombiner};
pub use config::{Algorithm, ClusteringConfig};
pub use coordinator::{Completion, Coordinator};
pub use error::{ClusteringError, ConfigError, CoordinatorError, ValidationError};
pub use matrix::SimilarityMatrix;
pub use scorer::{NoTextSimilarity, TextSimilarity};
pub use session::{PageSnapshot, SessionSnapshot};

pub mod clusterer;
mod combiner;
mod config;
mod coordinator;
mod error;
mod matrix;
mod scorer;
mod session;
pub mod stabilizer;

/// Caller-assigned identifier of a tracked page.
pub type PageId = u64;

/// Clusters of page ids, ordered by the insertion order of their members.
pub type PageGroups = Vec<Vec<PageId>>;

/// A visited page handed to the clustering session.
///
/// Pages are never edited in place: a changed page is removed and added
/// again.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    pub id: PageId,
    /// The page this one was navigated from, if it is still tracked.
    pub parent_id: Option<PageId>,
    pub title: Option<String>,
    pub content: Option<String>,
}

impl Page {
    pub fn new(id: PageId) -> Page {
        Page {
            id,
            ..Page::default()
        }
    }

    pub fn with_parent(mut self, parent_id: PageId) -> Page {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Page {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Page {
        self.content = Some(content.into());
        self
    }
}
