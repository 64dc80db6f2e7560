//! Clustering strategies over the reduced feature space.
//!
//! Every strategy implements [`ClusteringStrategy`]: it labels each row with a
//! cluster in `[0, n_clusters)`, and the provided [`ClusteringStrategy::cluster`]
//! turns those labels into a [`ClusterResult`] holding the most populous
//! cluster. Strategies are looked up by name through a [`StrategyRegistry`].
//!
//! | Name     | Strategy                                      |
//! |----------|-----------------------------------------------|
//! | `kmeans` | Lloyd's algorithm with k-means++ seeding      |
//! | `ward`   | Agglomerative clustering with Ward linkage    |

mod kmeans;
mod registry;
mod ward;

use std::fmt;

use ndarray::{Array2, ArrayView1};

pub use kmeans::KMeans;
pub use registry::{StrategyFactory, StrategyRegistry};
pub use ward::Ward;

use super::{
    error::{PipelineError, Result},
    model::TrackId,
    reduce::ReducedMatrix,
};

/// Number of clusters the built-in strategies partition into.
pub const DEFAULT_CLUSTERS: usize = 9;

/// A hard clustering algorithm.
pub trait ClusteringStrategy: fmt::Debug + Send + Sync {
    /// Registry name of the strategy.
    fn name(&self) -> &'static str;

    /// Number of clusters the strategy partitions into.
    fn n_clusters(&self) -> usize;

    /// Labels every row of `data` with a cluster in `[0, n_clusters)`.
    fn fit_predict(&self, data: &Array2<f64>) -> Result<Vec<usize>>;

    /// Clusters `reduced` and selects its most populous cluster.
    fn cluster(&self, reduced: &ReducedMatrix) -> Result<ClusterResult> {
        let labels = self.fit_predict(&reduced.values)?;
        ClusterResult::from_labels(&reduced.row_ids, labels, self.n_clusters())
    }
}

/// The most populous cluster of one clustering run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterResult {
    /// Label of the selected cluster.
    pub label: usize,
    /// Members of the selected cluster, in input row order.
    pub track_ids: Vec<TrackId>,
    /// Label of every input row, in input row order.
    pub labels: Vec<usize>,
    /// Number of rows per label.
    pub sizes: Vec<usize>,
}

impl ClusterResult {
    /// Selects the label with the most rows; the lowest label wins a tie.
    pub fn from_labels(row_ids: &[TrackId], labels: Vec<usize>, n_clusters: usize) -> Result<Self> {
        if row_ids.len() != labels.len() {
            return Err(PipelineError::InvalidInput(format!(
                "{} rows but {} labels",
                row_ids.len(),
                labels.len()
            )));
        }

        let mut sizes = vec![0usize; n_clusters];
        for &label in &labels {
            match sizes.get_mut(label) {
                Some(size) => *size += 1,
                None => {
                    return Err(PipelineError::InvalidInput(format!(
                        "label {} outside of [0, {})",
                        label, n_clusters
                    )));
                }
            }
        }

        let label = most_populous(&sizes).ok_or_else(|| {
            PipelineError::InsufficientData("no rows were assigned to a cluster".to_string())
        })?;

        let track_ids = row_ids
            .iter()
            .zip(&labels)
            .filter(|(_, l)| **l == label)
            .map(|(id, _)| id.clone())
            .collect();

        Ok(Self {
            label,
            track_ids,
            labels,
            sizes,
        })
    }

    pub fn len(&self) -> usize {
        self.track_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.track_ids.is_empty()
    }
}

/// Index of the largest count; the first one on ties, `None` when all are zero.
fn most_populous(sizes: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (label, &size) in sizes.iter().enumerate() {
        if size > 0 && best.is_none_or(|(_, b)| size > b) {
            best = Some((label, size));
        }
    }
    best.map(|(label, _)| label)
}

fn check_rows(data: &Array2<f64>, n_clusters: usize) -> Result<()> {
    if n_clusters == 0 {
        return Err(PipelineError::Configuration(
            "cluster count must be at least 1".to_string(),
        ));
    }
    if data.nrows() < n_clusters {
        return Err(PipelineError::InsufficientData(format!(
            "cannot create {} clusters from {} tracks",
            n_clusters,
            data.nrows()
        )));
    }
    Ok(())
}

fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<TrackId> {
        (0..n).map(|i| format!("t{i}")).collect()
    }

    #[test]
    fn selects_largest_cluster() {
        let result = ClusterResult::from_labels(&ids(6), vec![1, 0, 1, 2, 1, 0], 3).unwrap();
        assert_eq!(result.label, 1);
        assert_eq!(result.track_ids, vec!["t0", "t2", "t4"]);
        assert_eq!(result.sizes, vec![2, 3, 1]);
    }

    #[test]
    fn tie_goes_to_lowest_label() {
        let result = ClusterResult::from_labels(&ids(4), vec![2, 1, 2, 1], 3).unwrap();
        assert_eq!(result.label, 1);
        assert_eq!(result.track_ids, vec!["t1", "t3"]);
    }

    #[test]
    fn rejects_out_of_range_label() {
        assert!(matches!(
            ClusterResult::from_labels(&ids(2), vec![0, 3], 3),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_length_mismatch() {
        assert!(matches!(
            ClusterResult::from_labels(&ids(3), vec![0, 1], 2),
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
