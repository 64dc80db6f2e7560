//! Agglomerative clustering with Ward linkage.
//!
//! Ward merges the pair of clusters whose union increases the within-cluster
//! variance the least:
//!
//! ```text
//! Δ(A,B) = (nₐ × nᵦ)/(nₐ + nᵦ) × ||μₐ - μᵦ||²
//! ```
//!
//! The dendrogram comes from `kodama`, which labels leaves `0..n` and gives the
//! cluster created by merge `i` the id `n + i`. Cutting it at `k` clusters means
//! replaying its first `n - k` merges.

use kodama::{Method, linkage};
use ndarray::Array2;

use super::{ClusteringStrategy, DEFAULT_CLUSTERS, check_rows, squared_distance};
use crate::pipeline::error::Result;

#[derive(Debug, Clone)]
pub struct Ward {
    k: usize,
}

impl Default for Ward {
    fn default() -> Self {
        Self::new(DEFAULT_CLUSTERS)
    }
}

impl Ward {
    pub const NAME: &'static str = "ward";

    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

/// Upper triangle of the pairwise Euclidean distances, row-major.
fn condensed_distances(data: &Array2<f64>) -> Vec<f64> {
    let n = data.nrows();
    let mut condensed = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for a in 0..n {
        for b in (a + 1)..n {
            condensed.push(squared_distance(&data.row(a), &data.row(b)).sqrt());
        }
    }
    condensed
}

impl ClusteringStrategy for Ward {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn n_clusters(&self) -> usize {
        self.k
    }

    fn fit_predict(&self, data: &Array2<f64>) -> Result<Vec<usize>> {
        check_rows(data, self.k)?;

        let n = data.nrows();
        let mut condensed = condensed_distances(data);
        let dendrogram = linkage(&mut condensed, n, Method::Ward);

        let mut clusters: Vec<Option<Vec<usize>>> = (0..n).map(|i| Some(vec![i])).collect();
        for step in dendrogram.steps().iter().take(n - self.k) {
            let mut members = clusters[step.cluster1].take().unwrap_or_default();
            members.extend(clusters[step.cluster2].take().unwrap_or_default());
            clusters.push(Some(members));
        }

        let mut clusters: Vec<Vec<usize>> = clusters.into_iter().flatten().collect();
        // number clusters by the first row that belongs to them
        clusters.sort_by_key(|members| members.iter().copied().min().unwrap_or(usize::MAX));

        let mut labels = vec![0usize; n];
        for (label, members) in clusters.iter().enumerate() {
            for &i in members {
                labels[i] = label;
            }
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::PipelineError;
    use ndarray::array;

    #[test]
    fn merges_nearest_points_first() {
        let data = array![[0.0, 0.0], [10.0, 10.0], [0.2, 0.0], [10.0, 10.3], [5.0, -5.0]];
        let labels = Ward::new(3).fit_predict(&data).unwrap();

        assert_eq!(labels, vec![0, 1, 0, 1, 2]);
    }

    #[test]
    fn labels_follow_first_appearance() {
        let data = array![[9.0], [0.0], [9.1], [0.1]];
        let labels = Ward::new(2).fit_predict(&data).unwrap();
        assert_eq!(labels, vec![0, 1, 0, 1]);
    }

    #[test]
    fn identical_rows_merge_before_anything_else() {
        let data = array![[1.0, 1.0], [1.0, 1.0], [5.0, 5.0], [1.0, 1.0], [1.0, 1.0], [-4.0, 2.0]];
        let labels = Ward::new(3).fit_predict(&data).unwrap();
        assert_eq!(labels, vec![0, 0, 1, 0, 0, 2]);
    }

    #[test]
    fn one_cluster_per_row_keeps_rows_apart() {
        let data = array![[3.0], [1.0], [2.0]];
        assert_eq!(Ward::new(3).fit_predict(&data).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn too_few_rows_is_insufficient_data() {
        let data = array![[0.0], [1.0]];
        assert!(matches!(
            Ward::default().fit_predict(&data),
            Err(PipelineError::InsufficientData(_))
        ));
    }
}
