//! Standardization and principal component projection.
//!
//! The projection is computed from the eigendecomposition of the covariance
//! matrix of the standardized features, solved by `linfa-linalg`'s dense
//! symmetric eigensolver. It draws no random numbers, so the same matrix always
//! yields the same components.

use linfa_linalg::eigh::Eigh;
use ndarray::{Array1, Array2};

use super::{
    encoder::FeatureMatrix,
    error::{PipelineError, Result},
    model::TrackId,
};

/// Upper bound on the number of principal components kept.
pub const MAX_COMPONENTS: usize = 10;

/// Feature matrix projected onto its principal components.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedMatrix {
    pub row_ids: Vec<TrackId>,
    pub values: Array2<f64>,
    /// Variance captured by each kept component, in descending order.
    pub explained_variance: Vec<f64>,
}

impl ReducedMatrix {
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reducer {
    max_components: usize,
}

impl Default for Reducer {
    fn default() -> Self {
        Self {
            max_components: MAX_COMPONENTS,
        }
    }
}

impl Reducer {
    pub fn new(max_components: usize) -> Self {
        Self { max_components }
    }

    pub fn max_components(&self) -> usize {
        self.max_components
    }

    /// Standardizes `matrix` and projects it onto at most `max_components`
    /// principal components.
    pub fn reduce(&self, matrix: &FeatureMatrix) -> Result<ReducedMatrix> {
        if matrix.nrows() == 0 {
            return Err(PipelineError::InsufficientData(
                "cannot reduce a matrix without rows".to_string(),
            ));
        }
        if matrix.ncols() == 0 {
            return Err(PipelineError::InsufficientData(
                "cannot reduce a matrix without columns".to_string(),
            ));
        }

        let scaled = standardize(&matrix.values);
        let n_components = self.max_components.min(scaled.ncols());

        // sample covariance; the columns are already centred
        let denom = scaled.nrows().saturating_sub(1).max(1) as f64;
        let covariance = scaled.t().dot(&scaled) / denom;
        let (eigenvalues, eigenvectors) = covariance.eigh().map_err(|e| {
            PipelineError::InvalidInput(format!("covariance eigendecomposition failed: {e}"))
        })?;

        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        // stable sort keeps the lower index first on equal eigenvalues
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));
        order.truncate(n_components);

        let mut components = Array2::<f64>::zeros((scaled.ncols(), n_components));
        for (target, &source) in order.iter().enumerate() {
            let mut column = eigenvectors.column(source).to_owned();
            normalize_sign(&mut column);
            components.column_mut(target).assign(&column);
        }

        Ok(ReducedMatrix {
            row_ids: matrix.row_ids.clone(),
            values: scaled.dot(&components),
            explained_variance: order.iter().map(|&i| eigenvalues[i].max(0.0)).collect(),
        })
    }
}

/// Shifts every column to zero mean and scales it to unit population variance.
///
/// Constant columns have no spread to scale by and come out as all zeros.
pub fn standardize(values: &Array2<f64>) -> Array2<f64> {
    let n = values.nrows();
    let mut scaled = values.clone();
    if n == 0 {
        return scaled;
    }

    for mut column in scaled.columns_mut() {
        let first = column[0];
        if column.iter().all(|&x| x == first) {
            column.fill(0.0);
            continue;
        }

        let mean = column.sum() / n as f64;
        let variance = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        let std_dev = variance.sqrt();

        if std_dev > 0.0 {
            column.mapv_inplace(|x| (x - mean) / std_dev);
        } else {
            column.fill(0.0);
        }
    }

    scaled
}

/// Flips `component` so that its largest-magnitude loading is positive.
fn normalize_sign(component: &mut Array1<f64>) {
    let mut pivot = 0.0_f64;
    for &x in component.iter() {
        if x.abs() > pivot.abs() {
            pivot = x;
        }
    }
    if pivot < 0.0 {
        component.mapv_inplace(|x| -x);
    }
}
