//! K-means clustering.
//!
//! Lloyd's algorithm seeded with k-means++: the first centroid is a random
//! row, each further centroid is drawn with probability proportional to its
//! squared distance from the nearest centroid chosen so far. The whole run,
//! restarts included, draws from a single RNG seeded with a fixed value, so
//! identical input always produces identical labels.
//!
//! Rows that coincide always share a label: assignment picks the lowest
//! centroid index among equally near centroids, and coinciding rows see the
//! same distances.

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{ClusteringStrategy, DEFAULT_CLUSTERS, check_rows, squared_distance};
use crate::pipeline::error::Result;

#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iter: usize,
    tol: f64,
    n_init: usize,
    seed: u64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(DEFAULT_CLUSTERS)
    }
}

impl KMeans {
    pub const NAME: &'static str = "kmeans";

    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 300,
            tol: 1e-4,
            n_init: 10,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of independently seeded runs; the one with the lowest inertia wins.
    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Convergence tolerance, relative to the mean column variance of the data.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    fn init_centroids(&self, data: &Array2<f64>, rng: &mut StdRng) -> Array2<f64> {
        let n = data.nrows();
        let mut centroids = Array2::<f64>::zeros((self.k, data.ncols()));

        let first = rng.random_range(0..n);
        centroids.row_mut(0).assign(&data.row(first));

        let mut nearest: Vec<f64> = (0..n)
            .map(|j| squared_distance(&data.row(j), &centroids.row(0)))
            .collect();

        for c in 1..self.k {
            let total: f64 = nearest.iter().sum();
            let selected = if total > 0.0 {
                let threshold = rng.random::<f64>() * total;
                let mut cumsum = 0.0;
                let mut selected = None;
                for (j, &d) in nearest.iter().enumerate() {
                    if d <= 0.0 {
                        continue;
                    }
                    cumsum += d;
                    selected = Some(j);
                    if cumsum >= threshold {
                        break;
                    }
                }
                selected.unwrap_or(0)
            } else {
                // every row coincides with a centroid already
                rng.random_range(0..n)
            };

            centroids.row_mut(c).assign(&data.row(selected));
            for (j, d) in nearest.iter_mut().enumerate() {
                *d = d.min(squared_distance(&data.row(j), &centroids.row(c)));
            }
        }

        centroids
    }

    /// Assigns each row to its nearest centroid, returning the squared distances.
    fn assign(data: &Array2<f64>, centroids: &Array2<f64>, labels: &mut [usize]) -> Vec<f64> {
        let mut distances = vec![0.0; labels.len()];
        for (i, label) in labels.iter_mut().enumerate() {
            let row = data.row(i);
            let mut best_cluster = 0;
            let mut best_dist = f64::MAX;
            for (c, centroid) in centroids.rows().into_iter().enumerate() {
                let dist = squared_distance(&row, &centroid);
                if dist < best_dist {
                    best_dist = dist;
                    best_cluster = c;
                }
            }
            *label = best_cluster;
            distances[i] = best_dist;
        }
        distances
    }

    fn run_once(&self, data: &Array2<f64>, tol: f64, rng: &mut StdRng) -> (Vec<usize>, f64) {
        let n = data.nrows();
        let d = data.ncols();
        let mut centroids = self.init_centroids(data, rng);
        let mut labels = vec![0usize; n];

        for _ in 0..self.max_iter {
            let mut distances = Self::assign(data, &centroids, &mut labels);

            let mut sums = Array2::<f64>::zeros((self.k, d));
            let mut counts = vec![0usize; self.k];
            for (i, &label) in labels.iter().enumerate() {
                let mut sum = sums.row_mut(label);
                sum += &data.row(i);
                counts[label] += 1;
            }

            for c in 0..self.k {
                if counts[c] > 0 {
                    continue;
                }
                // move the farthest row of a shared cluster into the empty one
                let candidate = (0..n)
                    .filter(|&i| distances[i] > 0.0 && counts[labels[i]] > 1)
                    .fold(None, |best: Option<usize>, i| match best {
                        Some(b) if distances[b] >= distances[i] => Some(b),
                        _ => Some(i),
                    });
                if let Some(i) = candidate {
                    let old = labels[i];
                    let mut old_sum = sums.row_mut(old);
                    old_sum -= &data.row(i);
                    counts[old] -= 1;
                    sums.row_mut(c).assign(&data.row(i));
                    counts[c] = 1;
                    labels[i] = c;
                    distances[i] = 0.0;
                }
            }

            let mut new_centroids = centroids.clone();
            for c in 0..self.k {
                if counts[c] > 0 {
                    let mean = &sums.row(c) / counts[c] as f64;
                    new_centroids.row_mut(c).assign(&mean);
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(new_centroids.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            centroids = new_centroids;

            if shift <= tol {
                break;
            }
        }

        let distances = Self::assign(data, &centroids, &mut labels);
        (labels, distances.iter().sum())
    }
}

/// Mean of the per-column variances, the scale the tolerance is relative to.
fn mean_variance(data: &Array2<f64>) -> f64 {
    let n = data.nrows() as f64;
    let variances: Array1<f64> = data
        .columns()
        .into_iter()
        .map(|col| {
            let mean = col.sum() / n;
            col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
        })
        .collect();
    if variances.is_empty() {
        0.0
    } else {
        variances.sum() / variances.len() as f64
    }
}

impl ClusteringStrategy for KMeans {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn n_clusters(&self) -> usize {
        self.k
    }

    fn fit_predict(&self, data: &Array2<f64>) -> Result<Vec<usize>> {
        check_rows(data, self.k)?;

        let tol = self.tol * mean_variance(data);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(Vec<usize>, f64)> = None;

        for _ in 0..self.n_init {
            let (labels, inertia) = self.run_once(data, tol, &mut rng);
            if best.as_ref().is_none_or(|(_, b)| inertia < *b) {
                best = Some((labels, inertia));
            }
        }

        Ok(best.map(|(labels, _)| labels).unwrap_or_default())
    }
}
