use crate::structs::{
    ClusterLabels, ClusterMethod, Clusterer, ClusteringConfig, DataMatrix, Result, RunError,
    NOISE_LABEL,
};
use linfa::traits::{Fit, Predict, Transformer};
use linfa::DatasetBase;
use linfa::ParamGuard;
use linfa_clustering::{Dbscan, KMeans};
use log::{debug, info};
use ndarray::{Array1, Array2};
use rayon::prelude::*;

/// Clusterer backed by `linfa-clustering`
#[derive(Debug, Clone, Default)]
pub struct LinfaClusterer {
    config: ClusteringConfig,
}

impl LinfaClusterer {
    #[must_use]
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    fn cluster_in_pool(&self, data: &Array2<f64>) -> Result<ClusterLabels> {
        match self.config.method {
            ClusterMethod::KMeans => {
                let k = if self.config.clusters == 0 {
                    let k = suggest_k(data.nrows(), self.config.max_clusters);
                    info!("Using k={k} (auto)");
                    k
                } else {
                    self.config.clusters
                };
                kmeans(data, k)
            }
            ClusterMethod::Dbscan => {
                let min_points = self.config.dbscan_min_points;
                let eps = if self.config.dbscan_eps <= 0.0 {
                    let eps = estimate_epsilon(data, min_points);
                    info!("Using DBSCAN eps={eps:.4} (k-distance estimate)");
                    eps
                } else {
                    self.config.dbscan_eps
                };
                dbscan(data, eps, min_points)
            }
        }
    }
}

impl Clusterer for LinfaClusterer {
    fn cluster(&self, matrix: &DataMatrix, concurrency: Option<usize>) -> Result<ClusterLabels> {
        if matrix.n_rows() == 0 {
            return Err(RunError::ClusteringFailed("Input matrix has no rows".into()));
        }
        if matrix.n_columns() == 0 {
            return Err(RunError::ClusteringFailed(
                "Input matrix has no columns".into(),
            ));
        }

        let data = if self.config.scale {
            matrix.min_max_scaled().values
        } else {
            matrix.values.clone()
        };

        let pool = worker_pool(concurrency)?;
        info!(
            "Clustering {} rows x {} columns with {} on {} worker(s)",
            matrix.n_rows(),
            matrix.n_columns(),
            self.config.method.display_name(),
            pool.current_num_threads()
        );

        let labels = pool.install(|| self.cluster_in_pool(&data))?;

        if labels.len() != matrix.n_rows() {
            return Err(RunError::ClusteringFailed(format!(
                "Backend returned {} labels for {} rows",
                labels.len(),
                matrix.n_rows()
            )));
        }
        Ok(labels)
    }

    fn name(&self) -> &str {
        self.config.method.display_name()
    }
}

/// Dedicated pool sized by the concurrency hint (`None` = all logical CPUs)
fn worker_pool(concurrency: Option<usize>) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.unwrap_or(0))
        .thread_name(|i| format!("markerclust-worker-{i}"))
        .build()
        .map_err(|e| RunError::ClusteringFailed(format!("Failed to create worker pool: {e}")))
}

/// Perform K-means clustering
///
/// # Errors
/// Returns error if clustering fails
pub fn kmeans(data: &Array2<f64>, k: usize) -> Result<ClusterLabels> {
    let n_samples = data.nrows();

    if k == 0 {
        return Err(RunError::ClusteringFailed("k must be at least 1".into()));
    }

    if n_samples < k {
        return Err(RunError::ClusteringFailed(format!(
            "Cannot create {k} clusters with only {n_samples} samples"
        )));
    }

    let dataset = DatasetBase::from(data.clone());

    let model = KMeans::params(k)
        .max_n_iterations(100)
        .tolerance(1e-4)
        .fit(&dataset)
        .map_err(|e| RunError::ClusteringFailed(format!("K-means failed: {e}")))?;

    debug!("K-means inertia: {:.4}", model.inertia());

    let predictions: Array1<usize> = model.predict(data);
    predictions
        .iter()
        .map(|&c| {
            i64::try_from(c)
                .map_err(|_| RunError::ClusteringFailed(format!("Cluster id {c} overflows")))
        })
        .collect::<Result<Vec<_>>>()
        .map(ClusterLabels::from)
}

/// Suggest k from the sample count: sqrt(n), clamped to [2, min(max_k, n)]
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn suggest_k(n_samples: usize, max_k: usize) -> usize {
    let max_k = max_k.min(n_samples).max(1);
    if max_k < 2 {
        return max_k;
    }

    let suggested = (n_samples as f64).sqrt().round() as usize;
    suggested.clamp(2, max_k)
}

/// Estimate a good epsilon for DBSCAN using k-distance heuristic
///
/// Computes the k-th nearest neighbor distance for each point in parallel,
/// sorts them, and picks the "knee" (point of max curvature).
#[must_use]
pub fn estimate_epsilon(data: &Array2<f64>, min_points: usize) -> f64 {
    let n = data.nrows();
    if min_points == 0 || n < min_points + 1 {
        return 0.5;
    }

    // k-th nearest neighbor (0-indexed, so min_points - 1)
    let k_idx = min_points - 1;

    let mut k_distances: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|i| {
            let point = data.row(i);
            let mut distances: Vec<f64> = data
                .rows()
                .into_iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, other)| {
                    point
                        .iter()
                        .zip(other.iter())
                        .map(|(a, b)| (a - b).powi(2))
                        .sum::<f64>()
                        .sqrt()
                })
                .collect();
            distances.sort_by(f64::total_cmp);
            distances[k_idx.min(distances.len() - 1)]
        })
        .collect();

    k_distances.sort_by(f64::total_cmp);

    if k_distances.len() < 3 {
        return k_distances.last().copied().unwrap_or(0.5);
    }

    // Knee: maximum second difference, defaulting to the 90th percentile
    let mut max_diff = 0.0f64;
    let mut knee_idx = k_distances.len() * 9 / 10;

    for i in 1..k_distances.len() - 1 {
        let second_deriv =
            (k_distances[i + 1] - k_distances[i]) - (k_distances[i] - k_distances[i - 1]);
        if second_deriv > max_diff {
            max_diff = second_deriv;
            knee_idx = i;
        }
    }

    k_distances[knee_idx]
}

/// Run DBSCAN clustering. Noise points get [`NOISE_LABEL`].
///
/// # Errors
/// Returns error if clustering fails
pub fn dbscan(data: &Array2<f64>, epsilon: f64, min_points: usize) -> Result<ClusterLabels> {
    let n_samples = data.nrows();

    if n_samples < min_points {
        return Err(RunError::ClusteringFailed(format!(
            "Need at least {min_points} samples for DBSCAN, got {n_samples}"
        )));
    }

    let params = Dbscan::params(min_points)
        .tolerance(epsilon)
        .check()
        .map_err(|e| RunError::ClusteringFailed(format!("DBSCAN params invalid: {e}")))?;

    let clusters = params.transform(data);

    clusters
        .iter()
        .map(|label| match label {
            Some(c) => i64::try_from(*c)
                .map_err(|_| RunError::ClusteringFailed(format!("Cluster id {c} overflows"))),
            None => Ok(NOISE_LABEL),
        })
        .collect::<Result<Vec<_>>>()
        .map(ClusterLabels::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> DataMatrix {
        DataMatrix::from_rows(&[
            vec![1.0, 1.0],
            vec![1.1, 1.1],
            vec![0.9, 0.9],
            vec![1.0, 1.2],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
            vec![9.9, 9.9],
            vec![10.0, 10.2],
        ])
        .expect("matrix")
    }

    fn assert_blobs_separated(labels: &ClusterLabels) {
        let l = labels.as_slice();
        assert_eq!(l.len(), 8);
        assert!(l[..4].iter().all(|&x| x == l[0]));
        assert!(l[4..].iter().all(|&x| x == l[4]));
        assert_ne!(l[0], l[4]);
    }

    #[test]
    fn test_kmeans_clustering() {
        let clusterer = LinfaClusterer::new(ClusteringConfig {
            clusters: 2,
            ..ClusteringConfig::default()
        });
        let labels = clusterer.cluster(&two_blobs(), Some(1)).expect("run kmeans");

        assert_blobs_separated(&labels);
        assert_eq!(labels.n_clusters(), 2);
    }

    #[test]
    fn test_kmeans_all_workers() {
        let clusterer = LinfaClusterer::new(ClusteringConfig {
            clusters: 2,
            scale: true,
            ..ClusteringConfig::default()
        });
        let labels = clusterer.cluster(&two_blobs(), None).expect("run kmeans");
        assert_eq!(labels.len(), 8);
    }

    #[test]
    fn test_kmeans_too_many_clusters() {
        let clusterer = LinfaClusterer::new(ClusteringConfig {
            clusters: 9,
            ..ClusteringConfig::default()
        });
        let err = clusterer.cluster(&two_blobs(), Some(1)).unwrap_err();
        assert!(matches!(err, RunError::ClusteringFailed(_)));
    }

    #[test]
    fn test_dbscan() {
        let clusterer = LinfaClusterer::new(ClusteringConfig {
            method: ClusterMethod::Dbscan,
            dbscan_eps: 0.5,
            dbscan_min_points: 3,
            ..ClusteringConfig::default()
        });
        let labels = clusterer.cluster(&two_blobs(), Some(2)).expect("dbscan");

        assert_blobs_separated(&labels);
        assert_eq!(labels.n_noise(), 0);
    }

    #[test]
    fn test_dbscan_marks_noise() {
        let mut rows: Vec<Vec<f64>> = (0..8u8)
            .map(|i| vec![f64::from(i) * 0.01, 0.0])
            .collect();
        rows.push(vec![50.0, 50.0]);
        let matrix = DataMatrix::from_rows(&rows).expect("matrix");

        let labels = dbscan(&matrix.values, 0.5, 3).expect("dbscan");
        assert_eq!(labels.as_slice()[8], NOISE_LABEL);
        assert_eq!(labels.n_noise(), 1);
    }

    #[test]
    fn test_empty_inputs_fail() {
        let clusterer = LinfaClusterer::default();
        let no_rows = DataMatrix::new(Array2::zeros((0, 3)));
        let no_cols = DataMatrix::new(Array2::zeros((4, 0)));

        assert!(matches!(
            clusterer.cluster(&no_rows, None),
            Err(RunError::ClusteringFailed(_))
        ));
        assert!(matches!(
            clusterer.cluster(&no_cols, None),
            Err(RunError::ClusteringFailed(_))
        ));
    }

    #[test]
    fn test_suggest_k() {
        assert_eq!(suggest_k(100, 20), 10);
        assert_eq!(suggest_k(10_000, 20), 20);
        assert_eq!(suggest_k(3, 20), 2);
        assert_eq!(suggest_k(1, 20), 1);
    }

    #[test]
    fn test_estimate_epsilon() {
        let eps = estimate_epsilon(&two_blobs().values, 3);
        assert!(eps > 0.0);
        assert!(eps < 10.0);
    }
}
