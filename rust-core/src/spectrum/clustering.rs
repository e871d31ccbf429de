//! Clustering capability used to group transformed frequencies into bands

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::error::{CostsError, Result};

/// Builds a clustering model for a given number of clusters
pub trait ClusteringMethod {
    type Model: ClusterModel;

    fn build(&self, n_clusters: usize) -> Result<Self::Model>;
}

/// A clustering model over single-feature points
pub trait ClusterModel {
    /// Fit `points` (n_points x 1) and return one label in `0..n_clusters` per point
    fn fit_predict(&mut self, points: ArrayView2<'_, f64>) -> Result<Array1<usize>>;

    /// Centroid value of each cluster, indexed by label
    fn centroids(&self) -> Array1<f64>;
}

/// Fit `values` with a model from `method` and check the output contract
pub fn fit_clusters<M: ClusteringMethod>(
    method: &M,
    n_clusters: usize,
    values: ArrayView1<'_, f64>,
) -> Result<(Array1<usize>, Array1<f64>)> {
    let mut model = method.build(n_clusters)?;
    let points = values.insert_axis(ndarray::Axis(1));
    let labels = model.fit_predict(points)?;
    let centroids = model.centroids();

    if labels.len() != values.len() {
        return Err(CostsError::config(format!(
            "clustering returned {} labels for {} points",
            labels.len(),
            values.len()
        )));
    }
    if centroids.len() != n_clusters {
        return Err(CostsError::config(format!(
            "clustering returned {} centroids for {n_clusters} clusters",
            centroids.len()
        )));
    }
    if labels.iter().any(|&l| l >= n_clusters) {
        return Err(CostsError::config("clustering returned a label outside the cluster range"));
    }

    Ok((labels, centroids))
}

/// k-means over the transformed frequencies
///
/// Backed by `linfa_clustering` with k-means++ seeding from a fixed-seed RNG,
/// so the result is deterministic for a given input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeans {
    pub max_iter: u64,
    pub n_runs: usize,
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            max_iter: 300,
            n_runs: 10,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

impl ClusteringMethod for KMeans {
    type Model = KMeansModel;

    fn build(&self, n_clusters: usize) -> Result<KMeansModel> {
        if n_clusters == 0 {
            return Err(CostsError::config("number of clusters must be positive"));
        }
        Ok(KMeansModel {
            n_clusters,
            params: *self,
            centroids: Array1::zeros(n_clusters),
        })
    }
}

#[derive(Debug, Clone)]
pub struct KMeansModel {
    n_clusters: usize,
    params: KMeans,
    centroids: Array1<f64>,
}

impl ClusterModel for KMeansModel {
    fn fit_predict(&mut self, points: ArrayView2<'_, f64>) -> Result<Array1<usize>> {
        if points.ncols() != 1 {
            return Err(CostsError::config(format!(
                "k-means expects single-feature points, got {} features",
                points.ncols()
            )));
        }
        if points.nrows() < self.n_clusters {
            return Err(CostsError::config(format!(
                "cannot form {} clusters from {} points",
                self.n_clusters,
                points.nrows()
            )));
        }
        if points.iter().any(|v| !v.is_finite()) {
            return Err(CostsError::NumericalEdgeCase(
                "cannot cluster non-finite transformed frequencies".to_string(),
            ));
        }

        let dataset = DatasetBase::from(points.to_owned());
        let rng = ChaCha8Rng::seed_from_u64(self.params.seed);
        let model = linfa_clustering::KMeans::params_with_rng(self.n_clusters, rng)
            .max_n_iterations(self.params.max_iter.max(1))
            .n_runs(self.params.n_runs.max(1))
            .tolerance(self.params.tolerance)
            .fit(&dataset)
            .map_err(|e| CostsError::NumericalEdgeCase(format!("k-means failed: {e}")))?;

        let labels: Array1<usize> = model.predict(&dataset);
        self.centroids = model.centroids().column(0).to_owned();
        debug!(n_clusters = self.n_clusters, n_points = labels.len(), "k-means finished");

        let empty = (0..self.n_clusters).filter(|j| !labels.iter().any(|l| l == j)).count();
        if empty > 0 {
            warn!(empty, n_clusters = self.n_clusters, "k-means left clusters without points");
        }
        Ok(labels)
    }

    fn centroids(&self) -> Array1<f64> {
        self.centroids.clone()
    }
}
