//! Frequency band classification of the fitted eigenvalues
//!
//! Clusters are relabelled so that band ids follow ascending centroid order:
//! band 0 is always the lowest frequency band.

use std::ops::RangeInclusive;

use ndarray::{Array1, Array2};
use tracing::{debug, info};

use super::clustering::{fit_clusters, ClusteringMethod};
use super::silhouette::SilhouetteScorer;
use super::transform::OmegaTransform;
use crate::decomposition::SpectralFits;
use crate::error::{CostsError, Result};

/// Band assignment of every fitted eigenvalue
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyBands {
    /// Band centroids in transformed units, ascending
    pub centroids: Array1<f64>,

    /// Band id per (window, rank slot); padding slots hold 0
    pub omega_classes: Array2<usize>,

    pub transform: OmegaTransform,

    pub n_components: usize,
}

impl FrequencyBands {
    /// Bands that contain at least one fitted eigenvalue
    pub fn present_bands(&self, fits: &SpectralFits) -> Vec<usize> {
        let mut present = vec![false; self.n_components];
        for k in 0..fits.n_slides() {
            for j in 0..fits.window_ranks[k] {
                present[self.omega_classes[[k, j]]] = true;
            }
        }
        (0..self.n_components).filter(|&b| present[b]).collect()
    }
}

/// Outcome of a band count sweep
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    /// Band count with the highest score
    pub best: usize,

    pub candidates: Vec<usize>,

    pub scores: Vec<f64>,
}

/// Relabel clusters in ascending centroid order
///
/// # Returns
/// Relabelled classes and the sorted centroids
pub fn canonicalize(labels: &Array1<usize>, centroids: &Array1<f64>) -> (Array1<usize>, Array1<f64>) {
    let mut order: Vec<usize> = (0..centroids.len()).collect();
    order.sort_by(|&a, &b| centroids[a].total_cmp(&centroids[b]));

    // lut[raw id] = rank of that centroid
    let mut lut = vec![0usize; centroids.len()];
    for (rank, &raw) in order.iter().enumerate() {
        lut[raw] = rank;
    }

    let relabelled = labels.mapv(|l| lut[l]);
    let sorted = order.iter().map(|&raw| centroids[raw]).collect();
    (relabelled, sorted)
}

/// Default sweep range: `max(rank / 4, 2) ..= rank / 2`
pub fn default_sweep_range(rank: usize) -> RangeInclusive<usize> {
    (rank / 4).max(2)..=rank / 2
}

fn transformed_omega(fits: &SpectralFits, transform: OmegaTransform) -> Result<Array1<f64>> {
    let omega = fits.fitted_omega();
    if omega.is_empty() {
        return Err(CostsError::NotFitted);
    }
    transform.apply(omega.view())
}

/// Scatter flat labels of the fitted slots back onto the padded layout
fn scatter_classes(fits: &SpectralFits, labels: &Array1<usize>) -> Array2<usize> {
    let mut classes = Array2::zeros((fits.n_slides(), fits.capacity));
    let mut flat = labels.iter();
    for k in 0..fits.n_slides() {
        for j in 0..fits.window_ranks[k] {
            if let Some(&label) = flat.next() {
                classes[[k, j]] = label;
            }
        }
    }
    classes
}

/// Cluster the fitted eigenvalues into `n_components` frequency bands
///
/// # Arguments
/// * `fits` - Window fit results
/// * `n_components` - Number of bands
/// * `transform` - Transform applied to Im(omega) before clustering
/// * `method` - Clustering capability
pub fn cluster_omega<M: ClusteringMethod>(
    fits: &SpectralFits,
    n_components: usize,
    transform: OmegaTransform,
    method: &M,
) -> Result<FrequencyBands> {
    let values = transformed_omega(fits, transform)?;
    let (labels, centroids) = fit_clusters(method, n_components, values.view())?;
    let (labels, centroids) = canonicalize(&labels, &centroids);

    info!(n_components, transform = %transform, centroids = ?centroids.to_vec(), "clustered eigenvalues");

    Ok(FrequencyBands {
        centroids,
        omega_classes: scatter_classes(fits, &labels),
        transform,
        n_components,
    })
}

/// Score every candidate band count and pick the best separated one
pub fn cluster_hyperparameter_sweep<M, S, I>(
    fits: &SpectralFits,
    candidates: I,
    transform: OmegaTransform,
    method: &M,
    scorer: &S,
) -> Result<SweepReport>
where
    M: ClusteringMethod,
    S: SilhouetteScorer,
    I: IntoIterator<Item = usize>,
{
    let candidates: Vec<usize> = candidates.into_iter().collect();
    if candidates.is_empty() {
        return Err(CostsError::config("band count sweep range is empty"));
    }

    let values = transformed_omega(fits, transform)?;
    let points = values.view().insert_axis(ndarray::Axis(1));

    let mut scores = Vec::with_capacity(candidates.len());
    for &n_components in &candidates {
        let (labels, centroids) = fit_clusters(method, n_components, values.view())?;
        let (labels, _) = canonicalize(&labels, &centroids);
        let score = scorer.score(points, labels.view())?;
        debug!(n_components, score, "band count sweep");
        scores.push(score);
    }

    // First maximum wins
    let mut best_index = 0;
    for (i, &score) in scores.iter().enumerate() {
        if score > scores[best_index] {
            best_index = i;
        }
    }

    Ok(SweepReport {
        best: candidates[best_index],
        candidates,
        scores,
    })
}
