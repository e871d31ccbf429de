mod common;

use costs::{Costs, CostsConfig, KMeans, KernMethod, OmegaTransform, OptDmd, OptDmdOptions, SvdRank};
use costs::reconstruction::relative_error;
use ndarray::s;

use common::{two_scale_series, FAST, SLOW};

const WINDOW_LENGTH: usize = 40;
const STEP_SIZE: usize = 10;

fn config() -> CostsConfig {
    CostsConfig {
        svd_rank: SvdRank::Fixed(4),
        kern_method: KernMethod::Flat,
        ..CostsConfig::default()
    }
}

fn fitted(parallel: bool) -> Costs {
    let (data, _, time) = two_scale_series(200, 0.005, 11);
    let solver = OptDmd::new(OptDmdOptions::default());
    let mut costs = Costs::new(config()).unwrap();
    if parallel {
        costs
            .fit_parallel(&solver, data.view(), time.view(), WINDOW_LENGTH, STEP_SIZE)
            .unwrap();
    } else {
        costs
            .fit(&solver, data.view(), time.view(), WINDOW_LENGTH, STEP_SIZE)
            .unwrap();
    }
    costs
}

#[test]
fn test_window_geometry() {
    let costs = fitted(false);
    let fits = costs.fits().unwrap();
    assert_eq!(fits.n_slides(), 17);
    assert!(!fits.plan.non_integer_n_slide);
    assert_eq!(fits.capacity, 4);
    assert!(fits.window_ranks.iter().all(|&r| r == 4));
}

#[test]
fn test_two_bands_separate_slow_and_fast() {
    let mut costs = fitted(false);
    let bands = costs
        .cluster_omega(Some(2), OmegaTransform::Absolute, &KMeans::default())
        .unwrap();

    // A 40 sample window holds a third of a slow period, and removing its mean
    // pulls the rank 4 slow pair up to roughly 0.09
    let centroids = &bands.centroids;
    assert!(centroids[0] > 0.07 && centroids[0] < 0.1, "slow centroid {}", centroids[0]);
    assert!((centroids[1] - FAST).abs() < 0.01, "fast centroid {}", centroids[1]);
}

#[test]
fn test_period_length_windows_resolve_slow_frequency() {
    let (data, _, time) = two_scale_series(360, 0.005, 11);
    let mut costs = Costs::new(config()).unwrap();
    costs
        .fit(&OptDmd::new(OptDmdOptions::default()), data.view(), time.view(), 120, 40)
        .unwrap();
    let bands = costs
        .cluster_omega(Some(2), OmegaTransform::Absolute, &KMeans::default())
        .unwrap();

    assert!((bands.centroids[0] - SLOW).abs() < 0.005, "slow centroid {}", bands.centroids[0]);
    assert!((bands.centroids[1] - FAST).abs() < 0.005, "fast centroid {}", bands.centroids[1]);
}

#[test]
fn test_low_band_tracks_slow_wave() {
    let (_, slow, _) = two_scale_series(200, 0.005, 11);
    let mut costs = fitted(false);
    costs
        .cluster_omega(Some(2), OmegaTransform::Absolute, &KMeans::default())
        .unwrap();

    let (low, high) = costs.scale_separation(true).unwrap();
    let interior = s![.., WINDOW_LENGTH..200 - WINDOW_LENGTH];
    let error = relative_error(low.slice(interior), slow.slice(interior)).unwrap();
    assert!(error < 0.1, "low band relative error {}", error);

    // The fast wave has unit amplitude on two variables, so the high band is far from zero
    assert!(high.iter().map(|v| v.abs()).fold(0.0, f64::max) > 0.5);
}

#[test]
fn test_global_reconstruction_matches_data() {
    let (data, _, _) = two_scale_series(200, 0.005, 11);
    let mut costs = fitted(false);
    costs
        .cluster_omega(Some(2), OmegaTransform::Absolute, &KMeans::default())
        .unwrap();

    let global = costs.global_reconstruction(true).unwrap();
    let interior = s![.., WINDOW_LENGTH..200 - WINDOW_LENGTH];
    let error = relative_error(global.slice(interior), data.slice(interior)).unwrap();
    assert!(error < 0.1, "global relative error {}", error);
}

#[test]
fn test_parallel_fit_matches_sequential() {
    let sequential = fitted(false);
    let parallel = fitted(true);
    assert_eq!(sequential.fits().unwrap(), parallel.fits().unwrap());
}

#[test]
fn test_log10_transform_orders_bands() {
    let mut costs = fitted(false);
    let bands = costs
        .cluster_omega(Some(2), OmegaTransform::Log10, &KMeans::default())
        .unwrap();
    assert!(bands.centroids[0] < bands.centroids[1]);
    assert!((bands.centroids[1] - FAST.log10()).abs() < 0.05);
}
