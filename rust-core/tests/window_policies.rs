mod common;

use costs::{
    Costs, CostsConfig, CostsError, KMeans, KernMethod, OmegaTransform, OptDmd, OptDmdOptions, SeedCarry, SvdRank,
};
use ndarray::{s, Array1, Array2};
use num_complex::Complex64;

use common::{two_scale_series, FAST};

/// One oscillation throughout, a second one switched on at `t = 120`
fn switching_series() -> (Array2<f64>, Array1<f64>) {
    let time = Array1::from_iter((0..200).map(|i| i as f64));
    let data = Array2::from_shape_fn((4, 200), |(v, i)| {
        let t = time[i];
        let late = i >= 120;
        match v {
            0 => (0.3 * t).sin(),
            1 => (0.3 * t).cos(),
            2 if late => (0.9 * t).sin(),
            3 if late => (0.9 * t).cos(),
            _ => 0.0,
        }
    });
    (data, time)
}

fn sorted_by_frequency(omega: Vec<Complex64>) -> Vec<Complex64> {
    let mut omega = omega;
    omega.sort_by(|a, b| a.im.total_cmp(&b.im));
    omega
}

#[test]
fn test_adaptive_rank_pads_with_zeros() {
    let (data, time) = switching_series();
    let config = CostsConfig {
        svd_rank: SvdRank::Energy(0.99),
        global_svd: false,
        kern_method: KernMethod::Flat,
        ..CostsConfig::default()
    };
    let mut costs = Costs::new(config).unwrap();
    costs
        .fit(&OptDmd::new(OptDmdOptions::default()), data.view(), time.view(), 40, 40)
        .unwrap();

    let fits = costs.fits().unwrap();
    assert_eq!(fits.capacity, 4);
    assert_eq!(fits.window_ranks, vec![2, 2, 2, 4, 4]);

    let zero = Complex64::new(0.0, 0.0);
    for k in 0..3 {
        assert!(fits.omega.slice(s![k, 2..]).iter().all(|&w| w == zero));
        assert!(fits.amplitudes.slice(s![k, 2..]).iter().all(|&b| b == zero));
        assert!(fits.modes.slice(s![k, .., 2..]).iter().all(|&m| m == zero));
        for w in fits.window_omega(k) {
            assert!((w.im.abs() - 0.3).abs() < 0.01, "window {} eigenvalue {}", k, w);
        }
    }
    assert!(fits.window_omega(3).iter().any(|w| (w.im.abs() - 0.9).abs() < 0.01));
    assert_eq!(fits.fitted_omega().len(), 14);

    // Padding must not leak into the bands or the reconstruction
    let bands = costs
        .cluster_omega(Some(2), OmegaTransform::Absolute, &KMeans::default())
        .unwrap();
    assert!((bands.centroids[0] - 0.3).abs() < 0.01, "slow centroid {}", bands.centroids[0]);
    assert!((bands.centroids[1] - 0.9).abs() < 0.01, "fast centroid {}", bands.centroids[1]);

    let (low, high) = costs.scale_separation(false).unwrap();
    assert!(low.iter().chain(high.iter()).all(|v| v.is_finite()));
    assert!(high.slice(s![2.., ..100]).iter().all(|v| v.abs() < 1e-6));
}

fn seeded_config(centroids: Array1<f64>, seed_carry: SeedCarry) -> CostsConfig {
    CostsConfig {
        svd_rank: SvdRank::Fixed(4),
        kern_method: KernMethod::Flat,
        initialize_artificially: true,
        cluster_centroids: Some(centroids),
        n_components: Some(2),
        seed_carry,
        ..CostsConfig::default()
    }
}

#[test]
fn test_cluster_seeded_refit() {
    let (data, _, time) = two_scale_series(200, 0.005, 11);
    let solver = OptDmd::new(OptDmdOptions::default());

    let mut first = Costs::new(CostsConfig {
        svd_rank: SvdRank::Fixed(4),
        kern_method: KernMethod::Flat,
        ..CostsConfig::default()
    })
    .unwrap();
    first.fit(&solver, data.view(), time.view(), 40, 10).unwrap();
    let centroids = first
        .cluster_omega(Some(2), OmegaTransform::SquareFrequencies, &KMeans::default())
        .unwrap()
        .centroids
        .clone();
    assert!((centroids[1].sqrt() - FAST).abs() < 0.05);

    let mut held = Costs::new(seeded_config(centroids.clone(), SeedCarry::HoldInitial)).unwrap();
    held.fit(&solver, data.view(), time.view(), 40, 10).unwrap();
    let mut carried = Costs::new(seeded_config(centroids, SeedCarry::CarryLast)).unwrap();
    carried.fit(&solver, data.view(), time.view(), 40, 10).unwrap();

    // Every start lands on the same per-window optimum
    let reference = first.fits().unwrap();
    for fits in [held.fits().unwrap(), carried.fits().unwrap()] {
        assert_eq!(fits.window_ranks, reference.window_ranks);
        for k in 0..reference.n_slides() {
            let expected = sorted_by_frequency(reference.window_omega(k).to_vec());
            let actual = sorted_by_frequency(fits.window_omega(k).to_vec());
            for (a, e) in actual.iter().zip(&expected) {
                assert!((a - e).norm() < 5e-3, "window {}: {} vs {}", k, a, e);
            }
        }
    }

    // Re-clustering the seeded fit reproduces the bands
    let bands = held
        .cluster_omega(Some(2), OmegaTransform::SquareFrequencies, &KMeans::default())
        .unwrap();
    assert_eq!(bands.omega_classes, first.bands().unwrap().omega_classes);
}

#[test]
fn test_carry_last_cannot_run_in_parallel() {
    let (data, _, time) = two_scale_series(200, 0.005, 11);
    let config = CostsConfig {
        svd_rank: SvdRank::Fixed(4),
        seed_carry: SeedCarry::CarryLast,
        ..CostsConfig::default()
    };
    let mut costs = Costs::new(config).unwrap();
    let result = costs.fit_parallel(&OptDmd::new(OptDmdOptions::default()), data.view(), time.view(), 40, 10);
    assert!(matches!(result, Err(CostsError::Configuration(_))));
    assert!(!costs.is_fitted());
}
