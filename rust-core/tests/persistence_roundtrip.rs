mod common;

use std::collections::BTreeSet;

use costs::persistence::{AttrValue, ConfigValue, CALLABLE_PREFIX};
use costs::solver::{EigConstraint, NamedEigTransform};
use costs::{Costs, CostsConfig, CostsDataset, KMeans, OmegaTransform, OptDmd, OptDmdOptions, SvdRank};
use num_complex::Complex64;

use common::two_scale_series;

fn damp(w: Complex64) -> Complex64 {
    Complex64::new(w.re.min(0.0), w.im)
}

fn clustered(options: OptDmdOptions, config: CostsConfig) -> Costs {
    let (data, _, time) = two_scale_series(120, 0.005, 3);
    let mut costs = Costs::new(config).unwrap();
    costs
        .fit(&OptDmd::new(options), data.view(), time.view(), 40, 20)
        .unwrap();
    costs
        .cluster_omega(Some(2), OmegaTransform::SquareFrequencies, &KMeans::default())
        .unwrap();
    costs
}

fn default_config() -> CostsConfig {
    CostsConfig {
        svd_rank: SvdRank::Fixed(4),
        max_rank: Some(4),
        n_components: Some(2),
        relative_filter_length: 0.1 + 0.2,
        ..CostsConfig::default()
    }
}

#[test]
fn test_save_load_reproduces_arrays() {
    let costs = clustered(OptDmdOptions::default(), default_config());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("costs.json");
    costs.save(&path).unwrap();

    let loaded = Costs::load(&path).unwrap();
    assert_eq!(loaded.omega_array().unwrap(), costs.omega_array().unwrap());
    assert_eq!(loaded.amplitudes_array().unwrap(), costs.amplitudes_array().unwrap());
    assert_eq!(loaded.modes_array().unwrap(), costs.modes_array().unwrap());
    assert_eq!(loaded.window_means_array().unwrap(), costs.window_means_array().unwrap());
    assert_eq!(loaded.time_array().unwrap(), costs.time_array().unwrap());
    assert_eq!(loaded.omega_classes().unwrap(), costs.omega_classes().unwrap());
    assert_eq!(loaded.cluster_centroids().unwrap(), costs.cluster_centroids().unwrap());
    assert_eq!(loaded.config(), costs.config());

    assert_eq!(
        loaded.scale_reconstruction(true).unwrap(),
        costs.scale_reconstruction(true).unwrap()
    );
}

#[test]
fn test_scalar_attributes_survive() {
    let costs = clustered(OptDmdOptions::default(), default_config());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("costs.json");
    costs.save(&path).unwrap();

    let dataset = CostsDataset::load(&path).unwrap();
    assert_eq!(dataset, costs.to_dataset().unwrap());
    assert_eq!(dataset.attr_usize("n_slides").unwrap(), 5);
    assert_eq!(dataset.attr_usize("window_length").unwrap(), 40);
    assert_eq!(dataset.attr_usize("step_size").unwrap(), 20);
    assert_eq!(dataset.attr_usize("n_data_vars").unwrap(), 4);
    assert_eq!(dataset.attr_usize("n_time_steps").unwrap(), 120);
    assert_eq!(dataset.attr_usize("svd_rank_pre_allocate").unwrap(), 4);
    assert_eq!(dataset.attr_usize("num_frequency_bands").unwrap(), 2);
    assert_eq!(dataset.attr_f64("relative_filter_length").unwrap(), 0.1 + 0.2);
    assert_eq!(dataset.attr_text("omega_transformation").unwrap(), "square_frequencies");
    assert_eq!(dataset.attr_text("kern_method").unwrap(), "kern");
    assert!(dataset.attr_bool("global_svd").unwrap());
    assert!(!dataset.attr_bool("non_integer_n_slide").unwrap());
    assert_eq!(dataset.coords.window_time_means.len(), 5);
}

#[test]
fn test_solver_options_round_trip_except_callables() {
    let options = OptDmdOptions {
        eig_constraints: [EigConstraint::Stable, EigConstraint::ConjugatePairs].into_iter().collect(),
        eig_transform: Some(NamedEigTransform {
            name: "damp".to_string(),
            func: damp,
        }),
        max_iter: 40,
        ..OptDmdOptions::default()
    };
    let costs = clustered(options, default_config());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("costs.json");
    costs.save(&path).unwrap();
    let loaded = Costs::load(&path).unwrap();

    let original = costs.solver_options();
    let restored = loaded.solver_options();
    assert_eq!(original.len(), restored.len());
    for (key, value) in original {
        if value.is_callable() {
            assert_eq!(restored[key], ConfigValue::Text(format!("{CALLABLE_PREFIX}damp")));
        } else {
            assert_eq!(&restored[key], value, "solver option {key}");
        }
    }

    let constraints: BTreeSet<String> = ["conjugate_pairs", "stable"].iter().map(|s| s.to_string()).collect();
    assert_eq!(restored["eig_constraints"], ConfigValue::Set(constraints));
    assert!(matches!(restored["proj_basis"], ConfigValue::Matrix(_)));

    let dataset = loaded.to_dataset().unwrap();
    assert_eq!(
        dataset.attr_value("solver_options__eig_constraints"),
        Some(&AttrValue::List(vec!["conjugate_pairs".to_string(), "stable".to_string()]))
    );
}

#[test]
fn test_local_mode_absent_basis() {
    let config = CostsConfig {
        global_svd: false,
        ..default_config()
    };
    let costs = clustered(OptDmdOptions::default(), config);
    let dataset = costs.to_dataset().unwrap();
    assert_eq!(
        dataset.attr_value("solver_options__proj_basis"),
        Some(&AttrValue::Text("None".to_string()))
    );

    let loaded = Costs::from_dataset(&dataset).unwrap();
    assert_eq!(loaded.solver_options()["proj_basis"], ConfigValue::Absent);
    assert!(!loaded.config().global_svd);
}
