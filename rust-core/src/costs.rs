//! Coherent spatiotemporal scale separation
//!
//! `Costs` owns the lifecycle of one decomposition: configure, fit the sliding
//! windows, classify the fitted eigenvalues into frequency bands, reconstruct
//! each band, and convert to and from the labeled dataset.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::ops::ControlFlow;
use std::path::Path;

use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis};
use num_complex::Complex64;
use tracing::info;

use crate::decomposition::{CostsConfig, SeedCarry, SpectralFits, SvdRank, WindowFitOrchestrator};
use crate::error::{CostsError, Result};
use crate::persistence::{
    sanitize_map, unsanitize_map, ConfigValue, CostsDataset, SOLVER_OPTIONS_PREFIX,
};
use crate::persistence::dataset::{DatasetCoords, DatasetVars};
use crate::reconstruction;
use crate::solver::SpectralSolver;
use crate::spectrum::{
    self, default_sweep_range, ClusteringMethod, FrequencyBands, OmegaTransform, SilhouetteScorer, SweepReport,
};
use crate::windows::{KernMethod, WindowPlan};

pub use crate::reconstruction::relative_error;

/// Sliding-window decomposition with frequency band separation
#[derive(Debug, Clone)]
pub struct Costs {
    config: CostsConfig,
    fits: Option<SpectralFits>,
    bands: Option<FrequencyBands>,
    solver_options: BTreeMap<String, ConfigValue>,
}

impl Costs {
    /// Create an unfitted decomposition
    pub fn new(config: CostsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fits: None,
            bands: None,
            solver_options: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &CostsConfig {
        &self.config
    }

    pub fn fits(&self) -> Result<&SpectralFits> {
        self.fits.as_ref().ok_or(CostsError::NotFitted)
    }

    pub fn bands(&self) -> Result<&FrequencyBands> {
        self.bands.as_ref().ok_or(CostsError::NotClustered)
    }

    pub fn is_fitted(&self) -> bool {
        self.fits.is_some()
    }

    pub fn is_clustered(&self) -> bool {
        self.bands.is_some()
    }

    /// Solver options recorded by the last fit
    pub fn solver_options(&self) -> &BTreeMap<String, ConfigValue> {
        &self.solver_options
    }

    /// Fit every window in order
    ///
    /// # Arguments
    /// * `solver` - Spectral solver applied to each window
    /// * `data` - Snapshots (n_data_vars x n_time_steps)
    /// * `time` - Sample times (n_time_steps)
    /// * `window_length` - Samples per window
    /// * `step_size` - Samples between window starts
    pub fn fit<'a, S: SpectralSolver>(
        &mut self,
        solver: &S,
        data: ArrayView2<'a, f64>,
        time: ArrayView1<'a, f64>,
        window_length: usize,
        step_size: usize,
    ) -> Result<()> {
        self.fit_with_progress(solver, data, time, window_length, step_size, |_, _| {
            ControlFlow::Continue(())
        })
    }

    /// Fit every window in order, calling `observer(k, n_slides)` before each one
    ///
    /// A `ControlFlow::Break` from the observer stops the fit with
    /// `CostsError::Cancelled` and leaves any previous fit in place.
    pub fn fit_with_progress<'a, S, F>(
        &mut self,
        solver: &S,
        data: ArrayView2<'a, f64>,
        time: ArrayView1<'a, f64>,
        window_length: usize,
        step_size: usize,
        observer: F,
    ) -> Result<()>
    where
        S: SpectralSolver,
        F: FnMut(usize, usize) -> ControlFlow<()>,
    {
        let orchestrator = WindowFitOrchestrator::new(&self.config, data, time, window_length, step_size)?;
        let options = solver_options(solver, &orchestrator);
        let fits = orchestrator.run_with_progress(solver, observer)?;
        self.install(fits, options);
        Ok(())
    }

    /// Fit all windows concurrently
    ///
    /// Requires `global_svd` with `SeedCarry::HoldInitial`.
    pub fn fit_parallel<'a, S>(
        &mut self,
        solver: &S,
        data: ArrayView2<'a, f64>,
        time: ArrayView1<'a, f64>,
        window_length: usize,
        step_size: usize,
    ) -> Result<()>
    where
        S: SpectralSolver + Sync,
    {
        let orchestrator = WindowFitOrchestrator::new(&self.config, data, time, window_length, step_size)?;
        let options = solver_options(solver, &orchestrator);
        let fits = orchestrator.run_parallel(solver)?;
        self.install(fits, options);
        Ok(())
    }

    fn install(&mut self, fits: SpectralFits, options: BTreeMap<String, ConfigValue>) {
        info!(
            n_slides = fits.n_slides(),
            svd_rank_pre_allocate = fits.capacity,
            "fit complete"
        );
        self.fits = Some(fits);
        self.bands = None;
        self.solver_options = options;
    }

    /// Classify the fitted eigenvalues into frequency bands
    ///
    /// # Arguments
    /// * `n_components` - Band count; falls back to the configured count
    /// * `transform` - Transform applied to Im(omega) before clustering
    /// * `method` - Clustering capability
    pub fn cluster_omega<M: ClusteringMethod>(
        &mut self,
        n_components: Option<usize>,
        transform: OmegaTransform,
        method: &M,
    ) -> Result<&FrequencyBands> {
        let n_components = n_components
            .or(self.config.n_components)
            .ok_or_else(|| CostsError::config("no band count given or configured"))?;
        let bands = spectrum::cluster_omega(self.fits()?, n_components, transform, method)?;
        Ok(&*self.bands.insert(bands))
    }

    /// Score candidate band counts by silhouette
    ///
    /// Without explicit candidates the range is `max(rank / 4, 2) ..= rank / 2`
    /// over the pre-allocated rank.
    pub fn cluster_hyperparameter_sweep<M, S>(
        &self,
        candidates: Option<Vec<usize>>,
        transform: OmegaTransform,
        method: &M,
        scorer: &S,
    ) -> Result<SweepReport>
    where
        M: ClusteringMethod,
        S: SilhouetteScorer,
    {
        let fits = self.fits()?;
        let candidates = candidates.unwrap_or_else(|| default_sweep_range(fits.capacity).collect());
        spectrum::cluster_hyperparameter_sweep(fits, candidates, transform, method, scorer)
    }

    /// Sweep band counts, then classify with the best one
    pub fn cluster_with_sweep<M, S>(
        &mut self,
        candidates: Option<Vec<usize>>,
        transform: OmegaTransform,
        method: &M,
        scorer: &S,
    ) -> Result<SweepReport>
    where
        M: ClusteringMethod,
        S: SilhouetteScorer,
    {
        let report = self.cluster_hyperparameter_sweep(candidates, transform, method, scorer)?;
        self.cluster_omega(Some(report.best), transform, method)?;
        Ok(report)
    }

    /// Per-band reconstruction (n_components x n_data_vars x n_time_steps)
    pub fn scale_reconstruction(&self, include_means: bool) -> Result<Array3<f64>> {
        reconstruction::scale_reconstruction(
            self.fits()?,
            self.bands()?,
            self.config.relative_filter_length,
            include_means,
        )
    }

    /// Sum of all bands (n_data_vars x n_time_steps)
    pub fn global_reconstruction(&self, include_means: bool) -> Result<Array2<f64>> {
        Ok(reconstruction::global_reconstruction(&self.scale_reconstruction(include_means)?))
    }

    /// Band 0 and the sum of every higher band
    pub fn scale_separation(&self, include_means: bool) -> Result<(Array2<f64>, Array2<f64>)> {
        Ok(reconstruction::scale_separation(&self.scale_reconstruction(include_means)?))
    }

    /// Periods `2 pi / |Im(omega)|` of every fitted eigenvalue above band 0
    pub fn periods(&self) -> Result<Array1<f64>> {
        let fits = self.fits()?;
        let bands = self.bands()?;
        let mut periods = Vec::new();
        for k in 0..fits.n_slides() {
            for j in 0..fits.window_ranks[k] {
                if bands.omega_classes[[k, j]] > 0 {
                    periods.push(2.0 * PI / fits.omega[[k, j]].im.abs());
                }
            }
        }
        Ok(Array1::from(periods))
    }

    /// Mean of each window's sample times
    pub fn window_time_means(&self) -> Result<Array1<f64>> {
        let fits = self.fits()?;
        fits.time
            .mean_axis(Axis(1))
            .ok_or_else(|| CostsError::config("windows hold no samples"))
    }

    pub fn n_slides(&self) -> Result<usize> {
        Ok(self.fits()?.n_slides())
    }

    pub fn window_length(&self) -> Result<usize> {
        Ok(self.fits()?.plan.window_length)
    }

    pub fn step_size(&self) -> Result<usize> {
        Ok(self.fits()?.plan.step_size)
    }

    /// Pre-allocated rank slots per window
    pub fn svd_rank_pre_allocate(&self) -> Result<usize> {
        Ok(self.fits()?.capacity)
    }

    pub fn omega_array(&self) -> Result<&Array2<Complex64>> {
        Ok(&self.fits()?.omega)
    }

    pub fn amplitudes_array(&self) -> Result<&Array2<Complex64>> {
        Ok(&self.fits()?.amplitudes)
    }

    pub fn modes_array(&self) -> Result<&Array3<Complex64>> {
        Ok(&self.fits()?.modes)
    }

    pub fn window_means_array(&self) -> Result<&Array2<f64>> {
        Ok(&self.fits()?.window_means)
    }

    pub fn time_array(&self) -> Result<&Array2<f64>> {
        Ok(&self.fits()?.time)
    }

    pub fn omega_classes(&self) -> Result<&Array2<usize>> {
        Ok(&self.bands()?.omega_classes)
    }

    pub fn cluster_centroids(&self) -> Result<&Array1<f64>> {
        Ok(&self.bands()?.centroids)
    }

    /// Convert the fitted state to a labeled dataset
    pub fn to_dataset(&self) -> Result<CostsDataset> {
        let fits = self.fits()?;
        let n_components = self.bands.as_ref().map_or(0, |b| b.n_components);

        let coords = DatasetCoords {
            window_time_means: self.window_time_means()?,
            slide: Array1::from_iter(0..fits.n_slides()),
            svd_rank: Array1::from_iter(0..fits.capacity),
            space: Array1::from_iter(0..fits.n_data_vars()),
            frequency_band: Array1::from_iter(0..n_components),
            window_index: Array1::from_iter(0..fits.plan.window_length),
            time: fits.time.clone(),
        };

        let data_vars = DatasetVars {
            omega: fits.omega.clone(),
            omega_classes: self.bands.as_ref().map(|b| b.omega_classes.clone()),
            amplitudes: fits.amplitudes.clone(),
            modes: fits.modes.clone(),
            window_means: fits.window_means.clone(),
            window_ranks: Array1::from(fits.window_ranks.clone()),
            cluster_centroids: self.bands.as_ref().map(|b| b.centroids.clone()),
        };

        let mut attrs = sanitize_map("", &self.attributes(fits));
        attrs.extend(sanitize_map(SOLVER_OPTIONS_PREFIX, &self.solver_options));

        Ok(CostsDataset {
            coords,
            data_vars,
            attrs,
        })
    }

    fn attributes(&self, fits: &SpectralFits) -> BTreeMap<String, ConfigValue> {
        let config = &self.config;
        let plan = &fits.plan;
        let int = |v: usize| ConfigValue::Int(v as i64);
        let optional_int = |v: Option<usize>| v.map_or(ConfigValue::Absent, int);

        let mut attrs = BTreeMap::new();
        attrs.insert("svd_rank".to_string(), config.svd_rank.to_config_value());
        attrs.insert("svd_rank_pre_allocate".to_string(), int(fits.capacity));
        attrs.insert(
            "omega_transformation".to_string(),
            self.bands
                .as_ref()
                .map_or(ConfigValue::Absent, |b| ConfigValue::Text(b.transform.as_str().to_string())),
        );
        attrs.insert(
            "num_frequency_bands".to_string(),
            optional_int(self.bands.as_ref().map(|b| b.n_components)),
        );
        attrs.insert("n_slides".to_string(), int(plan.n_slides));
        attrs.insert("window_length".to_string(), int(plan.window_length));
        attrs.insert("step_size".to_string(), int(plan.step_size));
        attrs.insert("n_time_steps".to_string(), int(plan.n_time_steps));
        attrs.insert("n_data_vars".to_string(), int(fits.n_data_vars()));
        attrs.insert("non_integer_n_slide".to_string(), ConfigValue::Bool(plan.non_integer_n_slide));
        attrs.insert("integer_windows".to_string(), ConfigValue::Bool(config.integer_windows));
        attrs.insert("global_svd".to_string(), ConfigValue::Bool(config.global_svd));
        attrs.insert("force_even_eigs".to_string(), ConfigValue::Bool(config.force_even_eigs));
        attrs.insert("max_rank".to_string(), optional_int(config.max_rank));
        attrs.insert("n_components".to_string(), optional_int(config.n_components));
        attrs.insert(
            "relative_filter_length".to_string(),
            ConfigValue::Float(config.relative_filter_length),
        );
        attrs.insert("corner_sharpness".to_string(), ConfigValue::Float(config.corner_sharpness));
        attrs.insert(
            "kern_method".to_string(),
            ConfigValue::Text(config.kern_method.as_str().to_string()),
        );
        attrs.insert(
            "seed_carry".to_string(),
            ConfigValue::Text(config.seed_carry.as_str().to_string()),
        );
        attrs.insert(
            "initialize_artificially".to_string(),
            ConfigValue::Bool(config.initialize_artificially),
        );
        attrs.insert(
            "init_alpha".to_string(),
            config
                .init_alpha
                .as_ref()
                .map_or(ConfigValue::Absent, |a| ConfigValue::ComplexVector(a.clone())),
        );
        attrs.insert(
            "init_cluster_centroids".to_string(),
            config
                .cluster_centroids
                .as_ref()
                .map_or(ConfigValue::Absent, |c| ConfigValue::Vector(c.clone())),
        );
        attrs
    }

    /// Rebuild a decomposition from a labeled dataset
    pub fn from_dataset(dataset: &CostsDataset) -> Result<Self> {
        let config = CostsConfig {
            svd_rank: SvdRank::from_config_value(&decoded(dataset, "svd_rank")?)?,
            global_svd: dataset.attr_bool("global_svd")?,
            force_even_eigs: dataset.attr_bool("force_even_eigs")?,
            max_rank: optional_usize(dataset, "max_rank")?,
            initialize_artificially: dataset.attr_bool("initialize_artificially")?,
            init_alpha: match decoded(dataset, "init_alpha")? {
                ConfigValue::Absent => None,
                ConfigValue::ComplexVector(v) => Some(v),
                other => return Err(CostsError::config(format!("invalid init_alpha {other:?}"))),
            },
            cluster_centroids: match decoded(dataset, "init_cluster_centroids")? {
                ConfigValue::Absent => None,
                ConfigValue::Vector(v) => Some(v),
                other => {
                    return Err(CostsError::config(format!("invalid init_cluster_centroids {other:?}")))
                }
            },
            seed_carry: dataset.attr_text("seed_carry")?.parse::<SeedCarry>()?,
            kern_method: dataset.attr_text("kern_method")?.parse::<KernMethod>()?,
            corner_sharpness: dataset.attr_f64("corner_sharpness")?,
            relative_filter_length: dataset.attr_f64("relative_filter_length")?,
            integer_windows: dataset.attr_bool("integer_windows")?,
            n_components: optional_usize(dataset, "n_components")?,
        };
        config.validate()?;

        let plan = WindowPlan::new(
            dataset.attr_usize("n_time_steps")?,
            dataset.attr_usize("window_length")?,
            dataset.attr_usize("step_size")?,
            config.integer_windows,
        )?;
        if plan.n_slides != dataset.attr_usize("n_slides")?
            || plan.non_integer_n_slide != dataset.attr_bool("non_integer_n_slide")?
        {
            return Err(CostsError::config(
                "stored window geometry does not match its window length and step size",
            ));
        }

        let vars = &dataset.data_vars;
        let fits = SpectralFits::from_parts(
            plan,
            vars.modes.clone(),
            vars.omega.clone(),
            vars.amplitudes.clone(),
            vars.window_means.clone(),
            dataset.coords.time.clone(),
            vars.window_ranks.to_vec(),
        )?;

        let bands = match (&vars.omega_classes, &vars.cluster_centroids) {
            (Some(classes), Some(centroids)) => {
                Some(restore_bands(dataset, &fits, classes, centroids)?)
            }
            (None, None) => None,
            _ => {
                return Err(CostsError::config(
                    "dataset holds only one of omega_classes and cluster_centroids",
                ))
            }
        };

        Ok(Self {
            config,
            fits: Some(fits),
            bands,
            solver_options: unsanitize_map(SOLVER_OPTIONS_PREFIX, &dataset.attrs),
        })
    }

    /// Save the fitted state as a JSON dataset
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_dataset()?.save(path)
    }

    /// Load a decomposition written by `save`
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_dataset(&CostsDataset::load(path)?)
    }
}

/// Solver options plus the projection basis the windows will be fit against
fn solver_options<S: SpectralSolver>(
    solver: &S,
    orchestrator: &WindowFitOrchestrator<'_>,
) -> BTreeMap<String, ConfigValue> {
    let mut options = solver.describe();
    let basis = orchestrator
        .rank_policy()
        .basis()
        .map_or(ConfigValue::Absent, |b| ConfigValue::Matrix(b.as_ref().clone()));
    options.insert("proj_basis".to_string(), basis);
    options
}

fn decoded(dataset: &CostsDataset, key: &str) -> Result<ConfigValue> {
    dataset
        .attr_value(key)
        .map(ConfigValue::unsanitize)
        .ok_or_else(|| CostsError::config(format!("dataset is missing attribute `{key}`")))
}

fn optional_usize(dataset: &CostsDataset, key: &str) -> Result<Option<usize>> {
    match decoded(dataset, key)? {
        ConfigValue::Absent => Ok(None),
        ConfigValue::Int(v) if v >= 0 => Ok(Some(v as usize)),
        other => Err(CostsError::config(format!("attribute `{key}` is not a count: {other:?}"))),
    }
}

fn restore_bands(
    dataset: &CostsDataset,
    fits: &SpectralFits,
    classes: &Array2<usize>,
    centroids: &Array1<f64>,
) -> Result<FrequencyBands> {
    let n_components = dataset.attr_usize("num_frequency_bands")?;
    let transform = dataset.attr_text("omega_transformation")?.parse::<OmegaTransform>()?;

    if classes.dim() != fits.omega.dim() {
        return Err(CostsError::config(format!(
            "omega_classes {:?} does not match omega {:?}",
            classes.dim(),
            fits.omega.dim()
        )));
    }
    if centroids.len() != n_components || classes.iter().any(|&c| c >= n_components) {
        return Err(CostsError::config(format!(
            "band classification is inconsistent with {n_components} bands"
        )));
    }

    Ok(FrequencyBands {
        centroids: centroids.clone(),
        omega_classes: classes.clone(),
        transform,
        n_components,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{OptDmd, OptDmdOptions};
    use crate::spectrum::{EuclideanSilhouette, KMeans};

    /// Two oscillations on four variables, slow on the first pair and fast on the second
    fn two_scale_series(n_time_steps: usize) -> (Array2<f64>, Array1<f64>) {
        let time = Array1::from_iter((0..n_time_steps).map(|i| i as f64));
        let data = Array2::from_shape_fn((4, n_time_steps), |(v, i)| {
            let t = i as f64;
            match v {
                0 => (0.05 * t).sin(),
                1 => (0.05 * t).cos(),
                2 => 0.5 * (0.5 * t).sin(),
                _ => 0.5 * (0.5 * t).cos(),
            }
        });
        (data, time)
    }

    fn config() -> CostsConfig {
        CostsConfig {
            svd_rank: SvdRank::Fixed(4),
            kern_method: KernMethod::Flat,
            ..CostsConfig::default()
        }
    }

    fn fitted() -> Costs {
        let (data, time) = two_scale_series(120);
        let mut costs = Costs::new(config()).unwrap();
        costs
            .fit(&OptDmd::new(OptDmdOptions::default()), data.view(), time.view(), 40, 20)
            .unwrap();
        costs
    }

    #[test]
    fn test_requires_fit_then_clustering() {
        let costs = Costs::new(config()).unwrap();
        assert!(matches!(costs.scale_reconstruction(true), Err(CostsError::NotFitted)));
        assert!(matches!(costs.to_dataset(), Err(CostsError::NotFitted)));

        let costs = fitted();
        assert!(matches!(costs.scale_reconstruction(true), Err(CostsError::NotClustered)));
        assert!(matches!(costs.periods(), Err(CostsError::NotClustered)));
    }

    #[test]
    fn test_fit_geometry() {
        let costs = fitted();
        assert_eq!(costs.n_slides().unwrap(), 5);
        assert_eq!(costs.svd_rank_pre_allocate().unwrap(), 4);
        assert_eq!(costs.omega_array().unwrap().dim(), (5, 4));
        assert_eq!(costs.modes_array().unwrap().dim(), (5, 4, 4));
        assert_eq!(costs.window_time_means().unwrap()[0], 19.5);
        assert!(matches!(
            costs.solver_options().get("proj_basis"),
            Some(ConfigValue::Matrix(_))
        ));
    }

    #[test]
    fn test_band_count_required() {
        let mut costs = fitted();
        assert!(matches!(
            costs.cluster_omega(None, OmegaTransform::Absolute, &KMeans::default()),
            Err(CostsError::Configuration(_))
        ));
    }

    #[test]
    fn test_periods_of_fast_band() {
        let mut costs = fitted();
        costs
            .cluster_omega(Some(2), OmegaTransform::Absolute, &KMeans::default())
            .unwrap();
        let periods = costs.periods().unwrap();

        assert_eq!(periods.len(), 10);
        for p in periods.iter() {
            assert!((p - 2.0 * PI / 0.5).abs() < 0.5, "period {}", p);
        }
    }

    #[test]
    fn test_refit_clears_bands() {
        let (data, time) = two_scale_series(120);
        let mut costs = fitted();
        costs
            .cluster_omega(Some(2), OmegaTransform::Absolute, &KMeans::default())
            .unwrap();
        assert!(costs.is_clustered());

        costs
            .fit(&OptDmd::new(OptDmdOptions::default()), data.view(), time.view(), 40, 40)
            .unwrap();
        assert!(!costs.is_clustered());
        assert_eq!(costs.n_slides().unwrap(), 3);
    }

    #[test]
    fn test_sweep_then_cluster() {
        let mut costs = fitted();
        let report = costs
            .cluster_with_sweep(
                Some(vec![2, 3]),
                OmegaTransform::Absolute,
                &KMeans::default(),
                &EuclideanSilhouette,
            )
            .unwrap();
        assert_eq!(report.best, 2);
        assert_eq!(costs.bands().unwrap().n_components, 2);
    }

    #[test]
    fn test_default_sweep_range_needs_rank() {
        // Capacity 4 gives the single candidate 2
        let costs = fitted();
        let report = costs
            .cluster_hyperparameter_sweep(None, OmegaTransform::Absolute, &KMeans::default(), &EuclideanSilhouette)
            .unwrap();
        assert_eq!(report.candidates, vec![2]);
    }

    #[test]
    fn test_dataset_round_trip() {
        let mut costs = fitted();
        costs
            .cluster_omega(Some(2), OmegaTransform::Log10, &KMeans::default())
            .unwrap();

        let dataset = costs.to_dataset().unwrap();
        assert_eq!(dataset.attr_text("omega_transformation").unwrap(), "log10");
        assert_eq!(dataset.attr_text("max_rank").unwrap(), "None");
        assert_eq!(dataset.coords.frequency_band.len(), 2);

        let restored = Costs::from_dataset(&dataset).unwrap();
        assert_eq!(restored.config(), costs.config());
        assert_eq!(restored.fits().unwrap(), costs.fits().unwrap());
        assert_eq!(restored.bands().unwrap(), costs.bands().unwrap());
        assert_eq!(restored.to_dataset().unwrap(), dataset);
    }

    #[test]
    fn test_unclustered_dataset() {
        let costs = fitted();
        let dataset = costs.to_dataset().unwrap();
        assert!(dataset.data_vars.omega_classes.is_none());
        assert_eq!(dataset.attr_text("omega_transformation").unwrap(), "None");

        let restored = Costs::from_dataset(&dataset).unwrap();
        assert!(!restored.is_clustered());
    }

    #[test]
    fn test_corrupt_classes_rejected() {
        let mut costs = fitted();
        costs
            .cluster_omega(Some(2), OmegaTransform::Absolute, &KMeans::default())
            .unwrap();
        let mut dataset = costs.to_dataset().unwrap();
        if let Some(classes) = dataset.data_vars.omega_classes.as_mut() {
            classes[[0, 0]] = 2;
        }
        assert!(matches!(
            Costs::from_dataset(&dataset),
            Err(CostsError::Configuration(_))
        ));
    }
}
