//! Python bindings for the sliding-window decomposition

use std::collections::BTreeSet;

use num_complex::Complex64;
use numpy::{IntoPyArray, PyArray1, PyArray2, PyArray3, PyReadonlyArray1, PyReadonlyArray2};
use pyo3::prelude::*;

use crate::costs::Costs;
use crate::decomposition::{CostsConfig, SeedCarry, SvdRank};
use crate::solver::{EigConstraint, EigSort, OptDmd, OptDmdOptions};
use crate::spectrum::{EuclideanSilhouette, KMeans, OmegaTransform};
use crate::windows::KernMethod;

/// Sliding-window decomposition exposed to Python
#[pyclass(name = "Costs")]
pub struct PyCosts {
    costs: Costs,
    solver: OptDmd,
}

#[pymethods]
impl PyCosts {
    /// Create a new decomposition
    ///
    /// Args:
    ///     svd_rank: 0 (optimal), r (fixed), 0 < f < 1 (energy) or -1 (full)
    ///     global_svd: Project every window onto one basis from the full data
    ///     force_even_eigs: Round local ranks up to an even number
    ///     max_rank: Upper bound on local ranks
    ///     kern_method: Taper applied before fitting, "kern" or "flat"
    ///     corner_sharpness: Steepness of the taper edges
    ///     relative_filter_length: Width parameter of the reconstruction kernel
    ///     n_components: Default band count for clustering
    ///     seed_carry: "hold_initial", "carry_last" or "reset_each_window"
    ///     integer_windows: Tile only whole multiples of the window length
    ///     eig_sort: Solver eigenvalue order, "imag", "real", "abs" or "auto"
    ///     eig_constraints: Solver eigenvalue constraints
    ///     use_proj: Fit projected snapshots
    ///     max_iter: Solver iteration limit
    #[new]
    #[pyo3(signature = (
        svd_rank=0.0,
        global_svd=true,
        force_even_eigs=true,
        max_rank=None,
        kern_method="kern",
        corner_sharpness=16.0,
        relative_filter_length=2.0,
        n_components=None,
        seed_carry="hold_initial",
        integer_windows=false,
        eig_sort="imag",
        eig_constraints=None,
        use_proj=false,
        max_iter=30
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        svd_rank: f64,
        global_svd: bool,
        force_even_eigs: bool,
        max_rank: Option<usize>,
        kern_method: &str,
        corner_sharpness: f64,
        relative_filter_length: f64,
        n_components: Option<usize>,
        seed_carry: &str,
        integer_windows: bool,
        eig_sort: &str,
        eig_constraints: Option<Vec<String>>,
        use_proj: bool,
        max_iter: usize,
    ) -> PyResult<Self> {
        let config = CostsConfig {
            svd_rank: SvdRank::from_value(svd_rank)?,
            global_svd,
            force_even_eigs,
            max_rank,
            kern_method: kern_method.parse::<KernMethod>()?,
            corner_sharpness,
            relative_filter_length,
            n_components,
            seed_carry: seed_carry.parse::<SeedCarry>()?,
            integer_windows,
            ..CostsConfig::default()
        };

        let eig_constraints = eig_constraints
            .unwrap_or_default()
            .iter()
            .map(|name| name.parse::<EigConstraint>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        let options = OptDmdOptions {
            eig_sort: eig_sort.parse::<EigSort>()?,
            eig_constraints,
            use_proj,
            max_iter,
            ..OptDmdOptions::default()
        };

        Ok(Self {
            costs: Costs::new(config)?,
            solver: OptDmd::new(options),
        })
    }

    /// Fit the sliding windows
    ///
    /// Args:
    ///     data: Snapshots (n_data_vars x n_time_steps)
    ///     time: Sample times (n_time_steps)
    ///     window_length: Samples per window
    ///     step_size: Samples between window starts
    ///     parallel: Fit windows concurrently (global basis with hold_initial only)
    #[pyo3(signature = (data, time, window_length, step_size, parallel=false))]
    fn fit(
        &mut self,
        py: Python<'_>,
        data: PyReadonlyArray2<f64>,
        time: PyReadonlyArray1<f64>,
        window_length: usize,
        step_size: usize,
        parallel: bool,
    ) -> PyResult<()> {
        let data = data.as_array().to_owned();
        let time = time.as_array().to_owned();
        let costs = &mut self.costs;
        let solver = &self.solver;
        py.allow_threads(|| {
            if parallel {
                costs.fit_parallel(solver, data.view(), time.view(), window_length, step_size)
            } else {
                costs.fit(solver, data.view(), time.view(), window_length, step_size)
            }
        })?;
        Ok(())
    }

    /// Cluster the fitted eigenvalues into frequency bands
    ///
    /// Args:
    ///     n_components: Band count, defaults to the configured one
    ///     transform_method: "absolute", "square_frequencies", "log10" or "period"
    #[pyo3(signature = (n_components=None, transform_method="absolute"))]
    fn cluster_omega(&mut self, n_components: Option<usize>, transform_method: &str) -> PyResult<()> {
        let transform: OmegaTransform = transform_method.parse()?;
        self.costs.cluster_omega(n_components, transform, &KMeans::default())?;
        Ok(())
    }

    /// Silhouette scores of candidate band counts
    ///
    /// Returns:
    ///     (best band count, candidates, scores)
    #[pyo3(signature = (candidates=None, transform_method="absolute"))]
    fn cluster_hyperparameter_sweep(
        &self,
        candidates: Option<Vec<usize>>,
        transform_method: &str,
    ) -> PyResult<(usize, Vec<usize>, Vec<f64>)> {
        let transform: OmegaTransform = transform_method.parse()?;
        let report =
            self.costs
                .cluster_hyperparameter_sweep(candidates, transform, &KMeans::default(), &EuclideanSilhouette)?;
        Ok((report.best, report.candidates, report.scores))
    }

    /// Per-band reconstruction (n_components x n_data_vars x n_time_steps)
    #[pyo3(signature = (include_means=true))]
    fn scale_reconstruction<'py>(&self, py: Python<'py>, include_means: bool) -> PyResult<&'py PyArray3<f64>> {
        Ok(self.costs.scale_reconstruction(include_means)?.into_pyarray(py))
    }

    /// Sum of all bands
    #[pyo3(signature = (include_means=true))]
    fn global_reconstruction<'py>(&self, py: Python<'py>, include_means: bool) -> PyResult<&'py PyArray2<f64>> {
        Ok(self.costs.global_reconstruction(include_means)?.into_pyarray(py))
    }

    /// Low band and the sum of the higher bands
    #[pyo3(signature = (include_means=true))]
    fn scale_separation<'py>(
        &self,
        py: Python<'py>,
        include_means: bool,
    ) -> PyResult<(&'py PyArray2<f64>, &'py PyArray2<f64>)> {
        let (low, high) = self.costs.scale_separation(include_means)?;
        Ok((low.into_pyarray(py), high.into_pyarray(py)))
    }

    fn periods<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray1<f64>> {
        Ok(self.costs.periods()?.into_pyarray(py))
    }

    #[getter]
    fn omega_array<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray2<Complex64>> {
        Ok(self.costs.omega_array()?.clone().into_pyarray(py))
    }

    #[getter]
    fn amplitudes_array<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray2<Complex64>> {
        Ok(self.costs.amplitudes_array()?.clone().into_pyarray(py))
    }

    #[getter]
    fn modes_array<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray3<Complex64>> {
        Ok(self.costs.modes_array()?.clone().into_pyarray(py))
    }

    #[getter]
    fn window_means_array<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray2<f64>> {
        Ok(self.costs.window_means_array()?.clone().into_pyarray(py))
    }

    #[getter]
    fn time_array<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray2<f64>> {
        Ok(self.costs.time_array()?.clone().into_pyarray(py))
    }

    #[getter]
    fn omega_classes<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray2<usize>> {
        Ok(self.costs.omega_classes()?.clone().into_pyarray(py))
    }

    #[getter]
    fn cluster_centroids<'py>(&self, py: Python<'py>) -> PyResult<&'py PyArray1<f64>> {
        Ok(self.costs.cluster_centroids()?.clone().into_pyarray(py))
    }

    #[getter]
    fn n_slides(&self) -> PyResult<usize> {
        Ok(self.costs.n_slides()?)
    }

    #[getter]
    fn svd_rank_pre_allocate(&self) -> PyResult<usize> {
        Ok(self.costs.svd_rank_pre_allocate()?)
    }

    /// Save the fit as a JSON dataset
    fn save(&self, path: &str) -> PyResult<()> {
        Ok(self.costs.save(path)?)
    }

    /// Replace this instance's state with a saved fit
    fn load(&mut self, path: &str) -> PyResult<()> {
        self.costs = Costs::load(path)?;
        Ok(())
    }

    /// Relative Frobenius error of `estimate` against `truth`
    #[staticmethod]
    fn relative_error(estimate: PyReadonlyArray2<f64>, truth: PyReadonlyArray2<f64>) -> PyResult<f64> {
        Ok(crate::costs::relative_error(estimate.as_array(), truth.as_array())?)
    }
}
