//! Per-window spectral solver capability
//!
//! A solver receives a fresh, immutable `SolverConfig` for every window and
//! fits the prepared window data. Nothing is mutated between windows, so one
//! solver value can serve sequential windows or, when `Sync`, parallel ones.

pub mod linalg;
pub mod optdmd;

use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use num_complex::Complex64;

use crate::persistence::ConfigValue;

pub use optdmd::{EigConstraint, EigSort, NamedEigTransform, OptDmd, OptDmdOptions, SolverError};

/// Configuration handed to the solver for a single window
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Number of modes / eigenvalues to fit
    pub rank: usize,

    /// Fixed spatial basis (n_data_vars x >= rank), shared by all windows
    pub projection_basis: Option<Arc<Array2<f64>>>,

    /// Starting guess for the continuous-time eigenvalues
    pub initial_eigenvalue_seed: Option<Array1<Complex64>>,
}

/// Result of fitting one window
#[derive(Debug, Clone)]
pub struct SolverFit {
    /// Spatial modes (n_data_vars x rank)
    pub modes: Array2<Complex64>,

    /// Continuous-time eigenvalues (rank)
    pub eigenvalues: Array1<Complex64>,

    /// Mode amplitudes (rank)
    pub amplitudes: Array1<Complex64>,
}

impl SolverFit {
    pub fn rank(&self) -> usize {
        self.eigenvalues.len()
    }
}

/// Fits a window of 1D snapshots with a linear time evolution model
pub trait SpectralSolver {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fit `data` (n_data_vars x window_length) sampled at `time`, which starts at zero
    fn fit(
        &self,
        config: &SolverConfig,
        data: ArrayView2<'_, f64>,
        time: ArrayView1<'_, f64>,
    ) -> Result<SolverFit, Self::Error>;

    /// Solver options for persistence
    fn describe(&self) -> BTreeMap<String, ConfigValue> {
        BTreeMap::new()
    }
}
