//! Fixed-capacity per-window fit results

use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2};
use num_complex::Complex64;

use crate::error::{CostsError, Result};
use crate::solver::SolverFit;
use crate::windows::WindowPlan;

/// Results of every window fit, zero padded to a common rank capacity
///
/// `window_ranks[k]` is the number of fitted slots of window `k`; slots at or
/// beyond it are padding and are exactly zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFits {
    pub plan: WindowPlan,

    /// Rank slots per window (`svd_rank_pre_allocate`)
    pub capacity: usize,

    /// (n_slides, n_data_vars, capacity)
    pub modes: Array3<Complex64>,

    /// (n_slides, capacity)
    pub omega: Array2<Complex64>,

    /// (n_slides, capacity)
    pub amplitudes: Array2<Complex64>,

    /// Time-mean removed from each window (n_slides, n_data_vars)
    pub window_means: Array2<f64>,

    /// Absolute time of each window sample (n_slides, window_length)
    pub time: Array2<f64>,

    pub window_ranks: Vec<usize>,
}

impl SpectralFits {
    /// All-zero results for `plan`
    pub fn zeros(plan: WindowPlan, n_data_vars: usize, capacity: usize) -> Self {
        let n_slides = plan.n_slides;
        Self {
            plan,
            capacity,
            modes: Array3::zeros((n_slides, n_data_vars, capacity)),
            omega: Array2::zeros((n_slides, capacity)),
            amplitudes: Array2::zeros((n_slides, capacity)),
            window_means: Array2::zeros((n_slides, n_data_vars)),
            time: Array2::zeros((n_slides, plan.window_length)),
            window_ranks: vec![0; n_slides],
        }
    }

    /// Assemble results from existing arrays, checking that the shapes agree
    pub fn from_parts(
        plan: WindowPlan,
        modes: Array3<Complex64>,
        omega: Array2<Complex64>,
        amplitudes: Array2<Complex64>,
        window_means: Array2<f64>,
        time: Array2<f64>,
        window_ranks: Vec<usize>,
    ) -> Result<Self> {
        let (n_slides, n_data_vars, capacity) = modes.dim();
        let consistent = n_slides == plan.n_slides
            && omega.dim() == (n_slides, capacity)
            && amplitudes.dim() == (n_slides, capacity)
            && window_means.dim() == (n_slides, n_data_vars)
            && time.dim() == (n_slides, plan.window_length)
            && window_ranks.len() == n_slides
            && window_ranks.iter().all(|&r| r <= capacity);
        if !consistent {
            return Err(CostsError::config("fit arrays have inconsistent shapes"));
        }

        Ok(Self {
            plan,
            capacity,
            modes,
            omega,
            amplitudes,
            window_means,
            time,
            window_ranks,
        })
    }

    pub fn n_slides(&self) -> usize {
        self.plan.n_slides
    }

    pub fn n_data_vars(&self) -> usize {
        self.modes.dim().1
    }

    /// Check a solver result against the slot it is written to
    pub fn check_fit(&self, fit: &SolverFit) -> Result<()> {
        let rank = fit.rank();
        if rank == 0 || rank > self.capacity {
            return Err(CostsError::SolverOutput(format!(
                "{rank} eigenvalues for {} rank slots",
                self.capacity
            )));
        }
        if fit.modes.dim() != (self.n_data_vars(), rank) || fit.amplitudes.len() != rank {
            return Err(CostsError::SolverOutput(format!(
                "modes {:?} and {} amplitudes for rank {rank} over {} variables",
                fit.modes.dim(),
                fit.amplitudes.len(),
                self.n_data_vars()
            )));
        }
        Ok(())
    }

    /// Write window `k`, zero filling the slots past the fitted rank
    pub fn write_window(
        &mut self,
        k: usize,
        fit: &SolverFit,
        window_mean: ArrayView1<'_, f64>,
        time: ArrayView1<'_, f64>,
    ) -> Result<()> {
        self.check_fit(fit)?;
        let rank = fit.rank();

        self.modes.slice_mut(s![k, .., ..]).fill(Complex64::new(0.0, 0.0));
        self.omega.row_mut(k).fill(Complex64::new(0.0, 0.0));
        self.amplitudes.row_mut(k).fill(Complex64::new(0.0, 0.0));

        self.modes.slice_mut(s![k, .., ..rank]).assign(&fit.modes);
        self.omega.slice_mut(s![k, ..rank]).assign(&fit.eigenvalues);
        self.amplitudes.slice_mut(s![k, ..rank]).assign(&fit.amplitudes);
        self.window_means.row_mut(k).assign(&window_mean);
        self.time.row_mut(k).assign(&time);
        self.window_ranks[k] = rank;
        Ok(())
    }

    /// Fitted eigenvalues of window `k`, padding excluded
    pub fn window_omega(&self, k: usize) -> ArrayView1<'_, Complex64> {
        self.omega.slice(s![k, ..self.window_ranks[k]])
    }

    /// Fitted modes of window `k`, padding excluded
    pub fn window_modes(&self, k: usize) -> ArrayView2<'_, Complex64> {
        self.modes.slice(s![k, .., ..self.window_ranks[k]])
    }

    /// Every fitted eigenvalue in window-major order, padding excluded
    pub fn fitted_omega(&self) -> Array1<Complex64> {
        (0..self.n_slides())
            .flat_map(|k| self.window_omega(k).to_vec())
            .collect()
    }

    /// Mask of fitted (non padding) slots, (n_slides, capacity)
    pub fn fitted_mask(&self) -> Array2<bool> {
        Array2::from_shape_fn((self.n_slides(), self.capacity), |(k, j)| j < self.window_ranks[k])
    }
}
